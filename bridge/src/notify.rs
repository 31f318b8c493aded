//! UI notifications

use tokio::sync::broadcast;
use tracing::trace;

use crate::models::device::Device;

/// Events pushed to live UI listeners
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    Updated(Device),
}

/// Fire-and-forget broadcaster of device events
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<DeviceEvent>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.tx.subscribe()
    }

    pub fn device_updated(&self, device: &Device) {
        // No listeners is the common case
        if self.tx.send(DeviceEvent::Updated(device.clone())).is_err() {
            trace!("No listeners for device {}", device.id);
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(64)
    }
}
