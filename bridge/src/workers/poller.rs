//! Polling worker for periodic device state sync

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::sync::device_state::DeviceStateSyncer;

/// Poller worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Polling interval
    pub interval: Duration,

    /// Initial delay before first poll
    pub initial_delay: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            initial_delay: Duration::from_secs(5),
        }
    }
}

/// Run the poller worker
///
/// Each tick runs one coordinator cycle; the next tick starts only after every
/// device poll of the cycle has finished.
pub async fn run<S, F>(
    options: &Options,
    syncer: &DeviceStateSyncer,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Poller worker starting...");

    tokio::select! {
        _ = &mut shutdown_signal => {
            info!("Poller worker shutting down...");
            return;
        }
        _ = sleep_fn(options.initial_delay) => {}
    }

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Poller worker shutting down...");
                return;
            }
            _ = sleep_fn(options.interval) => {}
        }

        match syncer.refresh_devices_data().await {
            Ok(report) if report.due > 0 => {
                debug!(
                    "Device cycle: {} due, {} synced, {} failed",
                    report.due, report.synced, report.failed
                );
            }
            Ok(_) => {}
            Err(e) => {
                error!("Device cycle failed: {}", e);
            }
        }
    }
}
