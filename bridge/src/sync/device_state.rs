//! Device state synchronization
//!
//! Each due device is polled on its own; its capabilities and sensor properties
//! are diffed against the stored values and every change is written to the
//! store, pushed to the linked object property and announced to the linked
//! method. Polls of different devices run concurrently, a device is never
//! polled twice at the same time.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::stream::{self, StreamExt};
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::errors::BridgeError;
use crate::http::client::QuasarClient;
use crate::http::devices::{
    InstanceParameters, InstanceState, ReportedCapability, ReportedProperty,
};
use crate::models::device::{Device, ON_OFF};
use crate::notify::Notifier;
use crate::objects::ObjectGraph;
use crate::store::{CapabilityPatch, DataStore, DevicePatch};
use crate::utils::{stringify, Clock};

/// Stored when a capability reports no value
pub const UNKNOWN_VALUE: &str = "?";

/// Device state sync options
#[derive(Debug, Clone)]
pub struct Options {
    /// Refresh period for devices without their own, in seconds
    pub default_period: u64,

    /// Upper bound on devices polled at once
    pub max_concurrent: usize,

    /// Source tag for object graph writes
    pub module_name: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            default_period: 60,
            max_concurrent: 8,
            module_name: "YandexDevices".to_string(),
        }
    }
}

/// What happened to a single device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSyncOutcome {
    /// Polled; `changed` records were updated
    Synced { changed: usize },

    /// Another poll of this device is running
    Busy,

    /// The local record is gone
    Missing,

    /// The cloud returned nothing usable
    Unavailable,
}

/// Summary of one coordinator cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub due: usize,
    pub synced: usize,
    pub failed: usize,
}

/// Removes a device from the in-flight set when the poll ends
struct InFlight<'a> {
    set: &'a Mutex<HashSet<i64>>,
    id: i64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.id);
    }
}

/// Device state syncer
pub struct DeviceStateSyncer {
    client: Arc<QuasarClient>,
    store: Arc<dyn DataStore>,
    graph: Arc<dyn ObjectGraph>,
    notifier: Notifier,
    clock: Arc<dyn Clock>,
    options: Options,
    in_flight: Mutex<HashSet<i64>>,
}

impl DeviceStateSyncer {
    pub fn new(
        client: Arc<QuasarClient>,
        store: Arc<dyn DataStore>,
        graph: Arc<dyn ObjectGraph>,
        notifier: Notifier,
        clock: Arc<dyn Clock>,
        options: Options,
    ) -> Self {
        Self {
            client,
            store,
            graph,
            notifier,
            clock,
            options,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Poll every due device and wait for all of them
    pub async fn refresh_devices_data(&self) -> Result<CycleReport, BridgeError> {
        debug!("Begin get data devices");

        let now = self.clock.now();
        let due: Vec<Device> = self
            .store
            .devices()
            .await?
            .into_iter()
            .filter(|d| d.is_due(self.options.default_period, now))
            .collect();

        let synced = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        let report_due = due.len();

        stream::iter(due)
            .for_each_concurrent(self.options.max_concurrent.max(1), |device| {
                let synced = &synced;
                let failed = &failed;
                async move {
                    match self.refresh_device_data(device.id).await {
                        Ok(DeviceSyncOutcome::Synced { .. }) => {
                            synced.fetch_add(1, Ordering::Relaxed);
                        }
                        Ok(outcome) => {
                            debug!("Device {} not synced: {:?}", device.title, outcome);
                        }
                        Err(e) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                            error!("Device {} sync failed: {}", device.title, e);
                        }
                    }
                }
            })
            .await;

        debug!("End get data devices");
        Ok(CycleReport {
            due: report_due,
            synced: synced.into_inner(),
            failed: failed.into_inner(),
        })
    }

    /// Poll one device and reconcile its state
    pub async fn refresh_device_data(&self, id: i64) -> Result<DeviceSyncOutcome, BridgeError> {
        let Some(_guard) = self.enter(id) else {
            return Ok(DeviceSyncOutcome::Busy);
        };

        let Some(device) = self.store.device(id).await? else {
            return Ok(DeviceSyncOutcome::Missing);
        };
        debug!("Begin get data device - {}", device.title);

        let Some(detail) = self.client.device_detail(&device.iot_id).await else {
            debug!("No usable detail for device {}", device.title);
            return Ok(DeviceSyncOutcome::Unavailable);
        };

        let device_state = i32::from(detail.is_online());
        let mut changed = 0;

        for capability in &detail.capabilities {
            let title = capability_title(capability);
            let value = capability_value(capability);
            if self
                .observe(&device, &title, Some(value), device_state, true)
                .await?
            {
                changed += 1;
            }
        }

        let online = online_property(device_state);
        for property in detail.properties.iter().chain(std::iter::once(&online)) {
            let Some(title) = property_title(property) else {
                warn!(
                    "Property {} of {} has no instance, skipped",
                    property.kind, device.title
                );
                continue;
            };
            let value = property.state.as_ref().and_then(|s| s.value.clone());
            if self
                .observe(&device, &title, value, device_state, false)
                .await?
            {
                changed += 1;
            }
        }

        let device = self
            .store
            .patch_device(device.id, DevicePatch::touched(self.clock.now()))
            .await?;
        self.notifier.device_updated(&device);
        debug!("End get data device - {} ({} changed)", device.title, changed);

        Ok(DeviceSyncOutcome::Synced { changed })
    }

    fn enter(&self, id: i64) -> Option<InFlight<'_>> {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(id) {
            return None;
        }
        Some(InFlight {
            set: &self.in_flight,
            id,
        })
    }

    /// Record one observed value; returns whether it differed from the stored one.
    ///
    /// With `skip_same_property` the linked property is left alone when the graph
    /// already holds the new value.
    async fn observe(
        &self,
        device: &Device,
        title: &str,
        new_value: Option<Value>,
        device_state: i32,
        skip_same_property: bool,
    ) -> Result<bool, BridgeError> {
        let record = self
            .store
            .get_or_create_capability(device.id, title)
            .await?;

        let new_str = new_value.as_ref().map(stringify);
        if new_str == record.value {
            return Ok(false);
        }
        let old_value = record.value.clone();
        let module = self.options.module_name.as_str();

        if let Some(path) = record.linked_property_path() {
            let current = if skip_same_property {
                self.graph.get_property(&path).await.map(|v| stringify(&v))
            } else {
                None
            };
            if !skip_same_property || current != new_str {
                self.graph
                    .set_property(&path, new_value.clone().unwrap_or(Value::Null), module)
                    .await;
            }
        }

        let now = self.clock.now();
        let record = self
            .store
            .patch_capability(record.id, CapabilityPatch::observed(new_str, now))
            .await?;

        if let Some(path) = record.linked_method_path() {
            let params = json!({
                "NEW_VALUE": new_value,
                "OLD_VALUE": old_value,
                "DEVICE_STATE": device_state,
                "UPDATED": now.to_rfc3339(),
                "MODULE": module,
            });
            self.graph.call_method(&path, params, module).await;
        }

        Ok(true)
    }
}

/// Stable key of a capability: the type for on/off, otherwise `type.instance`
pub fn capability_title(capability: &ReportedCapability) -> String {
    if capability.kind == ON_OFF {
        return capability.kind.clone();
    }
    let instance = capability
        .state
        .as_ref()
        .and_then(|s| s.instance.as_deref())
        .filter(|i| !i.is_empty())
        .or_else(|| {
            capability
                .parameters
                .as_ref()
                .and_then(|p| p.instance.as_deref())
                .filter(|i| !i.is_empty())
        })
        .unwrap_or("unknown");
    format!("{}.{}", capability.kind, instance)
}

/// Normalized capability value: booleans as 0/1, colors and scenes by id
pub fn capability_value(capability: &ReportedCapability) -> Value {
    let state = capability.state.as_ref();
    let instance = state.and_then(|s| s.instance.as_deref());
    let value = state.and_then(|s| s.value.as_ref());

    match value {
        Some(Value::Bool(on)) => json!(i32::from(*on)),
        _ if matches!(instance, Some("color") | Some("scene")) => value
            .and_then(|v| v.get("id"))
            .cloned()
            .unwrap_or_else(|| json!(UNKNOWN_VALUE)),
        Some(v) if !v.is_null() => v.clone(),
        _ => json!(UNKNOWN_VALUE),
    }
}

/// Stable key of a sensor property: `type.instance`
pub fn property_title(property: &ReportedProperty) -> Option<String> {
    let instance = property
        .parameters
        .as_ref()
        .and_then(|p| p.instance.as_deref())
        .filter(|i| !i.is_empty())?;
    Some(format!("{}.{}", property.kind, instance))
}

fn online_property(device_state: i32) -> ReportedProperty {
    ReportedProperty {
        kind: "devices".to_string(),
        state: Some(InstanceState {
            instance: None,
            value: Some(json!(device_state)),
        }),
        parameters: Some(InstanceParameters {
            instance: Some("online".to_string()),
        }),
    }
}
