//! Local record store
//!
//! The host application owns real persistence; the bridge only needs the narrow
//! CRUD surface in [`DataStore`]. [`local::LocalStore`] is the in-process
//! implementation used by the standalone binary and the tests.

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::BridgeError;
use crate::models::device::{Capability, Device};
use crate::models::station::Station;

/// Field changes for one device record; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DevicePatch {
    pub title: Option<String>,
    pub device_type: Option<String>,
    pub room: Option<Option<String>>,
    pub icon: Option<Option<String>>,
    pub update_period: Option<Option<u64>>,
    pub updated: Option<DateTime<Utc>>,
}

impl DevicePatch {
    /// Only the sync timestamp
    pub fn touched(at: DateTime<Utc>) -> Self {
        Self {
            updated: Some(at),
            ..Default::default()
        }
    }

    pub fn apply(self, device: &mut Device) {
        if let Some(title) = self.title {
            device.title = title;
        }
        if let Some(device_type) = self.device_type {
            device.device_type = device_type;
        }
        if let Some(room) = self.room {
            device.room = room;
        }
        if let Some(icon) = self.icon {
            device.icon = icon;
        }
        if let Some(update_period) = self.update_period {
            device.update_period = update_period;
        }
        if let Some(updated) = self.updated {
            device.updated = Some(updated);
        }
    }
}

/// Field changes for one capability record; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapabilityPatch {
    pub value: Option<Option<String>>,
    pub read_only: Option<bool>,
    pub linked_object: Option<Option<String>>,
    pub linked_property: Option<Option<String>>,
    pub linked_method: Option<Option<String>>,
    pub updated: Option<DateTime<Utc>>,
}

impl CapabilityPatch {
    /// A newly observed value and when it was seen
    pub fn observed(value: Option<String>, at: DateTime<Utc>) -> Self {
        Self {
            value: Some(value),
            updated: Some(at),
            ..Default::default()
        }
    }

    pub fn apply(self, capability: &mut Capability) {
        if let Some(value) = self.value {
            capability.value = value;
        }
        if let Some(read_only) = self.read_only {
            capability.read_only = read_only;
        }
        if let Some(object) = self.linked_object {
            capability.linked_object = object;
        }
        if let Some(property) = self.linked_property {
            capability.linked_property = property;
        }
        if let Some(method) = self.linked_method {
            capability.linked_method = method;
        }
        if let Some(updated) = self.updated {
            capability.updated = Some(updated);
        }
    }
}

/// Field changes for one station record; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationPatch {
    pub iot_id: Option<Option<String>>,
    pub title: Option<String>,
    pub platform: Option<Option<String>>,
    pub icon: Option<Option<String>>,
    pub screen_capable: Option<bool>,
    pub screen_present: Option<bool>,
    pub online: Option<bool>,
    pub tts_scenario: Option<Option<String>>,
    pub updated: Option<DateTime<Utc>>,
}

impl StationPatch {
    pub fn apply(self, station: &mut Station) {
        if let Some(iot_id) = self.iot_id {
            station.iot_id = iot_id;
        }
        if let Some(title) = self.title {
            station.title = title;
        }
        if let Some(platform) = self.platform {
            station.platform = platform;
        }
        if let Some(icon) = self.icon {
            station.icon = icon;
        }
        if let Some(screen_capable) = self.screen_capable {
            station.screen_capable = screen_capable;
        }
        if let Some(screen_present) = self.screen_present {
            station.screen_present = screen_present;
        }
        if let Some(online) = self.online {
            station.online = online;
        }
        if let Some(tts_scenario) = self.tts_scenario {
            station.tts_scenario = tts_scenario;
        }
        if let Some(updated) = self.updated {
            station.updated = Some(updated);
        }
    }
}

/// CRUD for devices, capabilities and stations
///
/// Every mutating call is committed before it returns. Syncs change records
/// through the `patch_*` calls, which rewrite only the named fields of the
/// current record, so concurrent edits of other fields survive.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn devices(&self) -> Result<Vec<Device>, BridgeError>;

    async fn device(&self, id: i64) -> Result<Option<Device>, BridgeError>;

    async fn device_by_iot_id(&self, iot_id: &str) -> Result<Option<Device>, BridgeError>;

    /// Return the device with `iot_id`, creating an empty record when missing
    async fn get_or_create_device(&self, iot_id: &str) -> Result<Device, BridgeError>;

    /// Replace the whole record
    async fn update_device(&self, device: &Device) -> Result<(), BridgeError>;

    /// Apply `patch` to the current record and return the result
    async fn patch_device(&self, id: i64, patch: DevicePatch) -> Result<Device, BridgeError>;

    /// Capabilities of a device ordered by title
    async fn capabilities(&self, device_id: i64) -> Result<Vec<Capability>, BridgeError>;

    async fn capability(
        &self,
        device_id: i64,
        title: &str,
    ) -> Result<Option<Capability>, BridgeError>;

    /// Return the `(device_id, title)` record, creating it when missing
    async fn get_or_create_capability(
        &self,
        device_id: i64,
        title: &str,
    ) -> Result<Capability, BridgeError>;

    async fn update_capability(&self, capability: &Capability) -> Result<(), BridgeError>;

    async fn patch_capability(
        &self,
        id: i64,
        patch: CapabilityPatch,
    ) -> Result<Capability, BridgeError>;

    /// Capabilities whose property link points at `object.property`
    async fn capabilities_linked_to(
        &self,
        object: &str,
        property: &str,
    ) -> Result<Vec<Capability>, BridgeError>;

    async fn stations(&self) -> Result<Vec<Station>, BridgeError>;

    async fn station_by_title(&self, title: &str) -> Result<Option<Station>, BridgeError>;

    async fn station_by_station_id(
        &self,
        station_id: &str,
    ) -> Result<Option<Station>, BridgeError>;

    /// Return the station with `station_id`, creating it when missing
    async fn get_or_create_station(&self, station_id: &str) -> Result<Station, BridgeError>;

    async fn update_station(&self, station: &Station) -> Result<(), BridgeError>;

    async fn patch_station(&self, id: i64, patch: StationPatch) -> Result<Station, BridgeError>;
}
