//! Local device and capability records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title of the on/off capability, the one capability keyed without an instance
pub const ON_OFF: &str = "devices.capabilities.on_off";

/// A cloud device mirrored locally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,

    /// Cloud device id, unique
    pub iot_id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub device_type: String,

    #[serde(default)]
    pub room: Option<String>,

    #[serde(default)]
    pub icon: Option<String>,

    /// Refresh period in seconds, `None` falls back to the global default
    #[serde(default)]
    pub update_period: Option<u64>,

    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
}

impl Device {
    pub fn new(id: i64, iot_id: impl Into<String>) -> Self {
        Self {
            id,
            iot_id: iot_id.into(),
            title: String::new(),
            device_type: String::new(),
            room: None,
            icon: None,
            update_period: None,
            updated: None,
        }
    }

    /// Whether the device is due for a state poll at `now`
    pub fn is_due(&self, default_period: u64, now: DateTime<Utc>) -> bool {
        let Some(updated) = self.updated else {
            return true;
        };
        i64::try_from(self.update_period.unwrap_or(default_period))
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|period| updated.checked_add_signed(period))
            .is_some_and(|due| now >= due)
    }
}

/// A capability or sensor property observed on a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    pub id: i64,
    pub device_id: i64,

    /// `type` or `type.instance`, unique per device
    pub title: String,

    /// Stringified last-known value
    #[serde(default)]
    pub value: Option<String>,

    #[serde(default)]
    pub read_only: bool,

    #[serde(default)]
    pub linked_object: Option<String>,

    #[serde(default)]
    pub linked_property: Option<String>,

    #[serde(default)]
    pub linked_method: Option<String>,

    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
}

impl Capability {
    pub fn new(id: i64, device_id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            device_id,
            title: title.into(),
            value: None,
            read_only: false,
            linked_object: None,
            linked_property: None,
            linked_method: None,
            updated: None,
        }
    }

    /// `object.property` when both halves of the property link are set
    pub fn linked_property_path(&self) -> Option<String> {
        match (non_empty(&self.linked_object), non_empty(&self.linked_property)) {
            (Some(object), Some(property)) => Some(format!("{object}.{property}")),
            _ => None,
        }
    }

    /// `object.method` when both halves of the method link are set
    pub fn linked_method_path(&self) -> Option<String> {
        match (non_empty(&self.linked_object), non_empty(&self.linked_method)) {
            (Some(object), Some(method)) => Some(format!("{object}.{method}")),
            _ => None,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
