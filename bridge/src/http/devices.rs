//! Device API

use http::Method;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::http::client::QuasarClient;

/// Decode an explicit `null` the same way as a missing field
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `GET /m/user/devices`
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceListing {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub rooms: Vec<Room>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Room {
    #[serde(default)]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub devices: Vec<ListedDevice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListedDevice {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(rename = "type", default)]
    pub device_type: String,

    #[serde(default)]
    pub icon_url: Option<String>,

    #[serde(default)]
    pub quasar_info: Option<QuasarInfo>,
}

/// Speaker platform identity of a smart-home device
#[derive(Debug, Clone, Deserialize)]
pub struct QuasarInfo {
    pub device_id: String,
}

/// `GET /m/user/devices/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceDetail {
    #[serde(default)]
    pub state: Option<String>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub capabilities: Vec<ReportedCapability>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Vec<ReportedProperty>,
}

impl DeviceDetail {
    pub fn is_online(&self) -> bool {
        self.state.as_deref() == Some("online")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstanceState {
    #[serde(default)]
    pub instance: Option<String>,

    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstanceParameters {
    #[serde(default)]
    pub instance: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportedCapability {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub state: Option<InstanceState>,

    #[serde(default)]
    pub parameters: Option<InstanceParameters>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportedProperty {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub state: Option<InstanceState>,

    #[serde(default)]
    pub parameters: Option<InstanceParameters>,
}

/// Body of `POST /m/user/devices/{id}/actions`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceActions {
    pub actions: Vec<DeviceAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceAction {
    #[serde(rename = "type")]
    pub kind: String,
    pub state: ActionState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionState {
    pub instance: String,
    pub value: Value,
}

impl QuasarClient {
    /// Full device/room listing
    pub async fn list_devices(&self) -> Option<DeviceListing> {
        self.get_as(&self.endpoints().devices()).await
    }

    /// Device detail with capability and property state
    pub async fn device_detail(&self, iot_id: &str) -> Option<DeviceDetail> {
        self.get_as(&self.endpoints().device(iot_id)).await
    }

    /// Send actions to a device, returning the raw payload
    pub async fn device_actions(&self, iot_id: &str, actions: &DeviceActions) -> Option<Value> {
        let body = serde_json::to_value(actions).ok()?;
        self.request(Method::POST, &self.endpoints().device_actions(iot_id), Some(&body))
            .await
    }
}
