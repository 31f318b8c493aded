//! Device actions

use serde_json::Value;
use tracing::{debug, warn};

use crate::commands::CommandSender;
use crate::http::client::is_ok;
use crate::http::devices::{ActionState, DeviceAction, DeviceActions};
use crate::models::device::{Capability, Device, ON_OFF};

/// Build the cloud action that sets capability `title` to `value`
///
/// On/off takes a boolean; other titles are `type.instance` and carry the
/// value as given.
pub fn device_action(title: &str, value: &Value) -> DeviceAction {
    if title == ON_OFF {
        return DeviceAction {
            kind: title.to_string(),
            state: ActionState {
                instance: "on".to_string(),
                value: Value::Bool(is_on(value)),
            },
        };
    }

    let (kind, instance) = match title.rsplit_once('.') {
        Some((kind, instance)) if !kind.is_empty() && !instance.is_empty() => (kind, instance),
        _ => (title, "on"),
    };
    DeviceAction {
        kind: kind.to_string(),
        state: ActionState {
            instance: instance.to_string(),
            value: value.clone(),
        },
    }
}

/// `1`, `"1"` and `true` switch a device on
pub fn is_on(value: &Value) -> bool {
    match value {
        Value::Bool(on) => *on,
        Value::Number(n) => n.as_f64() == Some(1.0),
        Value::String(s) => s.trim() == "1",
        _ => false,
    }
}

impl CommandSender {
    /// Set one capability of a device; true when the cloud accepted it
    pub async fn set_data_device(
        &self,
        device: &Device,
        capability: &Capability,
        value: &Value,
    ) -> bool {
        let actions = DeviceActions {
            actions: vec![device_action(&capability.title, value)],
        };
        debug!(
            "Set {} of {} to {}",
            capability.title, device.title, value
        );

        let result = self.client.device_actions(&device.iot_id, &actions).await;
        let accepted = is_ok(result.as_ref());
        if !accepted {
            warn!(
                "Action {} on {} not accepted: {:?}",
                capability.title, device.title, result
            );
        }
        accepted
    }
}
