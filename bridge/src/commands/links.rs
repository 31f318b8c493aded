//! Links between capabilities and object graph properties

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::commands::CommandSender;
use crate::errors::BridgeError;
use crate::store::{CapabilityPatch, DevicePatch};

/// New link settings for one capability of a device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityLinkUpdate {
    pub title: String,

    #[serde(default)]
    pub linked_object: Option<String>,

    #[serde(default)]
    pub linked_property: Option<String>,

    #[serde(default)]
    pub linked_method: Option<String>,

    #[serde(default)]
    pub read_only: bool,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl CommandSender {
    /// A linked object property changed in the graph; forward it to every
    /// capability linked to it. Returns how many devices accepted the value.
    pub async fn change_linked_property(
        &self,
        object: &str,
        property: &str,
        value: &Value,
    ) -> Result<usize, BridgeError> {
        let linked = self.store.capabilities_linked_to(object, property).await?;
        if linked.is_empty() {
            debug!("Nothing linked to {}.{}, removing link", object, property);
            self.graph
                .remove_link(object, property, &self.module_name)
                .await;
            return Ok(0);
        }

        let mut accepted = 0;
        for capability in linked {
            let Some(device) = self.store.device(capability.device_id).await? else {
                continue;
            };
            if self.set_data_device(&device, &capability, value).await {
                accepted += 1;
            }
        }
        Ok(accepted)
    }

    /// Replace the refresh period and capability links of a device
    pub async fn update_device_links(
        &self,
        device_id: i64,
        update_period: Option<u64>,
        links: Vec<CapabilityLinkUpdate>,
    ) -> Result<(), BridgeError> {
        let period = DevicePatch {
            update_period: Some(update_period.filter(|p| *p > 0)),
            ..Default::default()
        };
        let device = self.store.patch_device(device_id, period).await?;

        for link in links {
            let Some(capability) = self.store.capability(device_id, &link.title).await? else {
                return Err(BridgeError::NotFound(format!(
                    "capability {} of device {}",
                    link.title, device_id
                )));
            };

            if let (Some(object), Some(property)) =
                (&capability.linked_object, &capability.linked_property)
            {
                self.graph
                    .remove_link(object, property, &self.module_name)
                    .await;
            }

            let patch = CapabilityPatch {
                linked_object: Some(non_empty(link.linked_object)),
                linked_property: Some(non_empty(link.linked_property)),
                linked_method: Some(non_empty(link.linked_method)),
                read_only: Some(link.read_only),
                ..Default::default()
            };
            let capability = self.store.patch_capability(capability.id, patch).await?;

            if let (Some(object), Some(property), false) = (
                &capability.linked_object,
                &capability.linked_property,
                capability.read_only,
            ) {
                self.graph
                    .set_link(object, property, &self.module_name)
                    .await;
            }
        }

        info!("Updated links of device {}", device.title);
        Ok(())
    }
}
