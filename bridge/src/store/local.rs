//! In-process record store with optional JSON snapshot

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::errors::BridgeError;
use crate::filesys::file::File;
use crate::models::device::{Capability, Device};
use crate::models::station::Station;
use crate::store::{CapabilityPatch, DataStore, DevicePatch, StationPatch};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    next_id: i64,

    #[serde(default)]
    devices: BTreeMap<i64, Device>,

    #[serde(default)]
    capabilities: BTreeMap<i64, Capability>,

    #[serde(default)]
    stations: BTreeMap<i64, Station>,
}

impl StoreData {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Record store kept in memory and, when backed by a file, written out after
/// every mutation
pub struct LocalStore {
    data: Mutex<StoreData>,
    file: Option<File>,
}

impl LocalStore {
    /// A store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self {
            data: Mutex::new(StoreData::default()),
            file: None,
        }
    }

    /// Open a file-backed store, starting empty when the file does not exist
    pub async fn open(file: File) -> Result<Self, BridgeError> {
        let data = file.read_json_opt::<StoreData>().await?.unwrap_or_default();
        info!(
            "Opened record store {} ({} devices, {} stations)",
            file.path().display(),
            data.devices.len(),
            data.stations.len()
        );
        Ok(Self {
            data: Mutex::new(data),
            file: Some(file),
        })
    }

    async fn commit(&self, data: &StoreData) -> Result<(), BridgeError> {
        if let Some(file) = &self.file {
            file.write_json(data).await?;
            debug!("Record store committed");
        }
        Ok(())
    }
}

#[async_trait]
impl DataStore for LocalStore {
    async fn devices(&self) -> Result<Vec<Device>, BridgeError> {
        let data = self.data.lock().await;
        Ok(data.devices.values().cloned().collect())
    }

    async fn device(&self, id: i64) -> Result<Option<Device>, BridgeError> {
        let data = self.data.lock().await;
        Ok(data.devices.get(&id).cloned())
    }

    async fn device_by_iot_id(&self, iot_id: &str) -> Result<Option<Device>, BridgeError> {
        let data = self.data.lock().await;
        Ok(data.devices.values().find(|d| d.iot_id == iot_id).cloned())
    }

    async fn get_or_create_device(&self, iot_id: &str) -> Result<Device, BridgeError> {
        let mut data = self.data.lock().await;
        if let Some(device) = data.devices.values().find(|d| d.iot_id == iot_id) {
            return Ok(device.clone());
        }
        let device = Device::new(data.allocate_id(), iot_id);
        data.devices.insert(device.id, device.clone());
        self.commit(&data).await?;
        Ok(device)
    }

    async fn update_device(&self, device: &Device) -> Result<(), BridgeError> {
        let mut data = self.data.lock().await;
        let slot = data
            .devices
            .get_mut(&device.id)
            .ok_or_else(|| BridgeError::NotFound(format!("device {}", device.id)))?;
        *slot = device.clone();
        self.commit(&data).await
    }

    async fn patch_device(&self, id: i64, patch: DevicePatch) -> Result<Device, BridgeError> {
        let mut data = self.data.lock().await;
        let slot = data
            .devices
            .get_mut(&id)
            .ok_or_else(|| BridgeError::NotFound(format!("device {id}")))?;
        patch.apply(slot);
        let device = slot.clone();
        self.commit(&data).await?;
        Ok(device)
    }

    async fn capabilities(&self, device_id: i64) -> Result<Vec<Capability>, BridgeError> {
        let data = self.data.lock().await;
        let mut capabilities: Vec<Capability> = data
            .capabilities
            .values()
            .filter(|c| c.device_id == device_id)
            .cloned()
            .collect();
        capabilities.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(capabilities)
    }

    async fn capability(
        &self,
        device_id: i64,
        title: &str,
    ) -> Result<Option<Capability>, BridgeError> {
        let data = self.data.lock().await;
        Ok(data
            .capabilities
            .values()
            .find(|c| c.device_id == device_id && c.title == title)
            .cloned())
    }

    async fn get_or_create_capability(
        &self,
        device_id: i64,
        title: &str,
    ) -> Result<Capability, BridgeError> {
        let mut data = self.data.lock().await;
        if let Some(capability) = data
            .capabilities
            .values()
            .find(|c| c.device_id == device_id && c.title == title)
        {
            return Ok(capability.clone());
        }
        let capability = Capability::new(data.allocate_id(), device_id, title);
        data.capabilities.insert(capability.id, capability.clone());
        self.commit(&data).await?;
        Ok(capability)
    }

    async fn update_capability(&self, capability: &Capability) -> Result<(), BridgeError> {
        let mut data = self.data.lock().await;
        let slot = data
            .capabilities
            .get_mut(&capability.id)
            .ok_or_else(|| BridgeError::NotFound(format!("capability {}", capability.id)))?;
        *slot = capability.clone();
        self.commit(&data).await
    }

    async fn patch_capability(
        &self,
        id: i64,
        patch: CapabilityPatch,
    ) -> Result<Capability, BridgeError> {
        let mut data = self.data.lock().await;
        let slot = data
            .capabilities
            .get_mut(&id)
            .ok_or_else(|| BridgeError::NotFound(format!("capability {id}")))?;
        patch.apply(slot);
        let capability = slot.clone();
        self.commit(&data).await?;
        Ok(capability)
    }

    async fn capabilities_linked_to(
        &self,
        object: &str,
        property: &str,
    ) -> Result<Vec<Capability>, BridgeError> {
        let data = self.data.lock().await;
        Ok(data
            .capabilities
            .values()
            .filter(|c| {
                c.linked_object.as_deref() == Some(object)
                    && c.linked_property.as_deref() == Some(property)
            })
            .cloned()
            .collect())
    }

    async fn stations(&self) -> Result<Vec<Station>, BridgeError> {
        let data = self.data.lock().await;
        Ok(data.stations.values().cloned().collect())
    }

    async fn station_by_title(&self, title: &str) -> Result<Option<Station>, BridgeError> {
        let data = self.data.lock().await;
        Ok(data.stations.values().find(|s| s.title == title).cloned())
    }

    async fn station_by_station_id(
        &self,
        station_id: &str,
    ) -> Result<Option<Station>, BridgeError> {
        let data = self.data.lock().await;
        Ok(data
            .stations
            .values()
            .find(|s| s.station_id == station_id)
            .cloned())
    }

    async fn get_or_create_station(&self, station_id: &str) -> Result<Station, BridgeError> {
        let mut data = self.data.lock().await;
        if let Some(station) = data.stations.values().find(|s| s.station_id == station_id) {
            return Ok(station.clone());
        }
        let station = Station::new(data.allocate_id(), station_id);
        data.stations.insert(station.id, station.clone());
        self.commit(&data).await?;
        Ok(station)
    }

    async fn update_station(&self, station: &Station) -> Result<(), BridgeError> {
        let mut data = self.data.lock().await;
        let slot = data
            .stations
            .get_mut(&station.id)
            .ok_or_else(|| BridgeError::NotFound(format!("station {}", station.id)))?;
        *slot = station.clone();
        self.commit(&data).await
    }

    async fn patch_station(&self, id: i64, patch: StationPatch) -> Result<Station, BridgeError> {
        let mut data = self.data.lock().await;
        let slot = data
            .stations
            .get_mut(&id)
            .ok_or_else(|| BridgeError::NotFound(format!("station {id}")))?;
        patch.apply(slot);
        let station = slot.clone();
        self.commit(&data).await?;
        Ok(station)
    }
}
