//! Device directory synchronization

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::errors::BridgeError;
use crate::http::client::QuasarClient;
use crate::http::devices::{DeviceListing, ListedDevice};
use crate::store::{DataStore, DevicePatch, StationPatch};
use crate::utils::Clock;

/// Summary of one directory pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryReport {
    pub devices: usize,
    pub stations_linked: usize,
}

/// Mirrors the cloud device listing into local device records
///
/// Records for devices that vanish from the listing are kept.
pub struct DirectorySyncer {
    client: Arc<QuasarClient>,
    store: Arc<dyn DataStore>,
    clock: Arc<dyn Clock>,
}

impl DirectorySyncer {
    pub fn new(client: Arc<QuasarClient>, store: Arc<dyn DataStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            store,
            clock,
        }
    }

    /// Fetch the listing and upsert every device
    pub async fn update_devices(&self) -> Result<DirectoryReport, BridgeError> {
        let Some(listing) = self.client.list_devices().await else {
            error!("Device listing unavailable, directory sync skipped");
            return Err(BridgeError::SyncError("device listing unavailable".to_string()));
        };
        self.apply(&listing).await
    }

    async fn apply(&self, listing: &DeviceListing) -> Result<DirectoryReport, BridgeError> {
        let mut report = DirectoryReport::default();

        for room in &listing.rooms {
            for listed in &room.devices {
                self.upsert_device(&room.name, listed).await?;
                report.devices += 1;
                if self.link_station(listed).await? {
                    report.stations_linked += 1;
                }
            }
        }

        info!(
            "Directory sync: {} devices, {} stations linked",
            report.devices, report.stations_linked
        );
        Ok(report)
    }

    async fn upsert_device(&self, room: &str, listed: &ListedDevice) -> Result<(), BridgeError> {
        let device = self.store.get_or_create_device(&listed.id).await?;
        let patch = DevicePatch {
            title: Some(listed.name.clone()),
            device_type: Some(listed.device_type.clone()),
            room: Some(Some(room.to_string())),
            icon: Some(listed.icon_url.clone()),
            updated: Some(self.clock.now()),
            ..Default::default()
        };
        let device = self.store.patch_device(device.id, patch).await?;
        debug!("Upserted device {} ({})", device.title, device.iot_id);
        Ok(())
    }

    /// Attach the smart-home id to the matching station, by title first and
    /// then by speaker platform id
    async fn link_station(&self, listed: &ListedDevice) -> Result<bool, BridgeError> {
        let mut station = self.store.station_by_title(&listed.name).await?;
        if station.is_none() {
            if let Some(info) = &listed.quasar_info {
                station = self.store.station_by_station_id(&info.device_id).await?;
            }
        }

        let Some(station) = station else {
            return Ok(false);
        };
        let patch = StationPatch {
            iot_id: Some(Some(listed.id.clone())),
            updated: Some(self.clock.now()),
            ..Default::default()
        };
        let station = self.store.patch_station(station.id, patch).await?;
        debug!("Linked station {} to {}", station.title, listed.id);
        Ok(true)
    }
}
