//! Station and scenario synchronization

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::codec;
use crate::errors::BridgeError;
use crate::http::client::QuasarClient;
use crate::http::scenarios::{ScenarioPayload, PHRASE_ACTION};
use crate::store::{DataStore, StationPatch};
use crate::utils::Clock;

/// Phrase of the placeholder scenario; it is rewritten before every use
pub const MARKER_PHRASE: &str = "Сценарий для osysHome. НЕ УДАЛЯТЬ!";

/// Summary of one scenario pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioReport {
    pub created: usize,
    pub adopted: usize,
    pub failed: usize,
}

/// Keeps station records and their cloud scenarios in step
pub struct StationSyncer {
    client: Arc<QuasarClient>,
    store: Arc<dyn DataStore>,
    clock: Arc<dyn Clock>,
}

impl StationSyncer {
    pub fn new(client: Arc<QuasarClient>, store: Arc<dyn DataStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            store,
            clock,
        }
    }

    /// Upsert stations from the online stats listing, then provision scenarios
    pub async fn refresh_stations(&self) -> Result<ScenarioReport, BridgeError> {
        let Some(stats) = self.client.online_stats().await else {
            error!("Station listing unavailable");
            return Err(BridgeError::SyncError("station listing unavailable".to_string()));
        };

        for item in &stats.items {
            let station = self.store.get_or_create_station(&item.id).await?;
            let patch = StationPatch {
                title: Some(item.name.clone()),
                icon: Some(item.icon.clone()),
                platform: Some(item.platform.clone()),
                screen_capable: Some(item.screen_capable),
                screen_present: Some(item.screen_present),
                online: Some(item.online),
                updated: Some(self.clock.now()),
                ..Default::default()
            };
            self.store.patch_station(station.id, patch).await?;
        }
        info!("Refreshed {} stations", stats.items.len());

        self.add_scenarios().await
    }

    /// Make sure every station with a smart-home id has a scenario
    pub async fn add_scenarios(&self) -> Result<ScenarioReport, BridgeError> {
        let existing: HashMap<String, String> = match self.client.list_scenarios().await {
            Some(list) => list
                .scenarios
                .into_iter()
                .map(|s| (codec::decode(&s.name).to_lowercase(), s.id))
                .collect(),
            None => {
                warn!("Scenario list unavailable, scenario sync skipped");
                return Err(BridgeError::SyncError("scenario list unavailable".to_string()));
            }
        };

        let mut report = ScenarioReport::default();
        for station in self.store.stations().await? {
            let Some(iot_id) = station.iot_id.clone().filter(|id| !id.is_empty()) else {
                continue;
            };

            if let Some(scenario_id) = existing.get(&iot_id.to_lowercase()) {
                self.store
                    .patch_station(station.id, scenario_patch(Some(scenario_id.clone())))
                    .await?;
                report.adopted += 1;
                continue;
            }

            let payload = ScenarioPayload::for_station(&iot_id, PHRASE_ACTION, MARKER_PHRASE);
            match self.client.create_scenario(&payload).await {
                Some(created) if created.status.as_deref() == Some("ok") => {
                    info!("Created scenario for station {}", station.title);
                    self.store
                        .patch_station(station.id, scenario_patch(created.scenario_id))
                        .await?;
                    report.created += 1;
                }
                other => {
                    error!(
                        "Failed to create scenario for station {}: {:?}",
                        station.title, other
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}

fn scenario_patch(scenario_id: Option<String>) -> StationPatch {
    StationPatch {
        tts_scenario: Some(scenario_id),
        ..Default::default()
    }
}
