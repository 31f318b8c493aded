//! Station speech and voice commands
//!
//! Stations are driven through their provisioned scenario: the scenario step is
//! rewritten with the text and the scenario is then run.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, error, warn};

use crate::commands::CommandSender;
use crate::http::client::is_ok;
use crate::http::scenarios::{ScenarioPayload, PHRASE_ACTION, TEXT_ACTION};
use crate::models::station::{MinLevel, Station, TtsMode};
use crate::utils::stringify;

/// Longest phrase a scenario step accepts
const MAX_PHRASE_CHARS: usize = 99;

/// Voice command that makes a station repeat the rest of the text
pub const REPEAT_PREFIX: &str = "повтори за мной ";

/// Make text safe for a scenario step: brackets become spaces, markup tags are
/// removed, whitespace collapses and the result is capped at 99 characters
pub fn sanitize_phrase(message: &str) -> String {
    let unbracketed = message.replace(['(', ')'], " ");
    let collapsed = strip_tags(&unbracketed)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if collapsed.chars().count() > MAX_PHRASE_CHARS {
        collapsed.chars().take(MAX_PHRASE_CHARS).collect()
    } else {
        collapsed
    }
}

/// Markup tags; `.` keeps a tag from spanning lines
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<.+?>").expect("valid tag pattern"));

fn strip_tags(text: &str) -> Cow<'_, str> {
    TAG.replace_all(text, "")
}

impl CommandSender {
    /// Speak `message` on a station through the cloud
    pub async fn send_cloud_tts(&self, station: &Station, message: &str) -> bool {
        self.run_station_action(station, PHRASE_ACTION, message).await
    }

    /// Have a station execute `command` as if it had been spoken to it
    pub async fn send_command_to_station(&self, station: &Station, command: &str) -> bool {
        self.run_station_action(station, TEXT_ACTION, command).await
    }

    /// Announce `message` on every station whose minimum level is at most
    /// `level`; returns how many stations accepted it
    pub async fn say(&self, message: &str, level: i64) -> usize {
        let stations = match self.store.stations().await {
            Ok(stations) => stations,
            Err(e) => {
                error!("Unable to list stations: {}", e);
                return 0;
            }
        };

        let mut delivered = 0;
        for station in stations {
            if station.tts == TtsMode::Off {
                continue;
            }
            let Some(min_level) = self.min_level(&station).await else {
                continue;
            };
            if level < min_level {
                continue;
            }

            let sent = match station.tts {
                TtsMode::Local => {
                    let command = format!("{REPEAT_PREFIX}{message}");
                    self.send_command_to_station(&station, &command).await
                }
                TtsMode::Cloud => self.send_cloud_tts(&station, message).await,
                TtsMode::Off => false,
            };
            if sent {
                delivered += 1;
            }
        }
        delivered
    }

    async fn min_level(&self, station: &Station) -> Option<i64> {
        let raw = match MinLevel::parse(station.min_level.as_deref().unwrap_or(""))? {
            MinLevel::Literal(level) => level.to_string(),
            MinLevel::Property(path) => {
                let Some(value) = self.graph.get_property(path).await else {
                    warn!("Min level property {} of {} is not set", path, station.title);
                    return None;
                };
                stringify(&value)
            }
        };

        match raw.trim().parse::<f64>() {
            Ok(level) if level.is_finite() => Some(level as i64),
            _ => {
                warn!("Invalid min level {:?} for station {}", raw, station.title);
                None
            }
        }
    }

    async fn run_station_action(&self, station: &Station, action: &str, text: &str) -> bool {
        let text = sanitize_phrase(text);
        debug!("Sending '{}: {}' to {}", action, text, station.title);

        let (Some(scenario_id), Some(iot_id)) = (
            station.tts_scenario.as_deref().filter(|s| !s.is_empty()),
            station.iot_id.as_deref().filter(|s| !s.is_empty()),
        ) else {
            warn!("Station {} has no scenario", station.title);
            return false;
        };

        let payload = ScenarioPayload::rewrite_for_station(iot_id, action, &text);
        let result = self.client.update_scenario(scenario_id, &payload).await;
        if !is_ok(result.as_ref()) {
            error!("Failed to update scenario of {}: {:?}", station.title, result);
            return false;
        }

        let result = self.client.trigger_scenario(scenario_id).await;
        if !is_ok(result.as_ref()) {
            error!("Failed to run scenario of {}: {:?}", station.title, result);
            return false;
        }
        true
    }
}
