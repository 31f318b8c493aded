//! Scenario and station API

use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec;
use crate::http::client::QuasarClient;
use crate::http::devices::null_as_empty;

/// Capability type that makes a station speak or run a command
pub const SERVER_ACTION: &str = "devices.capabilities.quasar.server_action";

/// Speak the value verbatim
pub const PHRASE_ACTION: &str = "phrase_action";

/// Execute the value as if it were spoken to the station
pub const TEXT_ACTION: &str = "text_action";

/// `GET /m/user/scenarios`
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioList {
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub scenarios: Vec<ScenarioSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioSummary {
    pub id: String,

    #[serde(default)]
    pub name: String,
}

/// `POST /m/user/scenarios/`
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioCreated {
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub scenario_id: Option<String>,
}

/// `GET devices_online_stats`
#[derive(Debug, Clone, Deserialize)]
pub struct OnlineStats {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub items: Vec<StationItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationItem {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub icon: Option<String>,

    #[serde(default)]
    pub platform: Option<String>,

    #[serde(default)]
    pub screen_capable: bool,

    #[serde(default)]
    pub screen_present: bool,

    #[serde(default)]
    pub online: bool,
}

/// Scenario definition sent on create and update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioPayload {
    pub name: String,
    pub icon: String,
    pub triggers: Vec<ScenarioTrigger>,
    pub steps: Vec<ScenarioStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioTrigger {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioStep {
    #[serde(rename = "type")]
    pub kind: String,
    pub parameters: StepParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepParameters {
    pub requested_speaker_capabilities: Vec<Value>,
    pub launch_devices: Vec<LaunchDevice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchDevice {
    pub id: String,
    pub capabilities: Vec<LaunchCapability>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchCapability {
    #[serde(rename = "type")]
    pub kind: String,
    pub state: LaunchState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchState {
    pub instance: String,
    pub value: String,
}

impl ScenarioPayload {
    /// A voice-triggered scenario whose single step makes station `iot_id`
    /// perform `action` with `value`; the trigger is the encoded name without
    /// its marker
    pub fn for_station(iot_id: &str, action: &str, value: &str) -> Self {
        Self {
            name: codec::encode(iot_id),
            icon: "home".to_string(),
            triggers: vec![ScenarioTrigger {
                kind: "scenario.trigger.voice".to_string(),
                value: codec::encode_phrase(iot_id),
            }],
            steps: vec![ScenarioStep {
                kind: "scenarios.steps.actions".to_string(),
                parameters: StepParameters {
                    requested_speaker_capabilities: Vec::new(),
                    launch_devices: vec![LaunchDevice {
                        id: iot_id.to_string(),
                        capabilities: vec![LaunchCapability {
                            kind: SERVER_ACTION.to_string(),
                            state: LaunchState {
                                instance: action.to_string(),
                                value: value.to_string(),
                            },
                        }],
                    }],
                },
            }],
        }
    }

    /// The scenario as rewritten before each run; the voice trigger is the full
    /// encoded name, marker included
    pub fn rewrite_for_station(iot_id: &str, action: &str, value: &str) -> Self {
        let mut payload = Self::for_station(iot_id, action, value);
        for trigger in &mut payload.triggers {
            trigger.value = payload.name.clone();
        }
        payload
    }
}

impl QuasarClient {
    pub async fn list_scenarios(&self) -> Option<ScenarioList> {
        self.get_as(&self.endpoints().scenarios()).await
    }

    pub async fn create_scenario(&self, scenario: &ScenarioPayload) -> Option<ScenarioCreated> {
        let body = serde_json::to_value(scenario).ok()?;
        let url = self.endpoints().scenario_create();
        let payload = self.request(Method::POST, &url, Some(&body)).await?;
        crate::http::client::decode_payload(&url, payload)
    }

    /// Overwrite a scenario, returning the raw payload
    pub async fn update_scenario(
        &self,
        scenario_id: &str,
        scenario: &ScenarioPayload,
    ) -> Option<Value> {
        let body = serde_json::to_value(scenario).ok()?;
        self.request(Method::PUT, &self.endpoints().scenario(scenario_id), Some(&body))
            .await
    }

    /// Run a scenario's actions now, returning the raw payload
    pub async fn trigger_scenario(&self, scenario_id: &str) -> Option<Value> {
        let body = Value::Object(Default::default());
        self.request(
            Method::POST,
            &self.endpoints().scenario_actions(scenario_id),
            Some(&body),
        )
        .await
    }

    pub async fn online_stats(&self) -> Option<OnlineStats> {
        self.get_as(&self.endpoints().online_stats()).await
    }
}
