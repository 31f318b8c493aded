//! Local speaker station records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a station speaks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum TtsMode {
    #[default]
    Off,
    /// Spoken through a "repeat after me" command
    Local,
    /// Spoken through the cloud scenario
    Cloud,
}

impl From<u8> for TtsMode {
    fn from(value: u8) -> Self {
        match value {
            1 => TtsMode::Local,
            2 => TtsMode::Cloud,
            _ => TtsMode::Off,
        }
    }
}

impl From<TtsMode> for u8 {
    fn from(mode: TtsMode) -> Self {
        match mode {
            TtsMode::Off => 0,
            TtsMode::Local => 1,
            TtsMode::Cloud => 2,
        }
    }
}

/// A cloud-registered speaker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: i64,

    /// Speaker platform id, unique
    pub station_id: String,

    /// Smart-home id of the matching device, learned by directory sync
    #[serde(default)]
    pub iot_id: Option<String>,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub platform: Option<String>,

    #[serde(default)]
    pub icon: Option<String>,

    #[serde(default)]
    pub ip: Option<String>,

    #[serde(default)]
    pub screen_capable: bool,

    #[serde(default)]
    pub screen_present: bool,

    #[serde(default)]
    pub online: bool,

    #[serde(default)]
    pub tts: TtsMode,

    /// Literal level, or an `object.property` path when it contains a dot
    #[serde(default)]
    pub min_level: Option<String>,

    /// Id of the cloud scenario used for speech and commands
    #[serde(default)]
    pub tts_scenario: Option<String>,

    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
}

impl Station {
    pub fn new(id: i64, station_id: impl Into<String>) -> Self {
        Self {
            id,
            station_id: station_id.into(),
            iot_id: None,
            title: String::new(),
            platform: None,
            icon: None,
            ip: None,
            screen_capable: false,
            screen_present: false,
            online: false,
            tts: TtsMode::Off,
            min_level: None,
            tts_scenario: None,
            updated: None,
        }
    }
}

/// Where a station's minimum speech level comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MinLevel<'a> {
    Literal(&'a str),
    Property(&'a str),
}

impl<'a> MinLevel<'a> {
    /// Classify a configured level; a dot means an object graph property
    pub fn parse(raw: &'a str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            None
        } else if raw.contains('.') {
            Some(MinLevel::Property(raw))
        } else {
            Some(MinLevel::Literal(raw))
        }
    }
}
