//! Settings file management

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::BridgeError;
use crate::filesys::file::File;
use crate::http::endpoints::CloudEndpoints;
use crate::logs::LogLevel;

/// Bridge settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Poll device state from the cloud
    #[serde(default)]
    pub get_device_data: bool,

    /// Default per-device refresh period in seconds
    #[serde(default = "default_update_period")]
    pub update_period: u64,

    /// How often the poller looks for stale devices
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Upper bound on concurrently synced devices
    #[serde(default = "default_max_concurrent_syncs")]
    pub max_concurrent_syncs: usize,

    /// Per-request timeout for cloud calls
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Source tag used for object graph writes and method params
    #[serde(default = "default_module_name")]
    pub module_name: String,

    /// Cloud endpoints
    #[serde(default)]
    pub endpoints: CloudEndpoints,
}

fn default_update_period() -> u64 {
    60
}

fn default_poll_interval() -> u64 {
    1
}

fn default_max_concurrent_syncs() -> usize {
    8
}

fn default_request_timeout() -> u64 {
    30
}

fn default_module_name() -> String {
    "YandexDevices".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            get_device_data: false,
            update_period: default_update_period(),
            poll_interval_secs: default_poll_interval(),
            max_concurrent_syncs: default_max_concurrent_syncs(),
            request_timeout_secs: default_request_timeout(),
            module_name: default_module_name(),
            endpoints: CloudEndpoints::default(),
        }
    }
}

/// Load settings, falling back to defaults when the file is absent
pub async fn load_settings(settings_file: &File) -> Result<Settings, BridgeError> {
    match settings_file.read_json_opt::<Settings>().await? {
        Some(settings) => Ok(settings),
        None => {
            info!(
                "No settings file at {}, using defaults",
                settings_file.path().display()
            );
            Ok(Settings::default())
        }
    }
}

/// Save settings
pub async fn save_settings(settings_file: &File, settings: &Settings) -> Result<(), BridgeError> {
    settings_file.write_json(settings).await
}
