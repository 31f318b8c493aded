//! Application configuration options

use std::time::Duration;

use crate::http::endpoints::CloudEndpoints;
use crate::storage::layout::StorageLayout;
use crate::storage::settings::Settings;
use crate::sync::device_state;
use crate::workers::poller;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Storage layout paths
    pub layout: StorageLayout,

    /// Cloud endpoints
    pub endpoints: CloudEndpoints,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// Enable the device state poller
    pub enable_poller: bool,

    /// Poller worker options
    pub poller: poller::Options,

    /// Device state sync options
    pub device_sync: device_state::Options,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            layout: StorageLayout::default(),
            endpoints: CloudEndpoints::default(),
            request_timeout: Duration::from_secs(30),
            enable_poller: false,
            poller: poller::Options::default(),
            device_sync: device_state::Options::default(),
        }
    }
}

impl AppOptions {
    /// Derive run options from stored settings
    pub fn from_settings(settings: &Settings, layout: StorageLayout) -> Self {
        Self {
            layout,
            endpoints: settings.endpoints.clone(),
            request_timeout: Duration::from_secs(settings.request_timeout_secs.max(1)),
            enable_poller: settings.get_device_data,
            poller: poller::Options {
                interval: Duration::from_secs(settings.poll_interval_secs.max(1)),
                ..Default::default()
            },
            device_sync: device_state::Options {
                default_period: settings.update_period,
                max_concurrent: settings.max_concurrent_syncs.max(1),
                module_name: settings.module_name.clone(),
            },
            ..Default::default()
        }
    }
}

/// Lifecycle options for the bridge
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}
