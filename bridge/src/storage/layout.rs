//! Storage layout configuration

use std::path::PathBuf;

use crate::errors::BridgeError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Name of the cache sub-directory owned by this module
pub const MODULE_CACHE_DIR: &str = "YandexDevices";

/// Storage layout for the bridge
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Base directory for all storage
    pub base_dir: PathBuf,
}

impl StorageLayout {
    /// Create a new storage layout
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Get the settings file path
    pub fn settings_file(&self) -> File {
        File::new(self.base_dir.join("settings.json"))
    }

    /// Get the local record store file
    pub fn store_file(&self) -> File {
        File::new(self.base_dir.join("yadevices.json"))
    }

    /// Get the module-scoped cache directory (session cookies live here)
    pub fn cache_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("cache").join(MODULE_CACHE_DIR))
    }

    /// Setup the storage layout (create directories)
    pub async fn setup(&self) -> Result<(), BridgeError> {
        self.cache_dir().create().await
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        #[cfg(target_os = "linux")]
        let base_dir = PathBuf::from("/var/lib/yadevices");

        #[cfg(not(target_os = "linux"))]
        let base_dir = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".yadevices");

        Self::new(base_dir)
    }
}
