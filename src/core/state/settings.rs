use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::error::{LauncherError, LauncherResult};

const SETTINGS_FILE: &str = "installer_settings.json";

/// Operator-tunable knobs for an installation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerSettings {
    pub download_concurrency: usize,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Asset objects queued per batch.
    pub asset_batch_size: usize,
    pub extract_natives: bool,
    pub cleanup_on_failure: bool,
    /// Mirror for content-addressed asset objects.
    pub resources_base_url: Option<String>,
    /// Mirror for libraries that carry no explicit URL.
    pub libraries_base_url: Option<String>,
}

impl Default for InstallerSettings {
    fn default() -> Self {
        Self {
            download_concurrency: 8,
            retry_attempts: 3,
            retry_delay_ms: 2000,
            request_timeout_secs: 300,
            connect_timeout_secs: 30,
            asset_batch_size: 500,
            extract_natives: true,
            cleanup_on_failure: true,
            resources_base_url: None,
            libraries_base_url: None,
        }
    }
}

impl InstallerSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Read settings from `data_root`. Missing or unreadable files fall back
    /// to defaults.
    pub fn load(data_root: &Path) -> Self {
        let path = data_root.join(SETTINGS_FILE);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!("Cannot read {:?}, using defaults: {}", path, e);
                return Self::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Corrupt settings in {:?}, using defaults: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self, data_root: &Path) -> LauncherResult<()> {
        std::fs::create_dir_all(data_root).map_err(|e| LauncherError::io(data_root, e))?;
        let path = data_root.join(SETTINGS_FILE);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|e| LauncherError::io(&path, e))
    }
}
