use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::loaders::LoaderType;

pub const RECEIPT_FILE: &str = "install.json";

/// Summary written into the profile root after a successful installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReceipt {
    pub version_id: String,
    pub loader: LoaderType,
    pub main_class: Option<String>,
    pub asset_index: Option<String>,
    /// Classpath in launch order, client jar last.
    pub classpath: Vec<PathBuf>,
    pub natives_dir: PathBuf,
    pub java_major: u32,
    /// Files fetched during this run.
    pub downloaded: usize,
    /// Files that were already in place and verified.
    pub reused: usize,
    pub processors_run: usize,
    pub installed_at: DateTime<Utc>,
}

impl InstallReceipt {
    pub fn path(profile_dir: &Path) -> PathBuf {
        profile_dir.join(RECEIPT_FILE)
    }

    pub async fn write(&self, profile_dir: &Path) -> LauncherResult<PathBuf> {
        let path = Self::path(profile_dir);
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| LauncherError::io(&path, e))?;
        Ok(path)
    }

    pub async fn read(profile_dir: &Path) -> LauncherResult<Self> {
        let path = Self::path(profile_dir);
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| LauncherError::io(&path, e))?;
        Ok(serde_json::from_str(&raw)?)
    }
}
