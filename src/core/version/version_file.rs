// ─── Version File ───
// Parsed form of a version manifest JSON and its library entries.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::java::required_java_for_minecraft_version;
use crate::core::platform::PlatformInfo;

/// A fully parsed version manifest.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionJson {
    pub id: String,
    #[serde(default)]
    pub main_class: Option<String>,
    #[serde(default)]
    pub inherits_from: Option<String>,
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    #[serde(default)]
    pub downloads: Option<VersionDownloads>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexInfo>,
    /// Legacy asset index id, used when `assetIndex` is absent.
    #[serde(default)]
    pub assets: Option<String>,
    #[serde(default)]
    pub logging: Option<LoggingInfo>,
    #[serde(default)]
    pub java_version: Option<JavaVersionInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    #[serde(default)]
    pub component: Option<String>,
    pub major_version: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionDownloads {
    pub client: Option<DownloadArtifact>,
    #[serde(default)]
    pub server: Option<DownloadArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadArtifact {
    pub sha1: String,
    #[serde(default)]
    pub size: Option<u64>,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexInfo {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub total_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingInfo {
    #[serde(default)]
    pub client: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// JVM argument template containing `${path}`.
    #[serde(default)]
    pub argument: Option<String>,
    pub file: LoggingFile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingFile {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

// ─── Library Entry with Rules ───

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryEntry {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default)]
    pub rules: Vec<LibraryRule>,
    /// OS key → classifier key, e.g. `{"linux": "natives-linux"}`.
    #[serde(default)]
    pub natives: Option<HashMap<String, String>>,
    /// Repository base for loader-style entries without `downloads`.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_true")]
    pub downloadable: bool,
    #[serde(default = "default_true")]
    pub include_in_classpath: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<LibDownloadArtifact>,
    #[serde(default)]
    pub classifiers: Option<HashMap<String, LibDownloadArtifact>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibDownloadArtifact {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
}

// ─── OS Rules ───

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryRule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl LibraryEntry {
    /// Pick the native classifier for this platform, walking the platform
    /// identifiers from most to least specific.
    pub fn native_classifier(&self, platform: &PlatformInfo, identifiers: &[String]) -> Option<String> {
        let natives = self.natives.as_ref()?;
        identifiers
            .iter()
            .find_map(|id| natives.get(id))
            .map(|classifier| classifier.replace("${arch}", platform.arch_bits()))
    }
}

impl VersionJson {
    pub fn parse(raw: &str) -> LauncherResult<Self> {
        let version: VersionJson = serde_json::from_str(raw)?;
        version.validate()?;
        Ok(version)
    }

    /// Structural checks serde cannot express.
    pub fn validate(&self) -> LauncherResult<()> {
        if self.id.trim().is_empty() {
            return Err(LauncherError::InvalidManifest("version id is empty".into()));
        }
        if let Some(lib) = self.libraries.iter().find(|lib| lib.name.trim().is_empty()) {
            return Err(LauncherError::InvalidManifest(format!(
                "library with empty name in {} (downloads: {})",
                self.id,
                lib.downloads.is_some()
            )));
        }
        Ok(())
    }

    /// Asset index id, falling back to the legacy `assets` field.
    pub fn asset_index_id(&self) -> Option<&str> {
        self.asset_index
            .as_ref()
            .map(|ai| ai.id.as_str())
            .or(self.assets.as_deref())
    }

    pub fn client_download(&self) -> Option<&DownloadArtifact> {
        self.downloads.as_ref().and_then(|d| d.client.as_ref())
    }

    pub fn logging_config(&self) -> Option<&LoggingConfig> {
        self.logging.as_ref().and_then(|l| l.client.as_ref())
    }

    /// Get the required Java major version from the version JSON.
    pub fn required_java_major(&self) -> u32 {
        self.java_version
            .as_ref()
            .map(|j| j.major_version)
            .unwrap_or_else(|| required_java_for_minecraft_version(&self.id))
    }

    /// Build a merged version JSON with `parent_json` as base and this version
    /// overriding matching keys. Libraries are concatenated, child first.
    pub fn merge_with_parent_json(
        current_json: &serde_json::Value,
        parent_json: &serde_json::Value,
    ) -> serde_json::Value {
        let mut merged = parent_json.clone();

        if let Some(obj) = current_json.as_object() {
            for (k, v) in obj {
                if k == "libraries" {
                    let mut libs = v.as_array().cloned().unwrap_or_default();
                    if let Some(parent_libs) = parent_json.get("libraries").and_then(|l| l.as_array()) {
                        libs.extend(parent_libs.iter().cloned());
                    }
                    merged[k] = serde_json::Value::Array(libs);
                } else if k != "inheritsFrom" {
                    merged[k] = v.clone();
                }
            }
        }

        merged
    }
}
