use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::version::LibraryEntry;

/// Mod loader a profile was installed with.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LoaderType {
    #[default]
    Vanilla,
    Forge,
    Fabric,
    NeoForge,
    Quilt,
}

impl std::fmt::Display for LoaderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoaderType::Vanilla => write!(f, "vanilla"),
            LoaderType::Forge => write!(f, "forge"),
            LoaderType::Fabric => write!(f, "fabric"),
            LoaderType::NeoForge => write!(f, "neoforge"),
            LoaderType::Quilt => write!(f, "quilt"),
        }
    }
}

/// Overlay contributed by a loader on top of a version manifest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderProfile {
    #[serde(skip)]
    pub loader: LoaderType,
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    #[serde(default)]
    pub main_class: Option<String>,
    #[serde(default)]
    pub processors: Vec<Processor>,
    #[serde(default)]
    pub data: HashMap<String, DataValue>,
}

/// One post-install step, run as `java -cp <jar + classpath> <Main-Class> args`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Processor {
    #[serde(default)]
    pub jar: String,
    #[serde(default)]
    pub classpath: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub sides: Option<Vec<String>>,
    /// Output path → expected SHA-1, both subject to placeholder substitution.
    #[serde(default)]
    pub outputs: HashMap<String, String>,
}

impl Processor {
    pub fn runs_on(&self, side: &str) -> bool {
        self.sides
            .as_ref()
            .map_or(true, |sides| sides.iter().any(|s| s == side))
    }

    /// Label used in progress and errors.
    pub fn display_name(&self) -> &str {
        if self.jar.trim().is_empty() {
            "Unknown"
        } else {
            &self.jar
        }
    }
}

/// A `data` entry: per-side values or one shared value.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Sided {
        client: String,
        #[serde(default)]
        server: Option<String>,
    },
    Shared(String),
}

impl DataValue {
    pub fn for_side(&self, side: &str) -> Option<&str> {
        match self {
            DataValue::Shared(value) => Some(value),
            DataValue::Sided { client, server } => match side {
                "server" => server.as_deref(),
                _ => Some(client),
            },
        }
    }
}

impl LoaderProfile {
    pub fn parse(loader: LoaderType, raw: &str) -> LauncherResult<Self> {
        let mut profile: LoaderProfile = serde_json::from_str(raw)?;
        profile.loader = loader;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> LauncherResult<()> {
        if let Some(lib) = self.libraries.iter().find(|l| l.name.trim().is_empty()) {
            return Err(LauncherError::InvalidManifest(format!(
                "{} profile has a library without a name (url: {:?})",
                self.loader, lib.url
            )));
        }
        Ok(())
    }

    pub fn has_processors(&self) -> bool {
        !self.processors.is_empty()
    }
}
