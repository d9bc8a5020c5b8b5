use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "GameSync";

/// Filesystem roots an installation writes into.
///
/// Shared caches (libraries, natives, versions, assets, runtimes) are reused
/// across installations; everything under a profile root belongs to exactly
/// one installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameLayout {
    pub libraries_dir: PathBuf,
    /// Downloaded native-classifier jars, before extraction.
    pub natives_dir: PathBuf,
    pub versions_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub runtimes_dir: PathBuf,
    pub profiles_dir: PathBuf,
}

impl GameLayout {
    /// Conventional layout below a single data root.
    pub fn from_data_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            libraries_dir: root.join("libraries"),
            natives_dir: root.join("natives"),
            versions_dir: root.join("versions"),
            assets_dir: root.join("assets"),
            runtimes_dir: root.join("runtime"),
            profiles_dir: root.join("instances"),
        }
    }

    pub fn default_data_root() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
    }

    pub fn profile_dir(&self, profile_id: &str) -> PathBuf {
        self.profiles_dir.join(profile_id)
    }

    /// Where native libraries are unpacked for one installation.
    pub fn profile_natives_dir(&self, profile_id: &str) -> PathBuf {
        self.profile_dir(profile_id).join("natives")
    }

    pub fn client_jar(&self, version_id: &str) -> PathBuf {
        self.versions_dir
            .join(version_id)
            .join(format!("{version_id}.jar"))
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.assets_dir.join("objects")
    }

    pub fn asset_index_path(&self, index_id: &str) -> PathBuf {
        self.assets_dir
            .join("indexes")
            .join(format!("{index_id}.json"))
    }

    pub fn logging_config_path(&self, file_id: &str) -> PathBuf {
        self.assets_dir.join("log_configs").join(file_id)
    }

    pub fn virtual_assets_dir(&self, index_id: &str) -> PathBuf {
        self.assets_dir.join("virtual").join(index_id)
    }

    /// Shared directories, created before any download starts.
    pub fn shared_dirs(&self) -> [&Path; 6] {
        [
            &self.libraries_dir,
            &self.natives_dir,
            &self.versions_dir,
            &self.assets_dir,
            &self.runtimes_dir,
            &self.profiles_dir,
        ]
    }
}

impl Default for GameLayout {
    fn default() -> Self {
        Self::from_data_root(Self::default_data_root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_paths_from_data_root() {
        let layout = GameLayout::from_data_root("/data");
        assert_eq!(layout.libraries_dir, PathBuf::from("/data/libraries"));
        assert_eq!(
            layout.client_jar("1.20.1"),
            PathBuf::from("/data/versions/1.20.1/1.20.1.jar")
        );
        assert_eq!(
            layout.asset_index_path("5"),
            PathBuf::from("/data/assets/indexes/5.json")
        );
        assert_eq!(
            layout.profile_natives_dir("pack"),
            PathBuf::from("/data/instances/pack/natives")
        );
    }

    #[test]
    fn default_root_ends_with_app_dir() {
        assert!(GameLayout::default_data_root().ends_with(APP_DIR_NAME));
    }
}
