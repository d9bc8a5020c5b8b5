use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::core::downloader::{
    BatchReport, DownloadTask, Downloader, ProgressCategory, ProgressTracker,
};
use crate::core::error::{LauncherError, LauncherResult};

pub const RESOURCES_URL: &str = "https://resources.download.minecraft.net";
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Top-level asset index JSON structure.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetIndex {
    pub objects: HashMap<String, AssetObject>,
    /// Legacy indexes that expect a name-addressed copy under `assets/virtual`.
    #[serde(default, rename = "virtual")]
    pub is_virtual: bool,
    /// Very old indexes that expect a copy under the profile's `resources`.
    #[serde(default)]
    pub map_to_resources: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

impl AssetIndex {
    pub fn parse(raw: &str) -> LauncherResult<Self> {
        let index: AssetIndex = serde_json::from_str(raw)?;
        if let Some((name, _)) = index
            .objects
            .iter()
            .find(|(_, obj)| !is_sha1_hex(&obj.hash))
        {
            return Err(LauncherError::InvalidManifest(format!(
                "asset {} has an invalid hash",
                name
            )));
        }
        Ok(index)
    }

    pub async fn load(path: &Path) -> LauncherResult<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| LauncherError::io(path, e))?;
        Self::parse(&raw)
    }

    /// Objects sorted by virtual path, so plans are reproducible.
    pub fn entries(&self) -> Vec<(&str, &AssetObject)> {
        let mut entries: Vec<_> = self
            .objects
            .iter()
            .map(|(name, obj)| (name.as_str(), obj))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    pub fn needs_materializing(&self) -> bool {
        self.is_virtual || self.map_to_resources
    }
}

/// Object names double as paths, so only a full SHA-1 is accepted.
fn is_sha1_hex(hash: &str) -> bool {
    hash.len() == 40 && hash.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Maps asset objects onto content-addressed storage.
#[derive(Debug, Clone)]
pub struct AssetPlanner {
    objects_dir: PathBuf,
    resources_base: String,
    batch_size: usize,
}

impl AssetPlanner {
    pub fn new(objects_dir: impl Into<PathBuf>) -> Self {
        Self {
            objects_dir: objects_dir.into(),
            resources_base: RESOURCES_URL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_resources_base(mut self, base: Option<&str>) -> Self {
        if let Some(base) = base.filter(|b| !b.trim().is_empty()) {
            self.resources_base = base.trim_end_matches('/').to_string();
        }
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// `objects/<first two hex chars>/<hash>`, independent of the virtual name.
    pub fn object_path(&self, hash: &str) -> PathBuf {
        self.objects_dir.join(&hash[..2]).join(hash)
    }

    pub fn object_url(&self, hash: &str) -> String {
        format!("{}/{}/{}", self.resources_base, &hash[..2], hash)
    }

    /// One task per object. Duplicate content yields tasks sharing a
    /// destination; the second one finds the file already verified.
    pub fn plan(&self, index: &AssetIndex) -> Vec<DownloadTask> {
        index
            .entries()
            .into_iter()
            .map(|(name, obj)| {
                DownloadTask::new(
                    self.object_url(&obj.hash),
                    self.object_path(&obj.hash),
                    Some(obj.hash.clone()),
                    ProgressCategory::Resources,
                )
                .with_size(Some(obj.size))
                .with_display_name(name)
            })
            .collect()
    }

    /// Download every object, one fixed-size batch at a time. A batch is
    /// fully drained before the next one is queued.
    pub async fn download(
        &self,
        index: &AssetIndex,
        downloader: &Downloader,
        progress: &ProgressTracker,
    ) -> LauncherResult<BatchReport> {
        let tasks = self.plan(index);
        progress.reset(tasks.len());
        info!(
            "Syncing {} asset objects in batches of {}",
            tasks.len(),
            self.batch_size
        );

        let mut report = BatchReport::default();
        let mut remaining = tasks.into_iter().peekable();
        let mut batch_no = 0;
        while remaining.peek().is_some() {
            downloader.cancel_flag().check()?;
            batch_no += 1;
            let batch: Vec<_> = remaining.by_ref().take(self.batch_size).collect();
            debug!("Asset batch {} ({} objects)", batch_no, batch.len());
            report.merge(downloader.download_batch(batch, progress).await?);
        }
        Ok(report)
    }
}
