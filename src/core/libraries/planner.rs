// ─── Library Planner ───
// Expands a version manifest into the concrete core download tasks.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::core::downloader::{DownloadTask, ProgressCategory};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::{MavenArtifact, PathResolver, MOJANG_LIBRARIES};
use crate::core::platform::PlatformInfo;
use crate::core::state::GameLayout;
use crate::core::version::{LibDownloadArtifact, LibraryEntry, RuleEvaluator, VersionJson};

/// A library that made it through rule evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLibrary {
    pub name: String,
    pub path: PathBuf,
    pub include_in_classpath: bool,
}

/// Everything the core download stage has to fetch.
#[derive(Debug, Clone)]
pub struct LibraryPlan {
    pub client: DownloadTask,
    pub libraries: Vec<DownloadTask>,
    pub natives: Vec<DownloadTask>,
    pub asset_index: Option<DownloadTask>,
    pub logging: Option<DownloadTask>,
    /// Primary artifacts in manifest order, for the receipt and classpath.
    pub planned: Vec<PlannedLibrary>,
}

impl LibraryPlan {
    /// Files counted by the core progress category, fixed for the whole run.
    ///
    /// For a complete manifest this is `1 + libraries + natives + 2`.
    pub fn total(&self) -> usize {
        1 + self.libraries.len()
            + self.natives.len()
            + usize::from(self.asset_index.is_some())
            + usize::from(self.logging.is_some())
    }

    /// Client jar, libraries, natives and logging config. The asset index is
    /// fetched by the asset stage, which needs its content.
    pub fn core_batch(&self) -> Vec<DownloadTask> {
        let mut tasks = Vec::with_capacity(self.total());
        tasks.push(self.client.clone());
        tasks.extend(self.libraries.iter().cloned());
        tasks.extend(self.natives.iter().cloned());
        tasks.extend(self.logging.iter().cloned());
        tasks
    }

    /// Classpath entries: libraries flagged for the classpath, then the client.
    pub fn classpath(&self) -> Vec<PathBuf> {
        self.planned
            .iter()
            .filter(|lib| lib.include_in_classpath)
            .map(|lib| lib.path.clone())
            .chain(std::iter::once(self.client.dest.clone()))
            .collect()
    }
}

/// Turns manifest library lists into download tasks for one platform.
pub struct LibraryPlanner<'a> {
    layout: &'a GameLayout,
    resolver: PathResolver,
    platform: PlatformInfo,
    libraries_base: String,
}

impl<'a> LibraryPlanner<'a> {
    pub fn new(layout: &'a GameLayout, platform: PlatformInfo) -> Self {
        Self {
            layout,
            resolver: PathResolver::new(&layout.libraries_dir),
            platform,
            libraries_base: MOJANG_LIBRARIES.to_string(),
        }
    }

    /// Repository base for libraries that carry neither a URL nor a `url` hint.
    pub fn with_libraries_base(mut self, base: Option<&str>) -> Self {
        if let Some(base) = base.filter(|b| !b.trim().is_empty()) {
            self.libraries_base = base.to_string();
        }
        self
    }

    /// Plan the core downloads for `version`.
    ///
    /// `loader_libraries` come from a loader profile and are planned before
    /// the vanilla list; a destination already claimed is not planned twice.
    pub fn plan(
        &self,
        version: &VersionJson,
        loader_libraries: &[LibraryEntry],
    ) -> LauncherResult<LibraryPlan> {
        let client = version.client_download().ok_or_else(|| {
            LauncherError::InvalidManifest(format!("{} has no client download", version.id))
        })?;
        let client = DownloadTask::new(
            &client.url,
            self.layout.client_jar(&version.id),
            Some(client.sha1.clone()),
            ProgressCategory::Core,
        )
        .with_size(client.size)
        .with_display_name(format!("{}.jar", version.id));

        let rules = RuleEvaluator::new(self.platform.clone(), Some(&version.id));
        let identifiers = rules.identifiers();

        let mut claimed = HashSet::new();
        let mut libraries = Vec::new();
        let mut natives = Vec::new();
        let mut planned = Vec::new();

        for lib in loader_libraries.iter().chain(version.libraries.iter()) {
            if !lib.downloadable {
                debug!("Skipping library (not downloadable): {}", lib.name);
                continue;
            }
            if !rules.allows(&lib.rules) {
                debug!("Skipping library (OS rule): {}", lib.name);
                continue;
            }

            if let Some(task) = self.primary_task(lib) {
                if claimed.insert(task.dest.clone()) {
                    planned.push(PlannedLibrary {
                        name: lib.name.clone(),
                        path: task.dest.clone(),
                        include_in_classpath: lib.include_in_classpath,
                    });
                    libraries.push(task);
                } else {
                    debug!("Library already planned: {}", lib.name);
                }
            }

            if let Some(classifier) = lib.native_classifier(&self.platform, &identifiers) {
                match self.native_task(lib, &classifier) {
                    Some(task) if claimed.insert(task.dest.clone()) => natives.push(task),
                    Some(_) => {}
                    None => warn!("No {} native declared for {}", classifier, lib.name),
                }
            }
        }

        let asset_index = version.asset_index.as_ref().map(|ai| {
            DownloadTask::new(
                &ai.url,
                self.layout.asset_index_path(&ai.id),
                ai.sha1.clone(),
                ProgressCategory::Core,
            )
            .with_display_name(format!("asset index {}", ai.id))
        });

        let logging = version.logging_config().map(|cfg| {
            DownloadTask::new(
                &cfg.file.url,
                self.layout.logging_config_path(&cfg.file.id),
                cfg.file.sha1.clone(),
                ProgressCategory::Core,
            )
        });

        let plan = LibraryPlan {
            client,
            libraries,
            natives,
            asset_index,
            logging,
            planned,
        };
        info!(
            "Planned {} libraries and {} natives for {} ({} core files)",
            plan.libraries.len(),
            plan.natives.len(),
            version.id,
            plan.total()
        );
        Ok(plan)
    }

    fn primary_task(&self, lib: &LibraryEntry) -> Option<DownloadTask> {
        let downloads = lib.downloads.as_ref();
        let artifact = downloads.and_then(|d| d.artifact.as_ref());

        // Native-only entries from older manifests declare classifiers but
        // no primary artifact.
        if artifact.is_none() && downloads.is_some_and(|d| d.classifiers.is_some()) {
            return None;
        }

        let parsed = MavenArtifact::parse(&lib.name).ok();
        Some(self.artifact_task(lib, artifact, parsed.as_ref(), self.layout.libraries_dir.clone()))
    }

    fn native_task(&self, lib: &LibraryEntry, classifier: &str) -> Option<DownloadTask> {
        let declared = lib
            .downloads
            .as_ref()
            .and_then(|d| d.classifiers.as_ref())
            .and_then(|c| c.get(classifier));

        let parsed = MavenArtifact::parse(&lib.name).ok().map(|mut a| {
            a.classifier = Some(classifier.to_string());
            a
        });

        // With neither a declared artifact nor a parseable name there is
        // nothing to derive a location from.
        if declared.is_none() && parsed.is_none() {
            return None;
        }
        if declared.is_none() && lib.downloads.is_some() {
            return None;
        }

        Some(self.artifact_task(lib, declared, parsed.as_ref(), self.layout.natives_dir.clone()))
    }

    fn artifact_task(
        &self,
        lib: &LibraryEntry,
        declared: Option<&LibDownloadArtifact>,
        parsed: Option<&MavenArtifact>,
        root: PathBuf,
    ) -> DownloadTask {
        let relative = declared
            .and_then(|a| a.path.clone())
            .filter(|p| !p.trim().is_empty())
            .or_else(|| parsed.map(|a| a.relative_path()))
            .unwrap_or_else(|| lib.name.clone());
        let dest = PathResolver::new(root).declared(&relative);

        let url = declared
            .and_then(|a| a.url.clone())
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| {
                let base = lib.url.as_deref().unwrap_or(&self.libraries_base);
                match parsed {
                    Some(artifact) => artifact.url(base),
                    None => format!("{}/{}", base.trim_end_matches('/'), relative),
                }
            });

        DownloadTask::new(
            url,
            dest,
            declared.and_then(|a| a.sha1.clone()),
            ProgressCategory::Core,
        )
        .with_size(declared.and_then(|a| a.size))
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }
}
