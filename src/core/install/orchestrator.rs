// ─── Installation Orchestrator ───
// Directories, then core ∥ assets downloads, then natives and processors.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, instrument, warn};

use super::receipt::InstallReceipt;
use crate::core::assets::{materialize_virtual, AssetIndex, AssetPlanner};
use crate::core::downloader::{
    BatchReport, DownloadOutcome, DownloadState, Downloader, ProgressCategory, ProgressSink,
    ProgressTracker,
};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::java::JavaResolver;
use crate::core::launch::ProcessLauncher;
use crate::core::libraries::{extract_natives, LibraryPlan, LibraryPlanner};
use crate::core::loaders::{
    LoaderProfile, LoaderType, PlaceholderEnv, PlaceholderTable, ProcessorRunner, CLIENT_SIDE,
};
use crate::core::maven::PathResolver;
use crate::core::platform::PlatformInfo;
use crate::core::state::{GameLayout, InstallerSettings};
use crate::core::version::VersionJson;

const INSTALLER_DATA_DIR: &str = ".installer-data";

/// Where an installation run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallStage {
    Idle,
    CreatingDirectories,
    /// Core files and assets, concurrently.
    Downloading,
    ExtractingNatives,
    RunningProcessors,
    Complete,
    Failed,
}

/// What to install, as already-parsed manifests.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    /// Name of the per-installation directory under the profiles root.
    pub profile_id: String,
    pub version: VersionJson,
    pub loader: Option<LoaderProfile>,
    /// Loader installer archive, for processor data embedded in it.
    pub installer_archive: Option<PathBuf>,
}

impl InstallRequest {
    pub fn vanilla(profile_id: impl Into<String>, version: VersionJson) -> Self {
        Self {
            profile_id: profile_id.into(),
            version,
            loader: None,
            installer_archive: None,
        }
    }

    pub fn with_loader(mut self, loader: LoaderProfile, installer: Option<PathBuf>) -> Self {
        self.loader = Some(loader);
        self.installer_archive = installer;
        self
    }
}

/// Collaborators the orchestrator drives. Constructed once by the caller.
#[derive(Clone)]
pub struct InstallServices {
    pub downloader: Arc<Downloader>,
    pub java: Arc<dyn JavaResolver>,
    pub launcher: Arc<dyn ProcessLauncher>,
    pub progress: Arc<dyn ProgressSink>,
}

pub struct InstallationOrchestrator {
    layout: GameLayout,
    settings: InstallerSettings,
    platform: PlatformInfo,
    services: InstallServices,
    core_progress: ProgressTracker,
    resource_progress: ProgressTracker,
    processor_progress: ProgressTracker,
    stage: Mutex<InstallStage>,
}

impl InstallationOrchestrator {
    pub fn new(layout: GameLayout, settings: InstallerSettings, services: InstallServices) -> Self {
        let sink = services.progress.clone();
        Self {
            layout,
            settings,
            platform: PlatformInfo::current(),
            core_progress: ProgressTracker::new(ProgressCategory::Core, 0, sink.clone()),
            resource_progress: ProgressTracker::new(ProgressCategory::Resources, 0, sink.clone()),
            processor_progress: ProgressTracker::new(ProgressCategory::Processors, 0, sink),
            services,
            stage: Mutex::new(InstallStage::Idle),
        }
    }

    /// Plan for a platform other than the host.
    pub fn with_platform(mut self, platform: PlatformInfo) -> Self {
        self.platform = platform;
        self
    }

    pub fn layout(&self) -> &GameLayout {
        &self.layout
    }

    pub fn stage(&self) -> InstallStage {
        *self.stage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_stage(&self, stage: InstallStage) {
        *self.stage.lock().unwrap_or_else(PoisonError::into_inner) = stage;
    }

    /// Progress of the core and resource downloads of the current run.
    pub fn download_state(&self) -> DownloadState {
        DownloadState {
            core: self.core_progress.snapshot(),
            resources: self.resource_progress.snapshot(),
        }
    }

    /// Ask the running installation to stop at its next poll point.
    pub fn cancel(&self) {
        self.services.downloader.cancel_flag().cancel();
    }

    /// Materialize a complete installation for `request`.
    ///
    /// A failure to create directories aborts before anything is written.
    /// Any later failure removes the profile root when `cleanup_on_failure`
    /// is set and this run created it; an existing root and the shared
    /// library and asset caches are kept.
    #[instrument(skip(self, request), fields(version = %request.version.id, profile = %request.profile_id))]
    pub async fn install(&self, request: &InstallRequest) -> LauncherResult<InstallReceipt> {
        self.set_stage(InstallStage::CreatingDirectories);
        let profile_dir = self.layout.profile_dir(&request.profile_id);
        // Only a root this run created is ours to remove on failure.
        let created_profile = !profile_dir.exists();
        if let Err(e) = self.create_directories(&profile_dir) {
            self.set_stage(InstallStage::Failed);
            return Err(e);
        }

        match self.run_stages(request, &profile_dir).await {
            Ok(receipt) => {
                self.set_stage(InstallStage::Complete);
                info!("Installation of {} complete", request.version.id);
                Ok(receipt)
            }
            Err(e) => {
                self.set_stage(InstallStage::Failed);
                warn!("Installation of {} failed: {}", request.version.id, e);
                if self.settings.cleanup_on_failure && created_profile {
                    if let Err(cleanup) = cleanup_installation(&profile_dir).await {
                        warn!("Cleanup of {:?} failed: {}", profile_dir, cleanup);
                    }
                } else if self.settings.cleanup_on_failure {
                    info!("Keeping pre-existing installation directory {:?}", profile_dir);
                }
                Err(e)
            }
        }
    }

    fn create_directories(&self, profile_dir: &Path) -> LauncherResult<()> {
        let dirs = self
            .layout
            .shared_dirs()
            .into_iter()
            .chain([profile_dir]);
        for dir in dirs {
            std::fs::create_dir_all(dir).map_err(|e| LauncherError::io(dir, e))?;
        }
        Ok(())
    }

    async fn run_stages(
        &self,
        request: &InstallRequest,
        profile_dir: &Path,
    ) -> LauncherResult<InstallReceipt> {
        let version = &request.version;
        let loader = request.loader.as_ref();

        let plan = LibraryPlanner::new(&self.layout, self.platform.clone())
            .with_libraries_base(self.settings.libraries_base_url.as_deref())
            .plan(version, loader.map_or(&[][..], |l| l.libraries.as_slice()))?;

        self.core_progress.reset(plan.total());
        self.resource_progress.reset(0);
        self.processor_progress.reset(0);

        self.set_stage(InstallStage::Downloading);
        let downloader = &self.services.downloader;
        let (core, assets) = tokio::try_join!(
            downloader.download_batch(plan.core_batch(), &self.core_progress),
            self.sync_assets(&plan, version, profile_dir),
        )?;
        let mut totals = core;
        totals.merge(assets);

        let natives_dir = self.layout.profile_natives_dir(&request.profile_id);
        if self.settings.extract_natives && !plan.natives.is_empty() {
            self.set_stage(InstallStage::ExtractingNatives);
            let jars: Vec<PathBuf> = plan.natives.iter().map(|t| t.dest.clone()).collect();
            extract_natives(&jars, &natives_dir).await?;
        }

        let mut processors_run = 0;
        if let Some(profile) = loader.filter(|l| l.has_processors()) {
            self.set_stage(InstallStage::RunningProcessors);
            processors_run = self
                .run_processors(request, profile, &plan, profile_dir)
                .await?;
        }

        let receipt = InstallReceipt {
            version_id: version.id.clone(),
            loader: loader.map_or(LoaderType::Vanilla, |l| l.loader),
            main_class: loader
                .and_then(|l| l.main_class.clone())
                .or_else(|| version.main_class.clone()),
            asset_index: version.asset_index_id().map(str::to_string),
            classpath: plan.classpath(),
            natives_dir,
            java_major: version.required_java_major(),
            downloaded: totals.downloaded,
            reused: totals.skipped,
            processors_run,
            installed_at: chrono::Utc::now(),
        };
        receipt.write(profile_dir).await?;
        Ok(receipt)
    }

    /// Fetch the asset index (counted as a core file), then every object.
    async fn sync_assets(
        &self,
        plan: &LibraryPlan,
        version: &VersionJson,
        profile_dir: &Path,
    ) -> LauncherResult<BatchReport> {
        let Some(index_task) = &plan.asset_index else {
            info!("{} declares no asset index", version.id);
            return Ok(BatchReport::default());
        };

        let downloader = &self.services.downloader;
        let mut report = BatchReport::default();
        match downloader.download_task(index_task).await? {
            DownloadOutcome::AlreadyPresent => report.skipped += 1,
            DownloadOutcome::Downloaded { bytes } => {
                report.downloaded += 1;
                report.bytes += bytes;
            }
        }
        self.core_progress.complete(&index_task.display_name);

        let index = AssetIndex::load(&index_task.dest).await?;
        let planner = AssetPlanner::new(self.layout.objects_dir())
            .with_resources_base(self.settings.resources_base_url.as_deref())
            .with_batch_size(self.settings.asset_batch_size);
        report.merge(
            planner
                .download(&index, downloader, &self.resource_progress)
                .await?,
        );

        if index.needs_materializing() {
            let index_id = version.asset_index_id().unwrap_or("legacy");
            let target = if index.map_to_resources {
                profile_dir.join("resources")
            } else {
                self.layout.virtual_assets_dir(index_id)
            };
            materialize_virtual(&index, &planner, &target).await?;
        }
        Ok(report)
    }

    async fn run_processors(
        &self,
        request: &InstallRequest,
        profile: &LoaderProfile,
        plan: &LibraryPlan,
        profile_dir: &Path,
    ) -> LauncherResult<usize> {
        let resolver = PathResolver::new(&self.layout.libraries_dir);
        let env = PlaceholderEnv {
            side: CLIENT_SIDE.to_string(),
            minecraft_version: request.version.id.clone(),
            minecraft_jar: plan.client.dest.clone(),
            root: profile_dir.to_path_buf(),
            library_dir: self.layout.libraries_dir.clone(),
            installer: request.installer_archive.clone(),
            installer_data_dir: profile_dir.join(INSTALLER_DATA_DIR),
        };
        let table = PlaceholderTable::build(&env, &profile.data, &resolver)?;

        let mut runner = ProcessorRunner::new(
            self.services.java.as_ref(),
            self.services.launcher.as_ref(),
            resolver,
            profile_dir,
        )
        .with_cancel_flag(self.services.downloader.cancel_flag().clone());
        let report = runner
            .run(
                &profile.processors,
                &table,
                request.version.required_java_major(),
                &self.processor_progress,
            )
            .await?;
        Ok(report.executed)
    }
}

/// Remove a partially populated installation root. Missing roots are fine.
pub async fn cleanup_installation(profile_dir: &Path) -> LauncherResult<()> {
    match tokio::fs::remove_dir_all(profile_dir).await {
        Ok(()) => {
            info!("Removed installation directory {:?}", profile_dir);
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(LauncherError::io(profile_dir, e)),
    }
}
