// ─── Processor Runner ───
// Sequential execution of loader post-install processors.

use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::placeholders::PlaceholderTable;
use super::profile::Processor;
use crate::core::downloader::verify::verify_sha1;
use crate::core::downloader::{CancelFlag, ProgressTracker};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::java::JavaResolver;
use crate::core::launch::{get_classpath_separator, ProcessLauncher, ProcessRequest};
use crate::core::maven::PathResolver;

/// Where the runner is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorStage {
    NotStarted,
    Filtering,
    /// Zero-based index into the filtered list.
    Running(usize),
    Done,
    Failed,
}

/// Totals for one processor stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessorReport {
    pub executed: usize,
    /// Filtered out by side.
    pub skipped_side: usize,
    /// Outputs already present and verified.
    pub up_to_date: usize,
}

pub struct ProcessorRunner<'a> {
    java: &'a dyn JavaResolver,
    launcher: &'a dyn ProcessLauncher,
    resolver: PathResolver,
    working_dir: PathBuf,
    side: String,
    cancel: CancelFlag,
    stage: ProcessorStage,
}

impl<'a> ProcessorRunner<'a> {
    pub fn new(
        java: &'a dyn JavaResolver,
        launcher: &'a dyn ProcessLauncher,
        resolver: PathResolver,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            java,
            launcher,
            resolver,
            working_dir: working_dir.into(),
            side: super::placeholders::CLIENT_SIDE.to_string(),
            cancel: CancelFlag::new(),
            stage: ProcessorStage::NotStarted,
        }
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn stage(&self) -> ProcessorStage {
        self.stage
    }

    /// Run `processors` in declared order.
    ///
    /// Java is resolved once for the whole list. The first failure aborts
    /// the remaining processors.
    pub async fn run(
        &mut self,
        processors: &[Processor],
        table: &PlaceholderTable,
        java_major: u32,
        progress: &ProgressTracker,
    ) -> LauncherResult<ProcessorReport> {
        let result = self.run_inner(processors, table, java_major, progress).await;
        self.stage = match result {
            Ok(_) => ProcessorStage::Done,
            Err(_) => ProcessorStage::Failed,
        };
        result
    }

    async fn run_inner(
        &mut self,
        processors: &[Processor],
        table: &PlaceholderTable,
        java_major: u32,
        progress: &ProgressTracker,
    ) -> LauncherResult<ProcessorReport> {
        self.stage = ProcessorStage::Filtering;
        let selected: Vec<&Processor> = processors
            .iter()
            .filter(|p| p.runs_on(&self.side))
            .collect();
        let mut report = ProcessorReport {
            skipped_side: processors.len() - selected.len(),
            ..ProcessorReport::default()
        };
        if selected.is_empty() {
            info!("No processors apply to the {} side", self.side);
            return Ok(report);
        }

        progress.reset(selected.len());
        let java = self.java.resolve(java_major).await?;
        info!(
            "Running {} processors with {:?}",
            selected.len(),
            java
        );

        for (index, processor) in selected.iter().enumerate() {
            self.cancel.check()?;
            self.stage = ProcessorStage::Running(index);
            let name = processor.display_name();
            progress.starting(name, index + 1);

            if outputs_verified(processor, table).await? {
                debug!("Processor {} outputs already in place", name);
                report.up_to_date += 1;
                continue;
            }

            self.run_one(processor, table, &java).await?;
            verify_outputs(processor, table).await?;
            report.executed += 1;
        }

        Ok(report)
    }

    async fn run_one(
        &self,
        processor: &Processor,
        table: &PlaceholderTable,
        java: &Path,
    ) -> LauncherResult<()> {
        let name = processor.display_name();
        let failed = |reason: String| LauncherError::ProcessorFailed {
            name: name.to_string(),
            reason,
        };

        let jar = self.resolver.resolve(&processor.jar);
        if !jar.is_file() {
            return Err(failed(format!("missing jar {}", jar.display())));
        }
        let main_class = read_main_class_from_jar(&jar).map_err(|e| failed(e.to_string()))?;

        let classpath = std::iter::once(jar.clone())
            .chain(processor.classpath.iter().map(|c| self.resolver.resolve(c)))
            .map(|p| p.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(get_classpath_separator());

        let mut args = vec!["-cp".to_string(), classpath, main_class];
        args.extend(processor.args.iter().map(|a| table.substitute(a)));

        debug!("Processor {} args: {:?}", name, args);
        let output = self
            .launcher
            .run(&ProcessRequest {
                program: java.to_path_buf(),
                args,
                working_dir: self.working_dir.clone(),
            })
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !output.success() {
            warn!("Processor {} stderr:\n{}", name, output.stderr);
            return Err(failed(format!(
                "exit code {:?}\nSTDOUT:\n{}\nSTDERR:\n{}",
                output.code, output.stdout, output.stderr
            )));
        }
        Ok(())
    }
}

/// Outputs with their expected hashes, after substitution.
fn resolved_outputs(processor: &Processor, table: &PlaceholderTable) -> Vec<(PathBuf, String)> {
    let mut outputs: Vec<(PathBuf, String)> = processor
        .outputs
        .iter()
        .map(|(path, hash)| (PathBuf::from(table.substitute(path)), table.substitute(hash)))
        .collect();
    outputs.sort();
    outputs
}

/// `true` when the processor declares outputs and all of them verify.
async fn outputs_verified(processor: &Processor, table: &PlaceholderTable) -> LauncherResult<bool> {
    let outputs = resolved_outputs(processor, table);
    if outputs.is_empty() {
        return Ok(false);
    }
    for (path, hash) in &outputs {
        if !verify_sha1(path, hash).await? {
            return Ok(false);
        }
    }
    Ok(true)
}

async fn verify_outputs(processor: &Processor, table: &PlaceholderTable) -> LauncherResult<()> {
    for (path, hash) in resolved_outputs(processor, table) {
        if !verify_sha1(&path, &hash).await? {
            return Err(LauncherError::ProcessorFailed {
                name: processor.display_name().to_string(),
                reason: format!("output {} missing or does not match {}", path.display(), hash),
            });
        }
    }
    Ok(())
}

/// `Main-Class` from a jar's manifest, continuation lines included.
pub fn read_main_class_from_jar(path: &Path) -> LauncherResult<String> {
    let file = std::fs::File::open(path).map_err(|e| LauncherError::io(path, e))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut manifest = archive.by_name("META-INF/MANIFEST.MF").map_err(|e| {
        LauncherError::MissingResource(format!("manifest in {}: {}", path.display(), e))
    })?;

    let mut text = String::new();
    manifest
        .read_to_string(&mut text)
        .map_err(|e| LauncherError::io(path, e))?;

    let mut main_class: Option<String> = None;
    let mut current_key: Option<String> = None;
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix(' ') {
            if current_key.as_deref() == Some("Main-Class") {
                if let Some(value) = &mut main_class {
                    value.push_str(rest.trim_end());
                }
            }
            continue;
        }

        if let Some((key, value)) = line.split_once(':') {
            current_key = Some(key.trim().to_string());
            if key.trim() == "Main-Class" {
                main_class = Some(value.trim().to_string());
            }
        }
    }

    main_class.ok_or_else(|| {
        LauncherError::MissingResource(format!("Main-Class in {}", path.display()))
    })
}
