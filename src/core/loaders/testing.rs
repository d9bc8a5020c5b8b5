// Recording stand-ins for Java resolution and subprocesses.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use zip::write::SimpleFileOptions;

use crate::core::error::LauncherResult;
use crate::core::java::JavaResolver;
use crate::core::launch::{ProcessLauncher, ProcessOutput, ProcessRequest};

/// Always answers with the same binary and counts how often it was asked.
pub struct FixedJava {
    path: PathBuf,
    calls: AtomicUsize,
}

impl FixedJava {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JavaResolver for FixedJava {
    async fn resolve(&self, _required_major: u32) -> LauncherResult<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.path.clone())
    }
}

/// Records every request; exits 0 unless an argument matches `fail_on`.
#[derive(Default)]
pub struct RecordingLauncher {
    requests: Mutex<Vec<ProcessRequest>>,
    failures: Vec<(String, i32)>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(mut self, arg: &str, code: i32) -> Self {
        self.failures.push((arg.to_string(), code));
        self
    }

    pub fn requests(&self) -> Vec<ProcessRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessLauncher for RecordingLauncher {
    async fn run(&self, request: &ProcessRequest) -> LauncherResult<ProcessOutput> {
        self.requests.lock().unwrap().push(request.clone());
        let code = self
            .failures
            .iter()
            .find(|(arg, _)| request.args.iter().any(|a| a == arg))
            .map_or(0, |(_, code)| *code);
        Ok(ProcessOutput {
            code: Some(code),
            stdout: String::new(),
            stderr: if code == 0 { String::new() } else { "boom".into() },
        })
    }
}

pub fn write_jar_with_manifest(path: &Path, manifest: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    zip.start_file("META-INF/MANIFEST.MF", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(manifest.as_bytes()).unwrap();
    zip.finish().unwrap();
}

pub fn write_processor_jar(path: &Path, main_class: &str) {
    write_jar_with_manifest(
        path,
        &format!("Manifest-Version: 1.0\nMain-Class: {main_class}\n"),
    );
}
