use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

/// Platform-specific Java classpath separator.
pub fn get_classpath_separator() -> &'static str {
    if cfg!(target_os = "windows") {
        ";"
    } else {
        ":"
    }
}

/// One external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRequest {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs a program to completion. Failing to start is an error; a non-zero
/// exit is reported through [`ProcessOutput::code`].
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    async fn run(&self, request: &ProcessRequest) -> LauncherResult<ProcessOutput>;
}

/// Launcher backed by `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessLauncher;

#[async_trait]
impl ProcessLauncher for TokioProcessLauncher {
    async fn run(&self, request: &ProcessRequest) -> LauncherResult<ProcessOutput> {
        let mut cmd = tokio::process::Command::new(&request.program);
        cmd.args(&request.args)
            .current_dir(&request.working_dir)
            .kill_on_drop(true);

        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        debug!("Command: {:?}", cmd);
        let output = cmd
            .output()
            .await
            .map_err(|e| LauncherError::JavaExecution(format!("{:?}: {}", request.program, e)))?;

        Ok(ProcessOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_exit_code_and_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = TokioProcessLauncher
            .run(&ProcessRequest {
                program: PathBuf::from("sh"),
                args: vec!["-c".into(), "echo out; echo err >&2; exit 3".into()],
                working_dir: dir.path().to_path_buf(),
            })
            .await
            .unwrap();

        assert_eq!(output.code, Some(3));
        assert!(!output.success());
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = TokioProcessLauncher
            .run(&ProcessRequest {
                program: dir.path().join("definitely-not-here"),
                args: vec![],
                working_dir: dir.path().to_path_buf(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::JavaExecution(_)));
    }
}
