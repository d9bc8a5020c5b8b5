use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, info};

use super::runtime::{is_java_compatible_major, java_exe, locate_java_binary, probe_java};
use crate::core::error::{LauncherError, LauncherResult};

/// Supplies a Java executable for a required major version.
///
/// How the binary is obtained (found locally, downloaded) is up to the
/// implementation; callers only see the final path.
#[async_trait]
pub trait JavaResolver: Send + Sync {
    async fn resolve(&self, required_major: u32) -> LauncherResult<PathBuf>;
}

/// Looks for a compatible Java in managed runtimes, `JAVA_HOME`, then `PATH`.
#[derive(Debug, Clone)]
pub struct LocalJavaResolver {
    runtimes_dir: PathBuf,
}

impl LocalJavaResolver {
    pub fn new(runtimes_dir: impl Into<PathBuf>) -> Self {
        Self {
            runtimes_dir: runtimes_dir.into(),
        }
    }

    fn candidates(&self) -> Vec<PathBuf> {
        let mut out = Vec::new();

        if let Ok(entries) = std::fs::read_dir(&self.runtimes_dir) {
            let mut roots: Vec<PathBuf> = entries
                .filter_map(Result::ok)
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect();
            roots.sort();
            // Newest-looking directory names first.
            roots.reverse();
            out.extend(roots.iter().filter_map(|root| locate_java_binary(root)));
        }

        if let Some(home) = std::env::var_os("JAVA_HOME") {
            out.extend(locate_java_binary(&PathBuf::from(home)));
        }

        if let Some(path) = std::env::var_os("PATH") {
            out.extend(
                std::env::split_paths(&path)
                    .map(|dir| dir.join(java_exe()))
                    .filter(|p| p.is_file()),
            );
        }

        out.dedup();
        out
    }
}

#[async_trait]
impl JavaResolver for LocalJavaResolver {
    async fn resolve(&self, required_major: u32) -> LauncherResult<PathBuf> {
        for candidate in self.candidates() {
            let Some(install) = probe_java(&candidate).await else {
                debug!("Not a usable Java: {:?}", candidate);
                continue;
            };
            if is_java_compatible_major(install.major, required_major) {
                info!(
                    "Using Java {} at {:?} (need {})",
                    install.version, install.path, required_major
                );
                return Ok(install.path);
            }
            debug!(
                "Java {} at {:?} does not satisfy {}",
                install.version, install.path, required_major
            );
        }
        Err(LauncherError::JavaNotFound(required_major))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unusable_candidates_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("jre-broken/bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join(java_exe()), b"not a program").unwrap();

        let resolver = LocalJavaResolver::new(dir.path());
        assert!(resolver.candidates().contains(&bin.join(java_exe())));

        // Major 999 can never be satisfied, whatever the host has installed.
        let err = resolver.resolve(999).await.unwrap_err();
        assert!(matches!(err, LauncherError::JavaNotFound(999)));
    }
}
