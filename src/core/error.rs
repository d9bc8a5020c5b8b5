use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the whole installation engine.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Download of {name} failed after {attempts} attempts: {reason}")]
    RetriesExhausted {
        name: String,
        attempts: u32,
        reason: String,
    },

    // ── Integrity ───────────────────────────────────────
    #[error("SHA-1 mismatch for {path:?}: expected {expected}, got {actual}")]
    Sha1Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    // ── Manifest / coordinates ──────────────────────────
    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Java ────────────────────────────────────────────
    #[error("Java not found for major version {0}")]
    JavaNotFound(u32),

    #[error("Java execution failed: {0}")]
    JavaExecution(String),

    // ── Loader ──────────────────────────────────────────
    #[error("Processor {name} failed: {reason}")]
    ProcessorFailed { name: String, reason: String },

    #[error("Missing resource: {0}")]
    MissingResource(String),

    // ── Archive ─────────────────────────────────────────
    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Control flow ────────────────────────────────────
    #[error("Installation cancelled")]
    Cancelled,
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

/// Coarse failure category shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Download,
    Validation,
    FileSystem,
    Resource,
    Cancelled,
}

impl ErrorKind {
    /// Human-readable category name.
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Download => "Download error",
            ErrorKind::Validation => "Validation error",
            ErrorKind::FileSystem => "File system error",
            ErrorKind::Resource => "Resource error",
            ErrorKind::Cancelled => "Cancelled",
        }
    }
}

impl LauncherError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LauncherError::Http(_)
            | LauncherError::DownloadFailed { .. }
            | LauncherError::RetriesExhausted { .. }
            | LauncherError::Sha1Mismatch { .. }
            | LauncherError::JavaExecution(_)
            | LauncherError::ProcessorFailed { .. } => ErrorKind::Download,
            LauncherError::InvalidMavenCoordinate(_)
            | LauncherError::InvalidManifest(_)
            | LauncherError::Json(_)
            | LauncherError::Zip(_) => ErrorKind::Validation,
            LauncherError::Io { .. } => ErrorKind::FileSystem,
            LauncherError::JavaNotFound(_) | LauncherError::MissingResource(_) => {
                ErrorKind::Resource
            }
            LauncherError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Stable lookup key for the presentation layer's string tables.
    pub fn localization_key(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Download => "error.download",
            ErrorKind::Validation => "error.validation",
            ErrorKind::FileSystem => "error.filesystem",
            ErrorKind::Resource => "error.resource",
            ErrorKind::Cancelled => "error.cancelled",
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

// Errors cross the UI boundary as their display string.
impl serde::Serialize for LauncherError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
