pub mod rules;
pub mod version_file;

pub use rules::{is_allowed, PlatformRule, RuleEvaluator};
pub use version_file::{
    AssetIndexInfo, DownloadArtifact, LibDownloadArtifact, LibraryDownloads, LibraryEntry,
    LibraryRule, LoggingConfig, OsRule, RuleAction, VersionDownloads, VersionJson,
};
