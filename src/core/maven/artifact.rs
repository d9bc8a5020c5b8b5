use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::error::{LauncherError, LauncherResult};

/// Represents a fully parsed Maven coordinate.
///
/// Supported formats:
///   `groupId:artifactId:version`
///   `groupId:artifactId:version:classifier`
///   `groupId:artifactId:packaging:classifier:version`
///   any of the above with an `@extension` suffix
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MavenArtifact {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    /// File extension / packaging type. Defaults to `"jar"`.
    pub packaging: String,
}

impl MavenArtifact {
    /// Parse a Maven coordinate string.
    ///
    /// # Examples
    /// ```
    /// # use gamesync_lib::core::maven::MavenArtifact;
    /// let a = MavenArtifact::parse("net.sf.jopt-simple:jopt-simple:5.0.4").unwrap();
    /// assert_eq!(a.group_id, "net.sf.jopt-simple");
    /// ```
    pub fn parse(coord: &str) -> LauncherResult<Self> {
        let coord = coord.trim();

        // Split off @extension first; a classifier segment like
        // `mappings@txt` loses its suffix here too.
        let (coord_part, extension_override) = match coord.rfind('@') {
            Some(idx) => (&coord[..idx], Some(&coord[idx + 1..])),
            None => (coord, None),
        };
        let extension_override = extension_override.filter(|ext| !ext.is_empty());

        let parts: Vec<&str> = coord_part.split(':').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(LauncherError::InvalidMavenCoordinate(coord.to_string()));
        }

        let (version, classifier, packaging) = match parts.len() {
            3 => (parts[2], None, None),
            4 => (parts[2], Some(parts[3]), None),
            // packaging and classifier precede the version in the long form
            5 => (parts[4], Some(parts[3]), Some(parts[2])),
            _ => return Err(LauncherError::InvalidMavenCoordinate(coord.to_string())),
        };

        Ok(Self {
            group_id: parts[0].to_string(),
            artifact_id: parts[1].to_string(),
            version: version.to_string(),
            classifier: classifier.map(str::to_string),
            packaging: extension_override
                .or(packaging)
                .unwrap_or("jar")
                .to_string(),
        })
    }

    /// Construct the group path portion (`net/sf/jopt-simple`).
    pub fn group_path(&self) -> String {
        self.group_id.replace('.', "/")
    }

    /// Build the artifact filename.
    ///
    /// `artifactId-version[-classifier].packaging`
    pub fn filename(&self) -> String {
        match &self.classifier {
            Some(c) => format!(
                "{}-{}-{}.{}",
                self.artifact_id, self.version, c, self.packaging
            ),
            None => format!("{}-{}.{}", self.artifact_id, self.version, self.packaging),
        }
    }

    /// Repository-relative path with `/` separators on every platform.
    pub fn relative_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.group_path(),
            self.artifact_id,
            self.version,
            self.filename()
        )
    }

    /// Construct the full URL for this artifact under the given repository base.
    ///
    /// Template:
    /// `<repo>/<group_path>/<artifact_id>/<version>/<filename>`
    pub fn url(&self, repo_base: &str) -> String {
        format!(
            "{}/{}",
            repo_base.trim_end_matches('/'),
            self.relative_path()
        )
    }

    /// Heuristic used when a free-form string may or may not be a coordinate.
    pub fn looks_like_coordinate(raw: &str) -> bool {
        let raw = raw.trim();
        if raw.is_empty()
            || raw.contains(char::is_whitespace)
            || raw.contains('/')
            || raw.contains('\\')
        {
            return false;
        }
        Self::parse(raw).is_ok()
    }
}

impl fmt::Display for MavenArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.classifier {
            Some(c) => write!(
                f,
                "{}:{}:{}:{}@{}",
                self.group_id, self.artifact_id, self.version, c, self.packaging
            ),
            None => write!(
                f,
                "{}:{}:{}@{}",
                self.group_id, self.artifact_id, self.version, self.packaging
            ),
        }
    }
}

/// Relative filesystem path for a coordinate, or `None` when it has fewer
/// than three segments. Callers fall back to the raw string.
pub fn coordinate_to_relative_path(coord: &str) -> Option<String> {
    MavenArtifact::parse(coord).ok().map(|a| a.relative_path())
}

/// Remote URL for a coordinate under `base_url`. Unparseable coordinates are
/// appended verbatim.
pub fn coordinate_to_url(coord: &str, base_url: &str) -> String {
    match MavenArtifact::parse(coord) {
        Ok(artifact) => artifact.url(base_url),
        Err(_) => format!("{}/{}", base_url.trim_end_matches('/'), coord.trim()),
    }
}
