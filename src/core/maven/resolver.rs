use std::path::{Path, PathBuf};

use tracing::warn;

use super::artifact::coordinate_to_relative_path;

/// Maps coordinates onto a local Maven-layout library root.
///
/// Never fails: a string that does not parse as a coordinate is joined onto
/// the root verbatim, which keeps odd loader entries usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    libraries_dir: PathBuf,
}

impl PathResolver {
    pub fn new(libraries_dir: impl Into<PathBuf>) -> Self {
        Self {
            libraries_dir: libraries_dir.into(),
        }
    }

    pub fn libraries_dir(&self) -> &Path {
        &self.libraries_dir
    }

    /// Absolute path for a coordinate.
    pub fn resolve(&self, coord: &str) -> PathBuf {
        match coordinate_to_relative_path(coord) {
            Some(rel) => self.libraries_dir.join(rel),
            None => {
                warn!("Not a coordinate, using it as a path: {}", coord);
                self.libraries_dir.join(coord.trim())
            }
        }
    }

    /// A declared artifact path: absolute paths are kept, relative ones are
    /// placed under the library root.
    pub fn declared(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.libraries_dir.join(candidate)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_coordinates_under_root() {
        let resolver = PathResolver::new("/libs");
        assert_eq!(
            resolver.resolve("com.google.guava:guava:31.1-jre"),
            PathBuf::from("/libs/com/google/guava/guava/31.1-jre/guava-31.1-jre.jar")
        );
    }

    #[test]
    fn falls_back_to_raw_string() {
        let resolver = PathResolver::new("/libs");
        assert_eq!(resolver.resolve("broken:coord"), PathBuf::from("/libs/broken:coord"));
    }

    #[test]
    fn declared_paths_respect_absolute() {
        let resolver = PathResolver::new("/libs");
        assert_eq!(resolver.declared("a/b.jar"), PathBuf::from("/libs/a/b.jar"));
        let abs = std::env::temp_dir().join("x.jar");
        assert_eq!(resolver.declared(abs.to_str().unwrap()), abs);
    }
}
