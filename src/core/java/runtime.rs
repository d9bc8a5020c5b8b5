use std::path::{Path, PathBuf};

use tracing::debug;

/// Information about a probed Java binary.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct JavaInstallation {
    pub path: PathBuf,
    pub version: String,
    pub major: u32,
}

fn runtime_track(required_major: u32) -> u32 {
    if required_major <= 8 {
        8
    } else if required_major >= 21 {
        21
    } else {
        17
    }
}

/// Best guess at the Java major a game version needs when its manifest does
/// not say.
pub fn required_java_for_minecraft_version(minecraft_version: &str) -> u32 {
    let lower = minecraft_version.to_ascii_lowercase();
    if let Some(week_pos) = lower.find('w') {
        let mut year_suffix: Vec<char> = lower[..week_pos].chars().rev().take(2).collect();
        year_suffix.reverse();
        if year_suffix.len() == 2 {
            let year_suffix: String = year_suffix.into_iter().collect();
            if let Ok(snapshot_year) = year_suffix.parse::<u32>() {
                if snapshot_year >= 24 {
                    return 21;
                }
                return 17;
            }
        }
    }

    let mut parts = minecraft_version.split('.');
    let major = parts
        .next()
        .and_then(|p| p.parse::<u32>().ok())
        .unwrap_or(1);
    let minor = parts
        .next()
        .and_then(|p| p.parse::<u32>().ok())
        .unwrap_or(20);
    let patch = parts
        .next()
        .and_then(|p| p.parse::<u32>().ok())
        .unwrap_or(0);

    if major > 1 || minor >= 21 || (minor == 20 && patch >= 5) {
        21
    } else if minor >= 17 {
        17
    } else {
        8
    }
}

/// Same release track and at least the required major.
pub fn is_java_compatible_major(installed_major: u32, required_major: u32) -> bool {
    installed_major >= required_major
        && runtime_track(installed_major) == runtime_track(required_major)
}

pub(crate) fn parse_major_version(version: &str) -> u32 {
    let first_part = version.split('.').next().unwrap_or("0");
    let major: u32 = first_part.parse().unwrap_or(0);

    if major == 1 {
        version
            .split('.')
            .nth(1)
            .and_then(|s| s.parse().ok())
            .unwrap_or(major)
    } else {
        major
    }
}

/// First double-quoted token of `java -version` output.
pub(crate) fn parse_version_string(output: &str) -> Option<String> {
    for line in output.lines() {
        if let Some(start) = line.find('"') {
            if let Some(end) = line[start + 1..].find('"') {
                return Some(line[start + 1..start + 1 + end].to_string());
            }
        }
    }
    None
}

pub(crate) fn java_exe() -> &'static str {
    if cfg!(windows) {
        "java.exe"
    } else {
        "java"
    }
}

/// The java binary inside an unpacked runtime, including the macOS bundle
/// layout.
pub(crate) fn locate_java_binary(runtime_root: &Path) -> Option<PathBuf> {
    let primary = runtime_root.join("bin").join(java_exe());
    if primary.is_file() {
        return Some(primary);
    }

    let mac_layout = runtime_root
        .join("Contents")
        .join("Home")
        .join("bin")
        .join(java_exe());
    if mac_layout.is_file() {
        return Some(mac_layout);
    }
    None
}

/// Run `java -version` and parse what it reports.
pub async fn probe_java(path: &Path) -> Option<JavaInstallation> {
    let output = tokio::process::Command::new(path)
        .arg("-version")
        .output()
        .await
        .ok()?;

    let version_output = format!(
        "{}\n{}",
        String::from_utf8_lossy(&output.stderr),
        String::from_utf8_lossy(&output.stdout)
    );
    debug!(
        "Probing {:?}: {}",
        path,
        version_output.lines().next().unwrap_or("")
    );

    let version = parse_version_string(&version_output)?;
    Some(JavaInstallation {
        path: path.to_path_buf(),
        major: parse_major_version(&version),
        version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_major_modern() {
        assert_eq!(parse_major_version("17.0.8"), 17);
        assert_eq!(parse_major_version("21.0.1"), 21);
    }

    #[test]
    fn test_parse_major_legacy() {
        assert_eq!(parse_major_version("1.8.0_392"), 8);
    }

    #[test]
    fn parses_version_banner() {
        let banner = "openjdk version \"17.0.9\" 2023-10-17\nOpenJDK Runtime Environment";
        assert_eq!(parse_version_string(banner).as_deref(), Some("17.0.9"));
        assert_eq!(parse_version_string("no quotes here"), None);
    }

    #[test]
    fn java_required_by_minecraft_version() {
        assert_eq!(required_java_for_minecraft_version("1.16.5"), 8);
        assert_eq!(required_java_for_minecraft_version("1.20.4"), 17);
        assert_eq!(required_java_for_minecraft_version("1.20.5"), 21);
        assert_eq!(required_java_for_minecraft_version("24w14a"), 21);
    }

    #[test]
    fn non_ascii_version_ids_fall_back_to_release_rules() {
        assert_eq!(required_java_for_minecraft_version("Café w"), 17);
        assert_eq!(required_java_for_minecraft_version("é23w01a"), 17);
        assert_eq!(required_java_for_minecraft_version("éw"), 17);
    }

    #[test]
    fn java_runtime_track_mapping() {
        assert!(is_java_compatible_major(17, 17));
        assert!(is_java_compatible_major(18, 17));
        assert!(!is_java_compatible_major(21, 17));
        assert!(!is_java_compatible_major(8, 17));
    }

    #[test]
    fn locates_binary_in_runtime_layouts() {
        let dir = tempfile::tempdir().unwrap();
        assert!(locate_java_binary(dir.path()).is_none());

        let bin = dir.path().join("Contents/Home/bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join(java_exe()), b"").unwrap();
        assert_eq!(locate_java_binary(dir.path()), Some(bin.join(java_exe())));
    }
}
