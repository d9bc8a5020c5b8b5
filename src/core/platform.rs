// ─── Platform ───
// Describes the machine an installation targets, in manifest vocabulary.

use std::fmt;

/// Operating system family as spelled by version manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsFamily {
    Windows,
    Osx,
    Linux,
}

impl OsFamily {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            OsFamily::Windows
        } else if cfg!(target_os = "macos") {
            OsFamily::Osx
        } else {
            OsFamily::Linux
        }
    }

    /// Canonical manifest name (`windows`, `osx`, `linux`).
    pub fn as_str(self) -> &'static str {
        match self {
            OsFamily::Windows => "windows",
            OsFamily::Osx => "osx",
            OsFamily::Linux => "linux",
        }
    }

    /// Recognise an OS identifier, including arch-tagged forms like
    /// `osx-arm64` or `windows-x86`. Unknown names yield `None`.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        let family = identifier
            .split('-')
            .next()
            .unwrap_or(identifier)
            .to_ascii_lowercase();
        match family.as_str() {
            "windows" => Some(OsFamily::Windows),
            "osx" | "macos" | "mac" => Some(OsFamily::Osx),
            "linux" => Some(OsFamily::Linux),
            _ => None,
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OS + architecture pair used for rule evaluation and native selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformInfo {
    pub os: OsFamily,
    /// Manifest-style architecture (`x86_64`, `arm64`, `x86`).
    pub arch: String,
}

impl PlatformInfo {
    pub fn new(os: OsFamily, arch: impl Into<String>) -> Self {
        Self {
            os,
            arch: arch.into(),
        }
    }

    pub fn current() -> Self {
        let arch = match std::env::consts::ARCH {
            "aarch64" => "arm64",
            "x86" => "x86",
            other => other,
        };
        Self::new(OsFamily::current(), arch)
    }

    /// Value substituted for `${arch}` in legacy native classifiers.
    pub fn arch_bits(&self) -> &'static str {
        match self.arch.as_str() {
            "x86" | "arm32" => "32",
            _ => "64",
        }
    }

    /// Ordered platform identifiers, most specific first.
    ///
    /// Modern manifests tag non-x86_64 natives with the architecture
    /// (`osx-arm64`, `windows-arm64`); manifests older than 1.19 only know
    /// the bare OS name.
    pub fn identifiers(&self, game_version: Option<&str>) -> Vec<String> {
        let os = self.os.as_str();
        let low = game_version.is_some_and(is_low_version);
        let mut out = Vec::with_capacity(3);

        if !low {
            out.push(format!("{}-{}", os, self.arch));
            if self.os == OsFamily::Osx {
                out.push(format!("macos-{}", self.arch));
            }
        }
        out.push(os.to_string());
        if self.os == OsFamily::Osx && !low {
            out.push("macos".to_string());
        }
        out
    }
}

/// `true` for game versions older than 1.19 (major < 1, or 1.x with x < 19).
///
/// Unparseable ids (snapshots, custom names) are treated as modern.
pub fn is_low_version(game_version: &str) -> bool {
    let mut parts = game_version.split('.');
    let Some(major) = parts.next().and_then(|p| p.trim().parse::<u32>().ok()) else {
        return false;
    };
    if major < 1 {
        return true;
    }
    if major > 1 {
        return false;
    }
    let minor = parts
        .next()
        .map(|p| {
            p.chars()
                .take_while(char::is_ascii_digit)
                .collect::<String>()
        })
        .and_then(|digits| digits.parse::<u32>().ok());
    matches!(minor, Some(minor) if minor < 19)
}
