// ─── Placeholder Table ───
// `{KEY}` substitution for processor arguments and outputs.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::profile::DataValue;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::{MavenArtifact, PathResolver};

pub const CLIENT_SIDE: &str = "client";

/// Facts about the installation every processor may refer to.
#[derive(Debug, Clone)]
pub struct PlaceholderEnv {
    pub side: String,
    pub minecraft_version: String,
    pub minecraft_jar: PathBuf,
    pub root: PathBuf,
    pub library_dir: PathBuf,
    /// Loader installer archive, when the profile came from one.
    pub installer: Option<PathBuf>,
    /// Where installer-embedded data files are unpacked.
    pub installer_data_dir: PathBuf,
}

/// Resolved placeholder values. Built once; read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderTable {
    values: HashMap<String, String>,
    resolver: Option<PathResolver>,
}

impl PlaceholderTable {
    /// Seed with the built-in keys, then overlay the profile's `data` map.
    pub fn build(
        env: &PlaceholderEnv,
        data: &HashMap<String, DataValue>,
        resolver: &PathResolver,
    ) -> LauncherResult<Self> {
        let mut values = HashMap::new();
        values.insert("SIDE".to_string(), env.side.clone());
        values.insert(
            "MINECRAFT_VERSION".to_string(),
            env.minecraft_version.clone(),
        );
        values.insert("MINECRAFT_JAR".to_string(), path_string(&env.minecraft_jar));
        values.insert("ROOT".to_string(), path_string(&env.root));
        values.insert("LIBRARY_DIR".to_string(), path_string(&env.library_dir));
        if let Some(installer) = &env.installer {
            values.insert("INSTALLER".to_string(), path_string(installer));
        }

        let mut keys: Vec<&String> = data.keys().collect();
        keys.sort();
        for key in keys {
            let Some(raw) = data[key].for_side(&env.side) else {
                continue;
            };
            let resolved = resolve_data_value(raw, env, resolver)?;
            debug!("Placeholder {} = {}", key, resolved);
            values.insert(key.clone(), resolved);
        }

        Ok(Self {
            values,
            resolver: Some(resolver.clone()),
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Replace every `{KEY}` in `arg`. Unknown keys stay as written. An
    /// argument that is a whole `[coordinate]` becomes its library path, and
    /// a `'quoted'` one loses its quotes.
    pub fn substitute(&self, arg: &str) -> String {
        let replaced = self.replace_tokens(arg);

        if let Some(inner) = bracketed(&replaced) {
            if let Some(resolver) = &self.resolver {
                if MavenArtifact::looks_like_coordinate(inner) {
                    return path_string(&resolver.resolve(inner));
                }
            }
            return inner.to_string();
        }
        unquote(&replaced).to_string()
    }

    fn replace_tokens(&self, arg: &str) -> String {
        let mut out = String::with_capacity(arg.len());
        let mut rest = arg;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                out.push_str(&rest[open..]);
                return out;
            };
            let key = &after[..close];
            match self.values.get(key) {
                Some(value) => out.push_str(value),
                None => {
                    warn!("Unknown placeholder {{{}}} left as-is", key);
                    out.push('{');
                    out.push_str(key);
                    out.push('}');
                }
            }
            rest = &after[close + 1..];
        }
        out.push_str(rest);
        out
    }
}

fn resolve_data_value(
    raw: &str,
    env: &PlaceholderEnv,
    resolver: &PathResolver,
) -> LauncherResult<String> {
    let raw = raw.trim();

    if let Some(inner) = bracketed(raw) {
        return Ok(if MavenArtifact::looks_like_coordinate(inner) {
            path_string(&resolver.resolve(inner))
        } else {
            inner.to_string()
        });
    }

    if raw.starts_with('\'') && raw.ends_with('\'') && raw.len() >= 2 {
        return Ok(unquote(raw).to_string());
    }

    if raw.starts_with('/') {
        if let Some(installer) = &env.installer {
            let extracted = extract_installer_entry(installer, raw, &env.installer_data_dir)?;
            return Ok(path_string(&extracted));
        }
    }

    if MavenArtifact::looks_like_coordinate(raw) {
        return Ok(path_string(&resolver.resolve(raw)));
    }

    Ok(raw.to_string())
}

/// Unpack one file from the installer archive, once per installation.
fn extract_installer_entry(installer: &Path, entry: &str, dest_root: &Path) -> LauncherResult<PathBuf> {
    let relative = entry.trim_start_matches('/');
    let target = dest_root.join(relative);
    if target.is_file() {
        return Ok(target);
    }

    let file = File::open(installer).map_err(|e| LauncherError::io(installer, e))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut source = archive.by_name(relative).map_err(|_| {
        LauncherError::MissingResource(format!("{} in {}", entry, installer.display()))
    })?;
    if source.enclosed_name().is_none() {
        return Err(LauncherError::InvalidManifest(format!(
            "installer entry escapes its directory: {}",
            entry
        )));
    }

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
    }
    let mut out = File::create(&target).map_err(|e| LauncherError::io(&target, e))?;
    std::io::copy(&mut source, &mut out).map_err(|e| LauncherError::io(&target, e))?;
    debug!("Extracted installer data {} -> {:?}", entry, target);
    Ok(target)
}

fn bracketed(value: &str) -> Option<&str> {
    value.strip_prefix('[').and_then(|s| s.strip_suffix(']'))
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(value)
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
