use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::core::error::{LauncherError, LauncherResult};

const NATIVE_EXTENSIONS: [&str; 4] = [".dll", ".so", ".dylib", ".jnilib"];

fn is_native(name: &str) -> bool {
    NATIVE_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Unpack native libraries from `jars` into `dest_dir`.
///
/// The result is flat: entries are written under their file name only, so
/// nothing can escape `dest_dir`. `META-INF/` is skipped. Returns the number
/// of files written.
pub async fn extract_natives(jars: &[PathBuf], dest_dir: &Path) -> LauncherResult<usize> {
    tokio::fs::create_dir_all(dest_dir)
        .await
        .map_err(|e| LauncherError::io(dest_dir, e))?;

    let jars = jars.to_vec();
    let dest = dest_dir.to_path_buf();
    let extracted = tokio::task::spawn_blocking(move || -> LauncherResult<usize> {
        let mut total = 0;
        for jar in &jars {
            total += extract_one(jar, &dest)?;
        }
        Ok(total)
    })
    .await
    .map_err(|e| LauncherError::io(dest_dir, std::io::Error::other(e)))??;

    info!("Extracted {} native files into {:?}", extracted, dest_dir);
    Ok(extracted)
}

fn extract_one(jar: &Path, dest_dir: &Path) -> LauncherResult<usize> {
    let file = File::open(jar).map_err(|e| LauncherError::io(jar, e))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut written = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let Some(inner) = entry.enclosed_name() else {
            warn!("Skipping unsafe entry {} in {:?}", entry.name(), jar);
            continue;
        };
        if inner.starts_with("META-INF") {
            continue;
        }
        let Some(file_name) = inner.file_name().map(|n| n.to_os_string()) else {
            continue;
        };
        if !is_native(&file_name.to_string_lossy()) {
            continue;
        }

        let target = dest_dir.join(&file_name);
        let mut out = File::create(&target).map_err(|e| LauncherError::io(&target, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| LauncherError::io(&target, e))?;
        debug!("Extracted native: {:?}", file_name);
        written += 1;
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, body) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body).unwrap();
        }
        zip.finish().unwrap();
    }

    #[tokio::test]
    async fn extracts_flat_and_skips_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("natives.jar");
        write_jar(
            &jar,
            &[
                ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n"),
                ("META-INF/libsigned.so", b"sig"),
                ("linux/x64/org/lwjgl/liblwjgl.so", b"elf"),
                ("libopenal.so", b"elf2"),
                ("readme.txt", b"text"),
            ],
        );
        let out = dir.path().join("out");

        let count = extract_natives(&[jar], &out).await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(std::fs::read(out.join("liblwjgl.so")).unwrap(), b"elf");
        assert!(out.join("libopenal.so").exists());
        assert!(!out.join("libsigned.so").exists());
        assert!(!out.join("readme.txt").exists());
    }

    #[tokio::test]
    async fn traversal_entries_never_escape() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("evil.jar");
        write_jar(&jar, &[("../../escape.so", b"x")]);
        let out = dir.path().join("nested/out");

        extract_natives(&[jar], &out).await.unwrap();

        assert!(!dir.path().join("escape.so").exists());
        assert!(!dir.path().join("nested/escape.so").exists());
    }

    #[tokio::test]
    async fn unreadable_jar_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("not-a-zip.jar");
        std::fs::write(&jar, b"plain text").unwrap();

        let err = extract_natives(&[jar], &dir.path().join("out")).await.unwrap_err();
        assert!(matches!(err, LauncherError::Zip(_)));
    }
}
