// ─── Content Verifier ───
// Streaming SHA-1 of files on disk.

use std::io::Read;
use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};

use crate::core::error::{LauncherError, LauncherResult};

const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Hash a file in fixed-size chunks, off the async executor.
pub async fn sha1_file(path: &Path) -> LauncherResult<String> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || sha1_file_sync(&path))
        .await
        .map_err(|e| LauncherError::io(PathBuf::new(), std::io::Error::other(e)))?
}

pub fn sha1_file_sync(path: &Path) -> LauncherResult<String> {
    let mut file = std::fs::File::open(path).map_err(|e| LauncherError::io(path, e))?;
    let mut hasher = Sha1::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];
    loop {
        let read = file.read(&mut buffer).map_err(|e| LauncherError::io(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Compare two hex digests, ignoring case and surrounding whitespace.
pub fn digests_match(actual: &str, expected: &str) -> bool {
    actual.trim().eq_ignore_ascii_case(expected.trim())
}

/// `true` when `path` exists and hashes to `expected`.
///
/// An empty `expected` means no verification was requested and always passes
/// for an existing file.
pub async fn verify_sha1(path: &Path, expected: &str) -> LauncherResult<bool> {
    if !tokio::fs::try_exists(path)
        .await
        .map_err(|e| LauncherError::io(path, e))?
    {
        return Ok(false);
    }
    if expected.trim().is_empty() {
        return Ok(true);
    }
    let actual = sha1_file(path).await?;
    Ok(digests_match(&actual, expected))
}
