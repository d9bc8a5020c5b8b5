use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::stream::{FuturesUnordered, StreamExt};
use sha1::{Digest, Sha1};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::cancel::CancelFlag;
use super::progress::{ProgressCategory, ProgressTracker};
use super::transport::{ReqwestTransport, Transport};
use super::verify::{digests_match, verify_sha1};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::build_http_client;
use crate::core::state::InstallerSettings;

pub const DEFAULT_CONCURRENCY: usize = 8;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// A single file to download with optional SHA-1 for validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub url: String,
    pub dest: PathBuf,
    pub sha1: Option<String>,
    pub size: Option<u64>,
    pub category: ProgressCategory,
    pub display_name: String,
}

impl DownloadTask {
    pub fn new(
        url: impl Into<String>,
        dest: impl Into<PathBuf>,
        sha1: Option<String>,
        category: ProgressCategory,
    ) -> Self {
        let dest = dest.into();
        let display_name = dest
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            url: url.into(),
            dest,
            sha1: sha1.filter(|s| !s.trim().is_empty()),
            size: None,
            category,
            display_name,
        }
    }

    pub fn with_size(mut self, size: Option<u64>) -> Self {
        self.size = size;
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }
}

/// How a single download request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The destination already held valid content; no network traffic.
    AlreadyPresent,
    Downloaded { bytes: u64 },
}

/// Totals for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub downloaded: usize,
    pub skipped: usize,
    pub bytes: u64,
}

impl BatchReport {
    pub fn merge(&mut self, other: BatchReport) {
        self.downloaded += other.downloaded;
        self.skipped += other.skipped;
        self.bytes += other.bytes;
    }
}

/// Concurrent, SHA-1 validated downloader with atomic placement.
pub struct Downloader {
    transport: Arc<dyn Transport>,
    /// Maximum number of parallel downloads, read once per batch.
    concurrency: Arc<AtomicUsize>,
    retry_attempts: u32,
    retry_delay: Duration,
    cancel: CancelFlag,
    /// One lock per destination so tasks sharing a file fetch it once.
    in_flight: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl Downloader {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            concurrency: Arc::new(AtomicUsize::new(DEFAULT_CONCURRENCY)),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            cancel: CancelFlag::new(),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Downloader over a real HTTP client configured from `settings`.
    pub fn from_settings(settings: &InstallerSettings) -> LauncherResult<Self> {
        let client = build_http_client(settings)?;
        Ok(Self::new(Arc::new(ReqwestTransport::new(client)))
            .with_concurrency(settings.download_concurrency)
            .with_retry(settings.retry_attempts, settings.retry_delay()))
    }

    pub fn with_concurrency(self, n: usize) -> Self {
        self.set_concurrency(n);
        self
    }

    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts.max(1);
        self.retry_delay = delay;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Change the budget for batches started from now on.
    pub fn set_concurrency(&self, n: usize) {
        self.concurrency.store(n.max(1), Ordering::SeqCst);
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.load(Ordering::SeqCst)
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    // ── Single file download ────────────────────────────

    /// Download a single file to `dest`, optionally validating SHA-1.
    ///
    /// Existing files that verify are left untouched. New content is
    /// streamed to a sibling temp file and renamed into place only after
    /// the hash matches, so `dest` never holds a partial write. Concurrent
    /// calls for the same `dest` run one after another, so the later ones
    /// find the file in place.
    pub async fn download_file(
        &self,
        url: &str,
        dest: &Path,
        sha1_expected: Option<&str>,
    ) -> LauncherResult<DownloadOutcome> {
        let lock = self.dest_lock(dest);
        let result = {
            let _guard = lock.lock().await;
            self.download_exclusive(url, dest, sha1_expected).await
        };
        self.release_dest(dest, lock);
        result
    }

    fn dest_lock(&self, dest: &Path) -> Arc<AsyncMutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        in_flight.entry(dest.to_path_buf()).or_default().clone()
    }

    fn release_dest(&self, dest: &Path, lock: Arc<AsyncMutex<()>>) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        // Map entry plus ours: nobody else is waiting.
        if Arc::strong_count(&lock) == 2 {
            in_flight.remove(dest);
        }
    }

    async fn download_exclusive(
        &self,
        url: &str,
        dest: &Path,
        sha1_expected: Option<&str>,
    ) -> LauncherResult<DownloadOutcome> {
        let expected = sha1_expected.unwrap_or("");
        if verify_sha1(dest, expected).await? {
            debug!("Already present: {:?}", dest);
            return Ok(DownloadOutcome::AlreadyPresent);
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }

        let mut attempt = 1;
        loop {
            match self.fetch_once(url, dest, expected).await {
                Ok(bytes) => {
                    debug!("Downloaded: {} -> {:?}", url, dest);
                    return Ok(DownloadOutcome::Downloaded { bytes });
                }
                Err(e) if is_transient(&e) && attempt < self.retry_attempts => {
                    warn!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt, self.retry_attempts, url, e
                    );
                    attempt += 1;
                    if !self.retry_delay.is_zero() {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
                Err(e) if is_transient(&e) => {
                    return Err(LauncherError::RetriesExhausted {
                        name: display_name(dest, url),
                        attempts: attempt,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_once(&self, url: &str, dest: &Path, expected: &str) -> LauncherResult<u64> {
        let temp = TempFile::beside(dest);
        let mut stream = self.transport.open(url).await?;

        let mut hasher = Sha1::new();
        let mut written: u64 = 0;
        // Write inside a block so the handle is closed before the rename.
        {
            let mut file = tokio::fs::File::create(temp.path())
                .await
                .map_err(|e| LauncherError::io(temp.path(), e))?;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                hasher.update(&chunk);
                file.write_all(&chunk)
                    .await
                    .map_err(|e| LauncherError::io(temp.path(), e))?;
                written += chunk.len() as u64;
            }
            file.flush()
                .await
                .map_err(|e| LauncherError::io(temp.path(), e))?;
        }

        let actual = hex::encode(hasher.finalize());
        if !expected.trim().is_empty() && !digests_match(&actual, expected) {
            return Err(LauncherError::Sha1Mismatch {
                path: dest.to_path_buf(),
                expected: expected.to_string(),
                actual,
            });
        }

        tokio::fs::rename(temp.path(), dest)
            .await
            .map_err(|e| LauncherError::io(dest, e))?;
        temp.persisted();
        Ok(written)
    }

    /// Download one planned task, honouring cancellation first.
    pub async fn download_task(&self, task: &DownloadTask) -> LauncherResult<DownloadOutcome> {
        self.cancel.check()?;
        self.download_file(&task.url, &task.dest, task.sha1.as_deref())
            .await
    }

    // ── Batch concurrent downloads ──────────────────────

    /// Download many files with at most `concurrency` in flight.
    ///
    /// Every task is queued up front; a semaphore admits them. The first
    /// terminal failure stops admission of queued tasks, lets in-flight ones
    /// finish and is returned. `progress` ticks once per finished task,
    /// skipped-because-present included.
    pub async fn download_batch(
        &self,
        tasks: Vec<DownloadTask>,
        progress: &ProgressTracker,
    ) -> LauncherResult<BatchReport> {
        let limit = self.concurrency();
        info!(
            "Starting batch download: {} files, concurrency={}",
            tasks.len(),
            limit
        );

        let semaphore = Semaphore::new(limit);
        let failed = AtomicBool::new(false);
        let mut pending: FuturesUnordered<_> = tasks
            .into_iter()
            .map(|task| {
                let semaphore = &semaphore;
                let failed = &failed;
                async move {
                    let Ok(_permit) = semaphore.acquire().await else {
                        return (task, None);
                    };
                    if failed.load(Ordering::SeqCst) {
                        return (task, None);
                    }
                    let result = self.download_task(&task).await;
                    if result.is_err() {
                        failed.store(true, Ordering::SeqCst);
                    }
                    (task, Some(result))
                }
            })
            .collect();

        let mut report = BatchReport::default();
        let mut first_error = None;
        while let Some((task, result)) = pending.next().await {
            match result {
                None => {}
                Some(Ok(outcome)) => {
                    match outcome {
                        DownloadOutcome::AlreadyPresent => report.skipped += 1,
                        DownloadOutcome::Downloaded { bytes } => {
                            report.downloaded += 1;
                            report.bytes += bytes;
                        }
                    }
                    progress.complete(&task.display_name);
                }
                Some(Err(e)) => {
                    if !matches!(e, LauncherError::Cancelled) {
                        error!("Download of {} failed: {}", task.display_name, e);
                    }
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(
                    "Batch finished: {} downloaded, {} already present",
                    report.downloaded, report.skipped
                );
                Ok(report)
            }
        }
    }
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("concurrency", &self.concurrency())
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

/// Worth another attempt: network hiccups, server errors, corrupt bodies.
fn is_transient(err: &LauncherError) -> bool {
    match err {
        LauncherError::Http(_) | LauncherError::Sha1Mismatch { .. } => true,
        LauncherError::DownloadFailed { status, .. } => {
            *status == 0 || *status == 408 || *status == 429 || *status >= 500
        }
        _ => false,
    }
}

fn display_name(dest: &Path, url: &str) -> String {
    dest.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| url.to_string())
}

/// Sibling temp file removed on drop unless persisted.
struct TempFile {
    path: PathBuf,
    keep: bool,
}

impl TempFile {
    fn beside(dest: &Path) -> Self {
        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let path = dest.with_file_name(format!(".{}.{}.part", name, Uuid::new_v4().simple()));
        Self { path, keep: false }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn persisted(mut self) {
        self.keep = true;
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if !self.keep {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::downloader::progress::{NullProgress, ProgressUpdate};
    use crate::core::downloader::testing::{sha1_hex, MemoryTransport};
    use std::sync::Mutex;

    fn downloader(transport: Arc<MemoryTransport>) -> Downloader {
        Downloader::new(transport).with_retry(3, Duration::ZERO)
    }

    fn tracker(total: usize) -> ProgressTracker {
        ProgressTracker::new(ProgressCategory::Core, total, Arc::new(NullProgress))
    }

    #[tokio::test]
    async fn downloads_and_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MemoryTransport::new());
        transport.serve("https://x/a.jar", b"payload".to_vec());
        let dest = dir.path().join("libs/a.jar");

        let outcome = downloader(transport.clone())
            .download_file("https://x/a.jar", &dest, Some(&sha1_hex(b"payload")))
            .await
            .unwrap();

        assert_eq!(outcome, DownloadOutcome::Downloaded { bytes: 7 });
        assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn valid_existing_file_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.jar");
        std::fs::write(&dest, b"payload").unwrap();
        let transport = Arc::new(MemoryTransport::new());

        let outcome = downloader(transport.clone())
            .download_file("https://x/a.jar", &dest, Some(&sha1_hex(b"payload")))
            .await
            .unwrap();

        assert_eq!(outcome, DownloadOutcome::AlreadyPresent);
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn stale_existing_file_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.jar");
        std::fs::write(&dest, b"old").unwrap();
        let transport = Arc::new(MemoryTransport::new());
        transport.serve("https://x/a.jar", b"new".to_vec());

        downloader(transport.clone())
            .download_file("https://x/a.jar", &dest, Some(&sha1_hex(b"new")))
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
    }

    #[tokio::test]
    async fn hash_mismatch_exhausts_retries_and_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.jar");
        let transport = Arc::new(MemoryTransport::new());
        transport.serve("https://x/a.jar", b"corrupt".to_vec());

        let err = downloader(transport.clone())
            .download_file("https://x/a.jar", &dest, Some(&sha1_hex(b"expected")))
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(transport.requests_for("https://x/a.jar"), 3);
        assert!(!dest.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn broken_transfer_never_leaves_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("big.bin");
        let transport = Arc::new(MemoryTransport::new());
        transport.serve("https://x/big.bin", vec![7u8; 4096]);
        transport.break_mid_body("https://x/big.bin", usize::MAX);

        let result = downloader(transport.clone())
            .download_file("https://x/big.bin", &dest, None)
            .await;

        assert!(result.is_err());
        assert!(!dest.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn broken_transfer_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("lib.jar");
        std::fs::write(&dest, b"previous").unwrap();
        let transport = Arc::new(MemoryTransport::new());
        transport.serve("https://x/lib.jar", vec![3u8; 4096]);
        transport.break_mid_body("https://x/lib.jar", usize::MAX);

        let result = downloader(transport.clone())
            .download_file("https://x/lib.jar", &dest, Some(&sha1_hex(&[3u8; 4096])))
            .await;

        assert!(result.is_err());
        assert_eq!(std::fs::read(&dest).unwrap(), b"previous");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn shared_destination_is_fetched_once() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MemoryTransport::with_delay(Duration::from_millis(20)));
        transport.serve("https://x/obj", b"same-bytes".to_vec());
        let dest = dir.path().join("ab/abcdef");
        let hash = Some(sha1_hex(b"same-bytes"));
        let tasks = vec![
            DownloadTask::new("https://x/obj", &dest, hash.clone(), ProgressCategory::Resources),
            DownloadTask::new("https://x/obj", &dest, hash, ProgressCategory::Resources),
        ];

        let report = downloader(transport.clone())
            .with_concurrency(4)
            .download_batch(tasks, &tracker(2))
            .await
            .unwrap();

        assert_eq!(transport.requests_for("https://x/obj"), 1);
        assert_eq!((report.downloaded, report.skipped), (1, 1));
        assert_eq!(std::fs::read(&dest).unwrap(), b"same-bytes");
    }

    #[tokio::test]
    async fn transient_failure_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.bin");
        let transport = Arc::new(MemoryTransport::new());
        transport.serve("https://x/a.bin", b"abcdef".to_vec());
        transport.break_mid_body("https://x/a.bin", 1);

        downloader(transport.clone())
            .download_file("https://x/a.bin", &dest, Some(&sha1_hex(b"abcdef")))
            .await
            .unwrap();

        assert_eq!(transport.requests_for("https://x/a.bin"), 2);
        assert_eq!(std::fs::read(&dest).unwrap(), b"abcdef");
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MemoryTransport::new());

        let err = downloader(transport.clone())
            .download_file("https://x/missing", &dir.path().join("m"), None)
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::DownloadFailed { status: 404, .. }));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn batch_never_exceeds_concurrency() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MemoryTransport::with_delay(Duration::from_millis(20)));
        let mut tasks = Vec::new();
        for i in 0..12 {
            let url = format!("https://x/{i}");
            let body = format!("body-{i}");
            transport.serve(&url, body.clone().into_bytes());
            tasks.push(DownloadTask::new(
                url,
                dir.path().join(format!("f{i}")),
                Some(sha1_hex(body.as_bytes())),
                ProgressCategory::Resources,
            ));
        }

        let report = downloader(transport.clone())
            .with_concurrency(3)
            .download_batch(tasks, &tracker(12))
            .await
            .unwrap();

        assert_eq!(report.downloaded, 12);
        assert!(transport.max_active() <= 3, "peak was {}", transport.max_active());
        assert!(transport.max_active() >= 2);
    }

    #[tokio::test]
    async fn batch_progress_is_monotonic_and_counts_skips() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MemoryTransport::new());
        let mut tasks = Vec::new();
        for i in 0..5 {
            let url = format!("https://x/{i}");
            transport.serve(&url, vec![i as u8; 16]);
            tasks.push(DownloadTask::new(
                url,
                dir.path().join(format!("f{i}")),
                None,
                ProgressCategory::Core,
            ));
        }
        std::fs::write(dir.path().join("f0"), b"already here").unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = seen.clone();
            move |u: ProgressUpdate| seen.lock().unwrap().push((u.completed, u.total))
        };
        let progress = ProgressTracker::new(ProgressCategory::Core, 5, Arc::new(sink));

        let report = downloader(transport.clone())
            .download_batch(tasks, &progress)
            .await
            .unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.downloaded, 4);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 5);
        assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
        assert!(seen.iter().all(|(done, total)| done <= total));
    }

    #[tokio::test]
    async fn one_failure_fails_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MemoryTransport::new());
        transport.serve("https://x/ok", b"ok".to_vec());
        let tasks = vec![
            DownloadTask::new("https://x/ok", dir.path().join("ok"), None, ProgressCategory::Core),
            DownloadTask::new("https://x/gone", dir.path().join("gone"), None, ProgressCategory::Core),
        ];

        let err = downloader(transport)
            .with_concurrency(1)
            .download_batch(tasks, &tracker(2))
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::DownloadFailed { status: 404, .. }));
    }

    #[tokio::test]
    async fn cancelled_batch_does_no_network_work() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(MemoryTransport::new());
        transport.serve("https://x/a", b"a".to_vec());
        let cancel = CancelFlag::new();
        cancel.cancel();

        let err = downloader(transport.clone())
            .with_cancel_flag(cancel)
            .download_batch(
                vec![DownloadTask::new("https://x/a", dir.path().join("a"), None, ProgressCategory::Core)],
                &tracker(1),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::Cancelled));
        assert_eq!(transport.request_count(), 0);
    }
}
