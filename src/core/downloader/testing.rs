// In-memory stand-ins for the network, shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use sha1::{Digest, Sha1};

use super::transport::{ByteStream, Transport};
use crate::core::error::{LauncherError, LauncherResult};

pub fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

/// Serves registered URLs from memory and records what was asked of it.
#[derive(Default)]
pub struct MemoryTransport {
    files: Mutex<HashMap<String, Vec<u8>>>,
    /// URL → remaining number of attempts that break mid-body.
    broken: Mutex<HashMap<String, usize>>,
    requested: Mutex<Vec<String>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    delay: Duration,
}

struct ActiveGuard {
    active: Arc<AtomicUsize>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn serve(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.files.lock().unwrap().insert(url.to_string(), body.into());
    }

    /// Make the next `times` requests for `url` fail after the first chunk.
    pub fn break_mid_body(&self, url: &str, times: usize) {
        self.broken.lock().unwrap().insert(url.to_string(), times);
    }

    pub fn request_count(&self) -> usize {
        self.requested.lock().unwrap().len()
    }

    pub fn requests_for(&self, url: &str) -> usize {
        self.requested
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn open(&self, url: &str) -> LauncherResult<ByteStream> {
        self.requested.lock().unwrap().push(url.to_string());

        let body = self.files.lock().unwrap().get(url).cloned();
        let Some(body) = body else {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: 404,
            });
        };

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        let guard = ActiveGuard {
            active: self.active.clone(),
        };

        let breaks = {
            let mut broken = self.broken.lock().unwrap();
            match broken.get_mut(url) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            }
        };

        let delay = self.delay;
        let url = url.to_string();
        let half = body.len() / 2;
        let first = Bytes::copy_from_slice(&body[..half]);
        let rest = Bytes::copy_from_slice(&body[half..]);

        let chunks = stream::once(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok(first)
        })
        .chain(stream::once(async move {
            let _guard = guard;
            if breaks {
                Err(LauncherError::DownloadFailed { url, status: 0 })
            } else {
                Ok(rest)
            }
        }));

        Ok(chunks.boxed())
    }
}
