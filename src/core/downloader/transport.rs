// ─── Transport ───
// The network seam: opens a URL as a stream of byte chunks.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::Client;

use crate::core::error::{LauncherError, LauncherResult};

/// Body chunks of one response, in order.
pub type ByteStream = BoxStream<'static, LauncherResult<Bytes>>;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Start a GET request. Non-success statuses are errors.
    async fn open(&self, url: &str) -> LauncherResult<ByteStream>;
}

/// Production transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn open(&self, url: &str) -> LauncherResult<ByteStream> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LauncherError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.bytes_stream().map_err(LauncherError::from).boxed())
    }
}
