use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;

use crate::core::state::InstallerSettings;

const APP_USER_AGENT: &str = concat!("GameSync/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client. Timeouts are enforced per request by the transport,
/// independently of cooperative cancellation.
pub fn build_http_client(settings: &InstallerSettings) -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
        .timeout(Duration::from_secs(settings.request_timeout_secs))
        .build()
}
