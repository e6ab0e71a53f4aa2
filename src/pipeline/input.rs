//! Input resolution: validate a user-supplied URL and fetch its bytes.
//!
//! Fetching sits behind the [`Fetcher`] trait so the tool pipelines can be
//! exercised without a network. [`HttpFetcher`] is the production
//! implementation: one GET, no retry, bounded by the per-call timeout.

use crate::error::{OcrError, ResourceKind};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Reject anything that is not an `http://` or `https://` URL.
///
/// Deliberately permissive beyond the prefix: host and path are left for
/// the HTTP client to judge.
pub fn validate_url(input: &str) -> Result<(), OcrError> {
    if is_url(input) {
        Ok(())
    } else {
        Err(OcrError::InvalidUrl {
            url: input.to_string(),
        })
    }
}

/// Retrieves the raw bytes behind a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        resource: ResourceKind,
        timeout: Duration,
    ) -> Result<Vec<u8>, OcrError>;
}

/// [`Fetcher`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a pre-configured client (proxies, custom TLS roots, …).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        resource: ResourceKind,
        timeout: Duration,
    ) -> Result<Vec<u8>, OcrError> {
        info!("Downloading {} from: {}", resource, url);

        let fetch_error = |e: reqwest::Error| {
            if e.is_timeout() {
                OcrError::FetchTimeout {
                    resource,
                    url: url.to_string(),
                    secs: timeout.as_secs(),
                }
            } else {
                OcrError::FetchFailed {
                    resource,
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        };

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(fetch_error)?;

        if !response.status().is_success() {
            return Err(OcrError::FetchFailed {
                resource,
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let bytes = response.bytes().await.map_err(fetch_error)?;
        debug!("Downloaded {} bytes from {}", bytes.len(), url);

        Ok(bytes.to_vec())
    }
}
