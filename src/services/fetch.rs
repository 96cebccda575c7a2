//! Remote source fetching
//!
//! Overlay sources may be URLs produced by an image generation collaborator.
//! They are requested anonymously: no cookies, no credentials, so any origin
//! that serves the bytes publicly can be keyed.

use crate::error::{Result, TryOnError};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

/// Resolves a remote URL into encoded image bytes
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// `reqwest`-backed fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with a bounded request timeout
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TryOnError::fetch(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!(url = %url, "Fetching overlay source");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TryOnError::network_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TryOnError::fetch(format!(
                "Failed to fetch '{}': HTTP {}",
                url, status
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TryOnError::network_error(url, &e))?;
        Ok(bytes.to_vec())
    }
}

/// In-memory fetcher serving fixed responses, for offline use and tests
#[derive(Debug, Clone, Default)]
pub struct StaticFetcher {
    responses: HashMap<String, Vec<u8>>,
}

impl StaticFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the bytes served for `url`
    #[must_use]
    pub fn with_response<S: Into<String>>(mut self, url: S, bytes: Vec<u8>) -> Self {
        self.responses.insert(url.into(), bytes);
        self
    }
}

#[async_trait]
impl SourceFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| TryOnError::fetch(format!("Failed to fetch '{}': not found", url)))
    }
}
