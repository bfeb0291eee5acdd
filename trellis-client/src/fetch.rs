//! Registry snapshot fetching.

use crate::error::FetchError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use trellis_types::{Envelope, StoredPage};

/// Path of the registry read endpoint on the host.
pub const REGISTRY_PATH: &str = "/admin/dynamic-pages";

/// Source of the page registry snapshot.
#[async_trait]
pub trait RegistrySource: Send + Sync {
    async fn fetch_pages(&self, token: &str) -> Result<Vec<StoredPage>, FetchError>;
}

/// Deadline for one registry request, connect through body.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Fetches the snapshot from a host over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRegistryClient {
    http: Client,
    base_url: String,
}

impl HttpRegistryClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// A client whose requests fail with [`FetchError::Transport`] once
    /// `timeout` elapses.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self::with_client(http, base_url))
    }

    /// Uses a preconfigured client. Its timeout settings apply as is.
    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn endpoint(&self) -> String {
        format!("{}{REGISTRY_PATH}", self.base_url)
    }
}

#[async_trait]
impl RegistrySource for HttpRegistryClient {
    async fn fetch_pages(&self, token: &str) -> Result<Vec<StoredPage>, FetchError> {
        let response = self
            .http
            .get(self.endpoint())
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(FetchError::Unauthorized(status.as_u16()));
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(transport)?;
        let envelope: Envelope<Vec<StoredPage>> =
            serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))?;
        Ok(envelope.data)
    }
}

fn transport(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Transport(format!("registry request timed out: {e}"))
    } else {
        FetchError::Transport(e.to_string())
    }
}
