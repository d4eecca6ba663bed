//! Trait abstraction for HTTP operations to enable testing

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::error::{Result, TrackerError};

/// Status and body of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Build a response from a status code and body text
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    /// Any 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for the HTTP calls the ingestion client makes
///
/// Implementations return `Ok` for every completed exchange regardless of
/// status; only transport failures are errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// GET `url`
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse>;

    /// POST `body` to `url` as `application/json`
    async fn post_json(&self, url: &str, body: &Value, timeout: Duration) -> Result<HttpResponse>;
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with the tracker's user agent
    ///
    /// # Errors
    ///
    /// Returns error if the TLS backend cannot be initialised
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("trucktrace-tracker/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TrackerError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    async fn finish(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TrackerError::Transport(format!("Failed to read response body: {}", e)))?;
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| TrackerError::Transport(format!("GET {} failed: {}", url, e)))?;
        Self::finish(response).await
    }

    async fn post_json(&self, url: &str, body: &Value, timeout: Duration) -> Result<HttpResponse> {
        let response = self
            .client
            .post(url)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| TrackerError::Transport(format!("POST {} failed: {}", url, e)))?;
        Self::finish(response).await
    }
}
