// Outbound HTTP plumbing - every GitHub call goes through here
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use tracing::{debug, warn};

use crate::github::{GitHubError, Result};

const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";

/// Status code and body of an upstream response, before any interpretation.
///
/// GitHub reports some failures (rate limiting, missing repos) inside a
/// response body, so the gateway never judges a response by status alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The fetch gateway seam: everything above this trait is testable without a network
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<RawResponse>;
    async fn post_json(&self, url: &str, body: serde_json::Value) -> Result<RawResponse>;
}

/// Settings for the reqwest-backed transport
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub token: Option<String>,
    pub api_version: String,
    pub user_agent: String,
    /// No timeout unless configured; a hung upstream call blocks the caller
    pub timeout: Option<Duration>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            token: None,
            api_version: "2022-11-28".to_string(),
            user_agent: "repofolio/0.1.0".to_string(),
            timeout: None,
        }
    }
}

/// Stateless transport that stamps the same headers on every request
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(settings: &TransportSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(&settings.user_agent)?);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(API_VERSION_HEADER, header_value(&settings.api_version)?);

        match &settings.token {
            Some(token) => {
                let mut value = header_value(&format!("Bearer {}", token))?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            None => warn!("No GitHub token configured, requests will be unauthenticated"),
        }

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build()?;
        Ok(Self { client })
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| GitHubError::InvalidConfig(format!("invalid header value: {}", e)))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<RawResponse> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }

    async fn post_json(&self, url: &str, body: serde_json::Value) -> Result<RawResponse> {
        debug!("POST {}", url);
        let response = self.client.post(url).json(&body).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }
}
