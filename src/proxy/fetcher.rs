use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;
use url::Url;

/// Status line and body of an upstream response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fetches upstream documents for the proxy
#[async_trait]
pub trait HtmlFetcher: Send + Sync + Debug {
    /// `Err` only for transport or body failures; HTTP error statuses come
    /// back as a response
    async fn fetch(&self, url: &Url) -> Result<UpstreamResponse>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("teach-portal/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HtmlFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &Url) -> Result<UpstreamResponse> {
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            tracing::warn!("Fetch error for {}: {:?}", url, e);
            anyhow::anyhow!("Failed to fetch URL: {} - Error: {}", url, e)
        })?;

        let status = response.status();
        let reason = status.canonical_reason().unwrap_or_default().to_string();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        Ok(UpstreamResponse {
            status: status.as_u16(),
            reason,
            body,
        })
    }
}
