use anyhow::{Context, Result};
use reqwest::Client as HttpClient;
use reqwest::StatusCode;
use reqwest::header::CACHE_CONTROL;

use crate::config::Config;

pub const TOPIC_PAGE_LIMIT: u32 = 200;

/// Raw Mirror Node reply. Status handling is left to the caller.
#[derive(Debug, Clone)]
pub struct MirrorResponse {
    pub status: StatusCode,
    pub body: String,
}

impl MirrorResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND
    }
}

/// Read operations against the ledger indexer
#[async_trait::async_trait]
pub trait MirrorApi: Send + Sync {
    /// Base URL, used to report where a lookup went
    fn base_url(&self) -> &str;

    async fn get_token_instance(&self, token_id: &str, serial: u64) -> Result<MirrorResponse>;

    async fn get_topic_messages(&self, topic_id: &str, order: &str, limit: u32) -> Result<MirrorResponse>;
}

pub fn token_instance_url(base_url: &str, token_id: &str, serial: u64) -> String {
    format!("{}/api/v1/tokens/{}/nfts/{}", base_url, token_id, serial)
}

pub fn topic_messages_url(base_url: &str, topic_id: &str, order: &str, limit: u32) -> String {
    format!(
        "{}/api/v1/topics/{}/messages?order={}&limit={}",
        base_url, topic_id, order, limit
    )
}

pub struct MirrorNodeClient {
    base_url: String,
    http_client: HttpClient,
}

impl MirrorNodeClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(config.http_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: config.mirror_url.clone(),
            http_client,
        })
    }

    async fn get(&self, url: &str) -> Result<MirrorResponse> {
        // The record may not exist yet, so every read must skip intermediate caches
        let response = self.http_client
            .get(url)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .with_context(|| format!("Failed to query Mirror Node at {}", url))?;

        let status = response.status();
        let body = response.text().await
            .context("Failed to read Mirror Node response body")?;

        tracing::debug!(%url, %status, "mirror node response");
        Ok(MirrorResponse { status, body })
    }
}

#[async_trait::async_trait]
impl MirrorApi for MirrorNodeClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_token_instance(&self, token_id: &str, serial: u64) -> Result<MirrorResponse> {
        self.get(&token_instance_url(&self.base_url, token_id, serial)).await
    }

    async fn get_topic_messages(&self, topic_id: &str, order: &str, limit: u32) -> Result<MirrorResponse> {
        self.get(&topic_messages_url(&self.base_url, topic_id, order, limit)).await
    }
}
