use anyhow::{Context, Result};
use reqwest::Client as HttpClient;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;
use crate::retry::{RetryPolicy, linear_delay, retry_with};

pub const UPLOAD_ATTEMPTS: u32 = 3;
pub const UPLOAD_BACKOFF_STEP_MS: u64 = 500;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{0}")]
    Maintenance(String),

    #[error("{0}")]
    Failed(String),

    /// Local setup problem; retrying cannot help
    #[error("{0}")]
    Misconfigured(String),
}

impl StorageError {
    /// Classify an upstream failure message
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.to_lowercase().contains("maintenance") {
            StorageError::Maintenance(message)
        } else {
            StorageError::Failed(message)
        }
    }

    pub fn is_maintenance(&self) -> bool {
        matches!(self, StorageError::Maintenance(_))
    }
}

/// File received from a caller, ready to pin
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Content-addressed storage that answers a pinned file with its CID
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, upload: &Upload) -> Result<String, StorageError>;
}

/// Linear backoff between attempts, giving up at once during maintenance
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_attempts: u32,
    pub step: Duration,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_attempts: UPLOAD_ATTEMPTS,
            step: Duration::from_millis(UPLOAD_BACKOFF_STEP_MS),
        }
    }
}

impl RetryPolicy<Result<String, StorageError>> for UploadPolicy {
    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn should_retry(&self, outcome: &Result<String, StorageError>) -> bool {
        matches!(outcome, Err(StorageError::Failed(_)))
    }

    fn backoff(&self, attempt: u32) -> Duration {
        linear_delay(self.step, attempt)
    }
}

pub async fn upload_with_retry(
    store: &dyn BlobStore,
    upload: &Upload,
    policy: &UploadPolicy,
) -> Result<String, StorageError> {
    let outcome = retry_with(policy, |attempt| {
        tracing::debug!(name = %upload.name, attempt, "uploading to storage network");
        store.put(upload)
    })
    .await;

    outcome.unwrap_or_else(|| Err(StorageError::Failed("Failed to upload to IPFS".to_string())))
}

#[derive(Debug, Deserialize)]
struct UploadReply {
    cid: String,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    message: Option<String>,
}

/// Web3.Storage HTTP upload client
pub struct Web3StorageClient {
    api_url: String,
    token: Option<String>,
    http_client: HttpClient,
}

impl Web3StorageClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(config.http_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_url: config.web3_storage_url.clone(),
            token: config.web3_storage_token.clone(),
            http_client,
        })
    }
}

#[async_trait::async_trait]
impl BlobStore for Web3StorageClient {
    async fn put(&self, upload: &Upload) -> Result<String, StorageError> {
        let token = self.token.as_ref().ok_or_else(|| {
            StorageError::Misconfigured("Missing required env var: WEB3_STORAGE_TOKEN".to_string())
        })?;

        let url = format!("{}/upload", self.api_url);
        let mut request = self.http_client
            .post(&url)
            .bearer_auth(token)
            .header("X-NAME", upload.name.as_str())
            .body(upload.bytes.clone());
        if let Some(content_type) = &upload.content_type {
            request = request.header(reqwest::header::CONTENT_TYPE, content_type.as_str());
        }

        let response = request.send().await
            .map_err(|e| StorageError::from_message(format!("Failed to reach Web3.Storage: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorReply>(&body)
                .ok()
                .and_then(|reply| reply.message)
                .unwrap_or(body);
            return Err(StorageError::from_message(format!(
                "Web3.Storage upload failed (status {}): {}",
                status, message
            )));
        }

        let reply: UploadReply = serde_json::from_str(&body)
            .map_err(|e| StorageError::Failed(format!("Failed to parse Web3.Storage response: {}", e)))?;

        Ok(reply.cid)
    }
}
