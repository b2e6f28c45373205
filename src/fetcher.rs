use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::events::decode_events;
use crate::mirror::{MirrorApi, MirrorResponse, TOPIC_PAGE_LIMIT, token_instance_url};
use crate::models::{Timeline, TopicMessagesPage};
use crate::retry::{RetryPolicy, exponential_delay, retry_with};
use crate::timeline::{TimelineError, assemble};

pub const MAX_RETRIES: u32 = 12;
pub const BASE_DELAY_MS: u64 = 800;
pub const BACKOFF_FACTOR: f64 = 1.6;

/// Retries token lookups only while the Mirror Node answers 404, the one
/// failure that read-replica lag after a mint explains.
#[derive(Debug, Clone)]
pub struct PropagationPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub factor: f64,
}

impl Default for PropagationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRIES,
            base_delay: Duration::from_millis(BASE_DELAY_MS),
            factor: BACKOFF_FACTOR,
        }
    }
}

impl RetryPolicy<Result<MirrorResponse>> for PropagationPolicy {
    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn should_retry(&self, outcome: &Result<MirrorResponse>) -> bool {
        matches!(outcome, Ok(response) if response.is_not_found())
    }

    fn backoff(&self, attempt: u32) -> Duration {
        exponential_delay(self.base_delay, self.factor, attempt)
    }
}

pub struct TimelineFetcher {
    mirror: Arc<dyn MirrorApi>,
    policy: PropagationPolicy,
    token_id: String,
    topic_id: String,
}

impl TimelineFetcher {
    pub fn new(mirror: Arc<dyn MirrorApi>, token_id: String, topic_id: String) -> Self {
        Self::with_policy(mirror, token_id, topic_id, PropagationPolicy::default())
    }

    pub fn with_policy(
        mirror: Arc<dyn MirrorApi>,
        token_id: String,
        topic_id: String,
        policy: PropagationPolicy,
    ) -> Self {
        Self { mirror, policy, token_id, topic_id }
    }

    /// Look up the token instance, waiting out Mirror Node propagation lag.
    ///
    /// Returns the last response seen: a success, the final 404 once the
    /// budget is spent, or the first non-404 failure. Transport errors are
    /// returned at once.
    pub async fn fetch_token_instance(&self, serial: u64) -> Result<Option<MirrorResponse>> {
        let outcome = retry_with(&self.policy, |attempt| {
            tracing::debug!(token_id = %self.token_id, serial, attempt, "looking up token instance");
            self.mirror.get_token_instance(&self.token_id, serial)
        })
        .await;

        outcome.transpose()
    }

    pub async fn fetch(&self, serial: u64) -> Result<Timeline, TimelineError> {
        let nft_response = self.fetch_token_instance(serial).await?;

        let nft_response = match nft_response {
            Some(response) if response.is_success() => response,
            Some(response) if response.is_not_found() => {
                tracing::warn!(token_id = %self.token_id, serial, "token instance not visible after retries");
                return Err(TimelineError::NotFound {
                    token_id: self.token_id.clone(),
                    serial,
                    mirror_url: token_instance_url(self.mirror.base_url(), &self.token_id, serial),
                });
            }
            Some(response) => {
                return Err(TimelineError::Upstream(format!(
                    "Mirror NFT fetch failed: {}",
                    response.body
                )));
            }
            None => return Err(TimelineError::Upstream("Mirror NFT fetch failed: Unknown error".to_string())),
        };

        let nft: Value = serde_json::from_str(&nft_response.body)
            .context("Failed to parse Mirror Node NFT response")?;

        let messages_response = self.mirror
            .get_topic_messages(&self.topic_id, "asc", TOPIC_PAGE_LIMIT)
            .await?;

        if !messages_response.is_success() {
            return Err(TimelineError::Upstream(format!(
                "Mirror topic fetch failed: {}",
                messages_response.body
            )));
        }

        let page: TopicMessagesPage = serde_json::from_str(&messages_response.body)
            .context("Failed to parse Mirror Node topic messages response")?;

        let decoded = decode_events(&page.messages, serial);
        tracing::info!(
            token_id = %self.token_id,
            serial,
            events = decoded.events.len(),
            dropped = decoded.dropped,
            "assembled shipment timeline"
        );

        Ok(assemble(&self.token_id, serial, nft, decoded))
    }
}
