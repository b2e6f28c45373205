use std::future::Future;
use std::time::Duration;

/// Decides how often an operation is attempted and how long to wait in between
pub trait RetryPolicy<T> {
    fn max_attempts(&self) -> u32;

    /// Whether `outcome` is transient and worth another attempt
    fn should_retry(&self, outcome: &T) -> bool;

    /// Delay after the zero-based `attempt` failed with a retryable outcome
    fn backoff(&self, attempt: u32) -> Duration;
}

/// Run `operation` under `policy` and return the last outcome.
///
/// Stops at the first outcome the policy does not consider retryable. A
/// retryable outcome on the final attempt is returned as is, without sleeping.
/// Returns `None` only when the policy allows zero attempts.
pub async fn retry_with<T, P, F, Fut>(policy: &P, mut operation: F) -> Option<T>
where
    P: RetryPolicy<T>,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = T>,
{
    let max_attempts = policy.max_attempts();
    let mut last = None;

    for attempt in 0..max_attempts {
        let outcome = operation(attempt).await;
        if !policy.should_retry(&outcome) {
            return Some(outcome);
        }

        if attempt + 1 < max_attempts {
            let delay = policy.backoff(attempt);
            tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying after backoff");
            tokio::time::sleep(delay).await;
        }
        last = Some(outcome);
    }

    last
}

/// `base · factor^attempt`, rounded to whole milliseconds
pub fn exponential_delay(base: Duration, factor: f64, attempt: u32) -> Duration {
    let millis = base.as_millis() as f64 * factor.powi(attempt as i32);
    Duration::from_millis(millis.round() as u64)
}

/// `step · (attempt + 1)`
pub fn linear_delay(step: Duration, attempt: u32) -> Duration {
    step * (attempt + 1)
}
