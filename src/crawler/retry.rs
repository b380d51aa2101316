//! Bounded retry with exponential back-off and jitter
//!
//! Only transient failures are retried: network timeouts and connection errors,
//! HTTP 5xx, and the `UNKNOWN_ERROR` API status. Empty results, quota exhaustion,
//! rejected requests and decode failures return immediately.

use crate::crawler::types::ApiStatus;
use crate::HarvestError;
use std::future::Future;
use std::time::Duration;

const MAX_DELAY_MS: u64 = 30_000;

/// Retry settings for one upstream client
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Additional attempts after the first
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_base_ms: 0,
        }
    }
}

/// Returns `true` for errors worth another attempt after a back-off delay
pub(crate) fn is_retriable(err: &HarvestError) -> bool {
    match err {
        HarvestError::Http { source, .. } => {
            source.is_timeout() || source.is_connect() || source.is_request()
        }
        HarvestError::Upstream { status, .. } => (500..600).contains(status),
        HarvestError::ApiStatus { status, .. } => *status == ApiStatus::UnknownError,
        _ => false,
    }
}

/// Runs `operation`, retrying transient failures up to `policy.max_retries` times
///
/// The delay before retry `n` is `backoff_base_ms × 2^(n-1)` with ±25 % jitter,
/// capped at 30 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, HarvestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, HarvestError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= policy.max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = policy
                    .backoff_base_ms
                    .saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms,
                    error = %err,
                    "transient upstream error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
