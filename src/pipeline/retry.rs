//! Retry with exponential backoff for calls to external capabilities.
//!
//! OCR processes and LLM APIs fail transiently under load (HTTP 429/503,
//! a stalled tesseract process). The wait before attempt `n` (1-based) is
//! `backoff_ms * 2^(n-1)`: with 500 ms and 3 retries that is
//! 500 ms → 1 s → 2 s. Only errors for which
//! [`AnalyzerError::is_retryable`] holds are retried.

use crate::error::AnalyzerError;
use std::future::Future;
use tokio::time::{sleep, Duration};
use tracing::warn;

/// How many times to retry and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.backoff_ms.saturating_mul(factor))
    }
}

/// Run `op` until it succeeds, fails permanently, or retries run out.
pub async fn with_retry<T, F, Fut>(
    label: &str,
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, AnalyzerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AnalyzerError>>,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                attempt += 1;
                let backoff = policy.backoff(attempt);
                warn!(
                    "{}: retry {}/{} after {}ms: {}",
                    label,
                    attempt,
                    policy.max_retries,
                    backoff.as_millis(),
                    e
                );
                sleep(backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}
