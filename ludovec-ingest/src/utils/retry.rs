//! Bounded-backoff retry for external calls
//!
//! Every outbound call (catalog fetch, inference, persistence write) runs
//! through `retry_with_backoff`. The caller supplies a predicate separating
//! retryable conditions (rate limit, 5xx, network, timeout) from fatal ones
//! (validation, not-found); fatal errors return immediately without retry.
//!
//! **Backoff strategy:**
//! - Bounded attempts (default 4)
//! - Exponential delay from a fixed initial value (default 500ms)
//! - Capped at a maximum delay (default 8s)

use std::time::Duration;

/// Retry policy: attempt bound plus backoff shape
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay before the given attempt number (attempt 2 gets the initial
    /// delay, each later attempt doubles, capped at `max_delay`)
    fn delay_before(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(2).min(16);
        let delay = self.initial_delay.saturating_mul(1u32 << exponent);
        delay.min(self.max_delay)
    }
}

/// Retry an async operation with exponential backoff.
///
/// Calls `operation` up to `policy.max_attempts` times, sleeping between
/// attempts. An error is retried only while `is_retryable` returns true and
/// attempts remain; otherwise it is returned to the caller as-is.
pub async fn retry_with_backoff<T, E, F, Fut, P>(
    operation_name: &str,
    policy: RetryPolicy,
    is_retryable: P,
    mut operation: F,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        if attempt > 1 {
            let delay = policy.delay_before(attempt);
            tracing::debug!(
                operation = operation_name,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Backing off before retry"
            );
            tokio::time::sleep(delay).await;
        }

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(
                        operation = operation_name,
                        attempt,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                if !is_retryable(&err) {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "Fatal error, not retrying"
                    );
                    return Err(err);
                }

                if attempt == max_attempts {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "Retries exhausted"
                    );
                    return Err(err);
                }

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    error = %err,
                    "Transient error, will retry"
                );
            }
        }
    }

    unreachable!("retry loop always returns within max_attempts")
}
