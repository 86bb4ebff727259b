//! Retry logic with exponential backoff
//!
//! Used where a single transient failure should not decide an outcome, such
//! as judging a session unreachable during a health probe. The main run loop
//! never retries: every item is attempted once and the loop moves on.
//!
//! # Example
//!
//! ```no_run
//! use profile_harvester::config::RetryConfig;
//! use profile_harvester::error::FetchError;
//! use profile_harvester::retry::with_retry;
//!
//! # async fn example() -> Result<(), FetchError> {
//! let config = RetryConfig::default();
//! let value = with_retry(&config, || async {
//!     Ok::<_, FetchError>(7)
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::FetchError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (connect errors, timeouts, throttling, 5xx) return `true`.
/// Permanent outcomes (missing identity, undecodable payload) return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(e) => e.is_timeout() || e.is_connect(),
            FetchError::TimedOut { .. } => true,
            // Throttling and server-side failures
            FetchError::Http { status } => *status == 429 || (500..600).contains(status),
            FetchError::NotFound { .. } => false,
            FetchError::Decode(_) => false,
            FetchError::Cancelled => false,
            FetchError::Other(_) => false,
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// Returns the successful result or the last error after all retry attempts
/// are exhausted. Non-retryable errors are returned immediately.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying"
                );

                let jittered_delay = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };
                tokio::time::sleep(jittered_delay).await;

                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt + 1,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::debug!(error = %e, "Operation failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// The result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
