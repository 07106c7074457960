//! Bounded exponential-backoff retry for provider overload
//!
//! Only [`InferenceError::Overloaded`] is retried. Any other failure is
//! returned after the attempt that produced it.

use crate::config::RetryConfig;
use crate::error::InferenceError;
use std::future::Future;
use std::time::Duration;

/// Retry policy applied around one model call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy; `max_attempts` of zero is treated as one
    #[inline]
    #[must_use]
    pub fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay,
        }
    }

    /// Policy that never retries
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Total attempts including the first
    #[inline]
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Pause after failed attempt `attempt` (1-based), before the next one
    ///
    /// `min(initial_delay * 2^(attempt - 1), max_delay)`
    #[must_use]
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_delay
            .checked_mul(1u32 << exponent)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// Run `work` until it succeeds, fails with a non-retryable error, or
    /// attempts run out
    ///
    /// `work` is called afresh for every attempt and must rebuild the same
    /// request each time.
    ///
    /// # Errors
    /// Returns the first non-retryable error, or the last overload error once
    /// all attempts are spent.
    pub async fn run<T, F, Fut>(&self, stage: &str, mut work: F) -> Result<T, InferenceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, InferenceError>>,
    {
        let mut attempt = 1;
        loop {
            tracing::debug!(stage, attempt, max_attempts = self.max_attempts, "attempting");

            match work().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_after_attempt(attempt);
                    tracing::warn!(
                        stage,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "provider overloaded, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    tracing::error!(stage, attempts = attempt, error = %err, "giving up");
                    return Err(err);
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(RetryConfig::default())
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.initial_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }
}
