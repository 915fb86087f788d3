//! Retry with exponential backoff for catalog API calls.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};

/// Retry policy configuration.
///
/// Rate limits back off from a longer base than other transient errors, and
/// a `Retry-After` longer than the computed backoff wins.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (0 = no retries).
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Base delay after a 429.
    pub rate_limit_base_delay: Duration,
    /// Cap for any delay after a 429, including `Retry-After`.
    pub rate_limit_max_delay: Duration,
    /// Spread each delay by up to ±25%.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 20,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            rate_limit_base_delay: Duration::from_secs(5),
            rate_limit_max_delay: Duration::from_secs(600),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base delays for both transient errors and rate limits.
    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.rate_limit_base_delay = base_delay;
        self
    }

    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self.rate_limit_max_delay = max_delay;
        self
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Whether the error should be retried at the given attempt number.
    #[must_use]
    pub fn should_retry(&self, attempt: u32, error: &ApiError) -> bool {
        attempt < self.max_retries && error.is_retryable()
    }

    /// Delay before retrying after `error` on the given attempt.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, error: &ApiError) -> Duration {
        if let ApiError::RateLimited { retry_after } = error {
            let backoff = self.jittered(exponential(
                self.rate_limit_base_delay,
                attempt,
                self.rate_limit_max_delay,
            ));
            return match retry_after {
                Some(retry_after) if *retry_after > backoff => {
                    (*retry_after).min(self.rate_limit_max_delay)
                }
                _ => backoff,
            };
        }

        self.jittered(exponential(self.base_delay, attempt, self.max_delay))
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let factor = rand::thread_rng().gen_range(-0.25..=0.25);
        delay.mul_f64(1.0 + factor)
    }

    /// Execute an async operation with retry.
    ///
    /// Each retry is logged at `debug`; exhausting the retries is logged at
    /// `warn` and reported as [`ApiError::MaxRetriesExceeded`].
    pub async fn execute<F, Fut, T>(&self, operation: &str, mut f: F) -> ApiResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = ApiResult<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match f().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(operation, attempt = attempt + 1, "Request succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if !self.should_retry(attempt, &error) {
                        if error.is_retryable() && self.max_retries > 0 {
                            warn!(
                                operation,
                                attempts = attempt + 1,
                                error = %error,
                                "Max retries exceeded"
                            );
                            return Err(ApiError::MaxRetriesExceeded {
                                attempts: attempt + 1,
                                message: format!(
                                    "{operation} failed after {} attempt(s): {error}",
                                    attempt + 1
                                ),
                            });
                        }
                        return Err(error);
                    }

                    let delay = self.delay_for(attempt, &error);
                    debug!(
                        operation,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying after transient error"
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

fn exponential(base: Duration, attempt: u32, max: Duration) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt)).min(max)
}

/// Parse a `Retry-After` header: delay seconds or an HTTP date.
#[must_use]
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let wait = date.with_timezone(&Utc) - now;
    Some(wait.to_std().unwrap_or(Duration::ZERO))
}
