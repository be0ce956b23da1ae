//! Exponential-backoff retry around fallible async operations.

use crate::error::ApiError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound on attempts per request
pub const MAX_RETRIES: u32 = 10;
/// Backoff never sleeps longer than this between attempts
pub const MAX_DELAY: Duration = Duration::from_secs(60);

/// Retry settings as they appear in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_max_jitter_ms() -> u64 {
    500
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            backoff_factor: default_backoff_factor(),
            max_jitter_ms: default_max_jitter_ms(),
        }
    }
}

impl RetryConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_retries == 0 {
            return Err("max_retries must be at least 1".to_string());
        }
        if self.max_retries > MAX_RETRIES {
            return Err(format!(
                "max_retries must be at most {}, got {}",
                MAX_RETRIES, self.max_retries
            ));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(format!(
                "backoff_factor must be >= 1.0, got {}",
                self.backoff_factor
            ));
        }
        Ok(())
    }
}

/// Backoff policy: `max_retries` total attempts, sleeping `delay + jitter`
/// between them and multiplying `delay` by `backoff_factor` each time.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            backoff_factor: config.backoff_factor,
            max_jitter: Duration::from_millis(config.max_jitter_ms),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no sleeping
    pub fn no_retry() -> Self {
        Self {
            max_retries: 1,
            initial_delay: Duration::ZERO,
            backoff_factor: 1.0,
            max_jitter: Duration::ZERO,
        }
    }

    fn jitter(&self) -> Duration {
        if self.max_jitter.is_zero() {
            return Duration::ZERO;
        }
        let millis = self.max_jitter.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(0..=millis))
    }

    /// Next backoff delay, capped at `MAX_DELAY`; a non-finite factor holds the delay.
    fn next_delay(&self, delay: Duration) -> Duration {
        if !self.backoff_factor.is_finite() {
            return delay.min(MAX_DELAY);
        }
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.backoff_factor.max(1.0))
            .unwrap_or(MAX_DELAY)
            .min(MAX_DELAY)
    }
}

/// Run `operation` under `policy`.
///
/// Non-retryable errors (cancellation, configuration) propagate immediately.
/// After the last attempt the last error is returned unchanged.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let max_attempts = policy.max_retries.max(1);
    let mut delay = policy.initial_delay.min(MAX_DELAY);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) if attempt >= max_attempts => {
                warn!(attempts = attempt, error = %err, "Retries exhausted");
                return Err(err);
            }
            Err(err) => {
                let pause = delay.saturating_add(policy.jitter());
                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = pause.as_millis() as u64,
                    error = %err,
                    "Attempt failed, backing off"
                );
                tokio::time::sleep(pause).await;
                delay = policy.next_delay(delay);
            }
        }
    }
}
