//! Retry policy with exponential backoff for inference calls.
//!
//! A single policy object is shared by every call site that talks to the
//! provider. Only errors accepted by the policy's predicate are retried; all
//! other failures surface on the first attempt.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{InferenceError, InferenceResult};

/// Counter incremented once per scheduled retry, labelled by operation.
pub const RETRIES_TOTAL: &str = "vtrain_inference_retries_total";

type RetryPredicate = Arc<dyn Fn(&InferenceError) -> bool + Send + Sync>;

/// Configuration for retry behavior.
#[derive(Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles for each later attempt.
    pub base_delay: Duration,
    /// Upper bound for a single backoff delay.
    pub max_delay: Duration,
    /// Operation name for logging.
    pub operation: String,
    retry_if: RetryPredicate,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(800),
            max_delay: Duration::from_secs(60),
            operation: "inference".to_string(),
            retry_if: Arc::new(InferenceError::is_rate_limited),
        }
    }
}

fn env_seconds(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("operation", &self.operation)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy {
    /// Create a new policy with the given operation name.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..Default::default()
        }
    }

    /// Load attempts and delays from the environment.
    ///
    /// `INFERENCE_RETRY_MAX_ATTEMPTS` (default 5), `INFERENCE_RETRY_BASE_DELAY`
    /// in seconds (default 0.8) and `INFERENCE_RETRY_MAX_DELAY` in seconds
    /// (default 60).
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_attempts = std::env::var("INFERENCE_RETRY_MAX_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_attempts);

        let base_delay = env_seconds("INFERENCE_RETRY_BASE_DELAY").unwrap_or(defaults.base_delay);
        let max_delay = env_seconds("INFERENCE_RETRY_MAX_DELAY").unwrap_or(defaults.max_delay);

        defaults
            .with_max_attempts(max_attempts)
            .with_base_delay(base_delay)
            .with_max_delay(max_delay)
    }

    /// Set the maximum number of attempts (at least 1).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the base delay for exponential backoff.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Set the delay cap.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Same policy, different operation name.
    pub fn for_operation(&self, operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..self.clone()
        }
    }

    /// Replace the retryable-error predicate.
    pub fn retry_if<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&InferenceError) -> bool + Send + Sync + 'static,
    {
        self.retry_if = Arc::new(predicate);
        self
    }

    /// Whether `error` should be retried under this policy.
    pub fn is_retryable(&self, error: &InferenceError) -> bool {
        (self.retry_if)(error)
    }

    /// Backoff after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(2u32.pow(exponent))
            .min(self.max_delay)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or runs out of attempts. The closure receives the 1-based attempt number.
    pub async fn run<F, Fut, T>(&self, mut operation: F) -> InferenceResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = InferenceResult<T>>,
    {
        let mut attempt = 1u32;

        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && self.is_retryable(&e) => {
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        operation = %self.operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited, backing off: {}",
                        e
                    );
                    metrics::counter!(RETRIES_TOTAL, "operation" => self.operation.clone())
                        .increment(1);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    debug!(
                        operation = %self.operation,
                        attempt,
                        "Giving up: {}",
                        e
                    );
                    return Err(e);
                }
            }
        }
    }
}
