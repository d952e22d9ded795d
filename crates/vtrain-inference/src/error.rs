//! Inference error types.

use thiserror::Error;

/// Result type for inference operations.
pub type InferenceResult<T> = Result<T, InferenceError>;

/// Substrings that mark a provider error as rate-limit or quota related.
const RATE_LIMIT_SIGNALS: &[&str] = &[
    "rate limit",
    "rate_limit",
    "ratelimit",
    "too many requests",
    "quota",
];

/// Errors that can occur when calling the inference provider.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl InferenceError {
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Classify a non-success HTTP status with its response body.
    pub fn from_http_status(status: u16, body: impl Into<String>) -> Self {
        let message = body.into();
        match status {
            429 => Self::RateLimited(message),
            _ => Self::Api { status, message },
        }
    }

    /// True if the failure is rate-limit class and worth retrying with backoff.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            InferenceError::RateLimited(_) => true,
            InferenceError::Api { status: 429, .. } => true,
            InferenceError::Api { message, .. } | InferenceError::InvalidResponse(message) => {
                has_rate_limit_signal(message)
            }
            InferenceError::Network(e) => {
                e.status().is_some_and(|s| s.as_u16() == 429)
            }
            InferenceError::Config(_) => false,
        }
    }
}

fn has_rate_limit_signal(message: &str) -> bool {
    let text = message.to_lowercase();
    RATE_LIMIT_SIGNALS.iter().any(|signal| text.contains(signal))
}
