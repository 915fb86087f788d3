//! Catalog API errors.

use std::time::Duration;

use thiserror::Error;

/// Result type for catalog API calls.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("rate limited (status 429)")]
    RateLimited { retry_after: Option<Duration> },

    #[error("status {status}: {body}")]
    Server { status: u16, body: String },

    #[error("status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("read-only client tried to make mutating request: {method} {url}")]
    ReadOnly { method: String, url: String },

    #[error("{message}")]
    MaxRetriesExceeded { attempts: u32, message: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid API endpoint: {0}")]
    InvalidEndpoint(String),
}

impl ApiError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Network(_) | ApiError::RateLimited { .. } | ApiError::Server { .. }
        )
    }

    /// HTTP status of the response, when there was one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::RateLimited { .. } => Some(429),
            ApiError::Server { status, .. } | ApiError::Api { status, .. } => Some(*status),
            ApiError::NotFound(_) => Some(404),
            _ => None,
        }
    }
}
