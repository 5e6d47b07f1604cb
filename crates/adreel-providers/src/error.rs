//! Error taxonomy shared by every provider adapter.
//!
//! The Worker decides retry vs. permanent failure solely from
//! `(kind, attempts)`; adapters never swallow an error, they classify it.

use thiserror::Error;

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Missing/invalid credential. Not retryable.
    #[error("auth error: {0}")]
    Auth(String),

    /// Malformed input, missing required field. Not retryable.
    #[error("validation error: {0}")]
    Validation(String),

    /// Timeouts, rate limits, 5xx, network errors. Retryable.
    #[error("transient error: {0}")]
    Transient(String),

    /// Provider refused for safety/policy reasons. Not retryable.
    #[error("content policy violation: {0}")]
    ContentPolicy(String),

    /// Malformed provider response, missing URL on reported success.
    /// Not retryable.
    #[error("provider returned a permanent error: {0}")]
    ProviderPermanent(String),

    /// Anything else. Treated as one retry, then fail.
    #[error("unknown provider error: {0}")]
    Unknown(String),
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Transient(_) | ProviderError::Unknown(_))
    }

    /// Classify a `reqwest::Error` per spec.md §7: timeouts, connect
    /// failures, and 5xx/429 are transient; anything else unknown.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            return ProviderError::Transient(err.to_string());
        }
        if let Some(status) = err.status() {
            if status.as_u16() == 429 || status.is_server_error() {
                return ProviderError::Transient(err.to_string());
            }
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return ProviderError::Auth(err.to_string());
            }
            if status.as_u16() == 400 {
                return ProviderError::Validation(err.to_string());
            }
        }
        ProviderError::Unknown(err.to_string())
    }

    /// Classify an HTTP status the caller already read off a successful
    /// response (i.e. `reqwest` didn't error on its own, but the body
    /// indicates a non-2xx outcome via a manual status check).
    pub fn from_status(status: reqwest::StatusCode, body: impl Into<String>) -> Self {
        let body = body.into();
        match status.as_u16() {
            401 | 403 => ProviderError::Auth(body),
            400 | 422 => ProviderError::Validation(body),
            429 => ProviderError::Transient(body),
            451 => ProviderError::ContentPolicy(body),
            s if (500..600).contains(&s) => ProviderError::Transient(body),
            _ => ProviderError::Unknown(body),
        }
    }
}
