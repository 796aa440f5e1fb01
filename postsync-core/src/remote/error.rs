//! Gateway error types.

use thiserror::Error;

/// Errors returned by a [`ContentGateway`](super::ContentGateway).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The token was rejected; the user needs to re-authenticate.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The revision token is stale, or a create hit an existing file.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The provider throttled us. `retry_after` is in seconds when known.
    #[error("Rate limited{}", retry_hint(.retry_after))]
    RateLimited { retry_after: Option<u64> },

    /// Network failure or server-side error; safe to retry later.
    #[error("Network error: {0}")]
    Transient(String),

    /// Any other client error reported by the provider.
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Invalid post filename: {0:?}")]
    InvalidFilename(String),
}

impl GatewayError {
    /// True when the same request may succeed if tried again later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::RateLimited { .. } | GatewayError::Transient(_)
        )
    }
}

fn retry_hint(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(secs) => format!(", retry after {}s", secs),
        None => String::new(),
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::InvalidResponse(e.to_string())
        } else {
            GatewayError::Transient(e.to_string())
        }
    }
}
