//! Mastery store error types.
//!
//! Defined in `mathtutor-core` so that `update_mastery` can hand store
//! failures back to callers unchanged, whichever backend produced them.

use thiserror::Error;

/// Errors that can occur when reading or writing mastery records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected the credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The table or RPC function does not exist on the backend.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// The backend returned an error response.
    #[error("store API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// Local persistence failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = StoreError::RateLimited {
            retry_after_ms: 3000,
        };
        assert_eq!(err.to_string(), "rate limited, retry after 3000ms");

        let err = StoreError::Api {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "store API error (HTTP 500): boom");
    }

    #[test]
    fn json_errors_become_serialization() {
        let err = serde_json::from_str::<u32>("nope").unwrap_err();
        let store_err: StoreError = err.into();
        assert!(matches!(store_err, StoreError::Serialization(_)));
    }
}
