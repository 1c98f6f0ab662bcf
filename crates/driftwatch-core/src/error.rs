//! Error types for driftwatch.
//!
//! Taxonomy: [`Error::InvalidSample`] is a validation failure surfaced to the
//! caller (non-retryable without correction); [`Error::BufferFull`] is the
//! backpressure signal (retryable); [`Error::Storage`] covers persistence
//! failures, which are logged and dropped by the ingestion loop rather than
//! propagated.

use thiserror::Error;

/// Error type for driftwatch operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// Validation failure at the ingest boundary.
    #[error("invalid sample: {0}")]
    InvalidSample(String),

    /// Ingest buffer is at capacity; the caller may retry later.
    #[error("ingest buffer is full")]
    BufferFull,

    /// Ingest buffer was closed for shutdown; no further enqueues.
    #[error("ingest buffer is closed")]
    BufferClosed,

    /// Persistence backend failure.
    #[error("storage operation failed: {0}")]
    Storage(String),

    /// Metrics registration or encoding failure.
    #[error("metrics operation failed: {0}")]
    Metrics(String),

    /// Generic error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Whether the caller can retry the same operation unchanged.
    ///
    /// Only the backpressure signal qualifies; validation failures need a
    /// corrected request and storage failures are handled internally.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::BufferFull)
    }
}

impl From<prometheus::Error> for Error {
    fn from(e: prometheus::Error) -> Self {
        Error::Metrics(e.to_string())
    }
}

/// Result type for driftwatch operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_sample_display() {
        let err = Error::InvalidSample("value must be non-negative".to_string());
        assert_eq!(err.to_string(), "invalid sample: value must be non-negative");
    }

    #[test]
    fn test_buffer_full_display() {
        assert_eq!(Error::BufferFull.to_string(), "ingest buffer is full");
    }

    #[test]
    fn test_storage_display() {
        let err = Error::Storage("connection refused".to_string());
        assert_eq!(
            err.to_string(),
            "storage operation failed: connection refused"
        );
    }

    #[test]
    fn test_only_buffer_full_is_retryable() {
        assert!(Error::BufferFull.is_retryable());
        assert!(!Error::BufferClosed.is_retryable());
        assert!(!Error::InvalidSample("x".to_string()).is_retryable());
        assert!(!Error::Storage("x".to_string()).is_retryable());
    }

    #[test]
    fn test_from_anyhow() {
        let err = Error::from(anyhow::anyhow!("generic failure"));
        assert!(matches!(err, Error::Other(_)));
        assert!(err.to_string().contains("generic failure"));
    }
}
