//! Error types for cache operations

use thiserror::Error;

/// Main error type for all cache operations
///
/// Cloneable so that a single coalesced outcome can be handed to every
/// waiting caller and kept inside negative cache entries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The value provider reported a failure
    #[error("provider error: {0}")]
    Provider(String),

    /// The key cannot be turned into a cache key
    #[error("invalid cache key: {0}")]
    InvalidKey(String),

    /// No value is available yet, an update is running in the background
    #[error("value not ready")]
    NotReady,

    /// Serialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Backend connection failed
    #[error("connection error: {0}")]
    Connection(String),

    /// Backend operation failed
    #[error("backend error: {0}")]
    Backend(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),

    /// Timeout
    #[error("operation timed out")]
    Timeout,
}

impl CacheError {
    /// Build a provider error from anything printable
    pub fn provider(err: impl std::fmt::Display) -> Self {
        CacheError::Provider(err.to_string())
    }

    /// Whether the error came from a backend rather than from the caller's data
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            CacheError::Connection(_)
                | CacheError::Backend(_)
                | CacheError::Timeout
                | CacheError::Internal(_)
        )
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
