//! Error types for session operations.

use latch_cookie::CookieError;
use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Session-specific errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Redis-specific error
    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] latch_redis::RedisError),

    /// Any other cache backend failure
    #[error("Cache error: {0}")]
    Cache(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Serialized session exceeds the store's size limit
    #[error("Session too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    /// Stored value does not have the requested type
    #[error("Type mismatch for session key {key}: expected {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Cookie encoding or rendering failed
    #[error("Cookie error: {0}")]
    Cookie(#[from] CookieError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SessionError {
    /// Whether the error came from the cache backend.
    pub fn is_cache_error(&self) -> bool {
        match self {
            #[cfg(feature = "redis")]
            SessionError::Redis(_) => true,
            SessionError::Cache(_) => true,
            _ => false,
        }
    }
}
