//! Redis error types.

use thiserror::Error;

/// Result type for Redis operations.
pub type Result<T> = std::result::Result<T, RedisError>;

/// Failures talking to, or configuring, the Redis cache.
#[derive(Debug, Error)]
pub enum RedisError {
    /// The server could not be reached or did not answer `PING`.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A pooled connection could not be checked out.
    #[error("Pool error: {0}")]
    Pool(String),

    #[error("Command error: {0}")]
    Command(String),

    /// Invalid [`RedisConfig`](crate::RedisConfig) or environment.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connect or command timeout elapsed.
    #[error("Operation timed out")]
    Timeout,

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl RedisError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout | Self::Pool(_) => true,
            Self::Redis(e) => e.is_timeout() || e.is_connection_dropped() || e.is_io_error(),
            _ => false,
        }
    }

    /// Check if this error indicates connection loss.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Redis(e) => e.is_connection_dropped() || e.is_connection_refusal(),
            _ => false,
        }
    }
}

impl<E> From<bb8::RunError<E>> for RedisError
where
    E: std::error::Error + 'static,
{
    fn from(err: bb8::RunError<E>) -> Self {
        match err {
            bb8::RunError::TimedOut => Self::Timeout,
            bb8::RunError::User(e) => Self::Pool(e.to_string()),
        }
    }
}
