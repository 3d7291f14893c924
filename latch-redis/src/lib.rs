//! # Latch Redis
//!
//! Redis client used as the shared session cache.
//!
//! ## Features
//!
//! - **Connection Pooling**: bb8 pool for a single Redis node
//! - **Cluster Support**: Redis Cluster through seed nodes
//! - **Timeouts**: every command is bounded by `command_timeout`
//! - **Startup Check**: construction fails unless the server answers `PING`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use latch_redis::{RedisConfig, RedisService};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RedisConfig::new("redis://localhost:6379").with_pool_size(10);
//!
//!     let redis = RedisService::new(config).await?;
//!
//!     redis.set_ex("session:ABC", b"payload", Duration::from_secs(3600)).await?;
//!     let payload = redis.get("session:ABC").await?;
//!     redis.del(&["session:ABC".to_string()]).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## From the Environment
//!
//! ```rust,ignore
//! // REDIS_MODE=cluster REDIS_CLUSTER_NODES=redis://a:7000,redis://b:7001
//! let redis = RedisService::new(RedisConfig::from_env()?).await?;
//! ```

mod config;
mod error;
mod pool;
mod service;

pub use config::{RedisConfig, RedisMode};
pub use error::{RedisError, Result};
pub use pool::{RedisPool, connect_cluster, connect_single};
pub use service::RedisService;

// Re-export redis crate for convenience
pub use redis;

/// Prelude for common imports.
///
/// ```
/// use latch_redis::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{RedisConfig, RedisMode};
    pub use crate::error::{RedisError, Result};
    pub use crate::service::RedisService;
}
