//! Cache backend trait definition.

use crate::error::SessionResult;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Key/value cache that holds serialized sessions.
///
/// Stores talk to the cache only through this trait, so a deployment can
/// swap the in-memory cache for Redis (single node or cluster) without
/// touching session code. Implementations must be safe to share between
/// concurrent requests.
///
/// # Examples
///
/// ```
/// use latch_session::{CacheBackend, MemoryCache};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let cache = MemoryCache::new();
/// cache.set("session:ABC", b"payload", Duration::from_secs(60)).await.unwrap();
/// assert_eq!(cache.get("session:ABC").await.unwrap(), Some(b"payload".to_vec()));
///
/// cache.del(&["session:ABC".to_string()]).await.unwrap();
/// assert_eq!(cache.get("session:ABC").await.unwrap(), None);
/// # }
/// ```
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Check that the cache answers.
    async fn ping(&self) -> SessionResult<()>;

    /// Store `value` under `key`, expiring after `ttl`.
    ///
    /// # Arguments
    ///
    /// * `key` - Full cache key (prefix included)
    /// * `value` - Serialized session
    /// * `ttl` - Time to live; implementations round up to whole seconds
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> SessionResult<()>;

    /// Fetch the value stored under `key`.
    ///
    /// # Returns
    ///
    /// Returns `Ok(None)` if the key is absent or expired.
    async fn get(&self, key: &str) -> SessionResult<Option<Vec<u8>>>;

    /// Delete keys. Missing keys are not an error.
    async fn del(&self, keys: &[String]) -> SessionResult<()>;
}

#[async_trait]
impl<T: CacheBackend + ?Sized> CacheBackend for Arc<T> {
    async fn ping(&self) -> SessionResult<()> {
        (**self).ping().await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> SessionResult<()> {
        (**self).set(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> SessionResult<Option<Vec<u8>>> {
        (**self).get(key).await
    }

    async fn del(&self, keys: &[String]) -> SessionResult<()> {
        (**self).del(keys).await
    }
}
