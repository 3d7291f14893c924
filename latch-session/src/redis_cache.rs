//! Redis cache backend.

use crate::backend::CacheBackend;
use crate::error::SessionResult;
use async_trait::async_trait;
use latch_redis::{RedisConfig, RedisService};
use std::sync::Arc;
use std::time::Duration;

/// Redis-backed session cache.
///
/// Works against a single node or a cluster depending on
/// [`RedisConfig::mode`]; the session layer does not see the difference.
///
/// # Examples
///
/// ```no_run
/// use latch_redis::RedisConfig;
/// use latch_session::{KeyPair, RedisCache, SessionStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let cache = RedisCache::connect(RedisConfig::from_env()?).await?;
///
/// let store = SessionStore::builder(cache)
///     .key_pair(KeyPair::signing("change-me"))
///     .build()?;
/// store.ping().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisCache {
    redis: Arc<RedisService>,
}

impl RedisCache {
    /// Connect with the given configuration.
    ///
    /// Fails if the server (or any cluster seed) does not answer a PING.
    pub async fn connect(config: RedisConfig) -> SessionResult<Self> {
        let redis = RedisService::new(config).await?;
        Ok(Self::new(Arc::new(redis)))
    }

    /// Wrap an existing service, sharing its connections.
    pub fn new(redis: Arc<RedisService>) -> Self {
        Self { redis }
    }

    /// Get the underlying service.
    pub fn service(&self) -> &Arc<RedisService> {
        &self.redis
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn ping(&self) -> SessionResult<()> {
        Ok(self.redis.ping().await?)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> SessionResult<()> {
        Ok(self.redis.set_ex(key, value, ttl).await?)
    }

    async fn get(&self, key: &str) -> SessionResult<Option<Vec<u8>>> {
        Ok(self.redis.get(key).await?)
    }

    async fn del(&self, keys: &[String]) -> SessionResult<()> {
        self.redis.del(keys).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;

    #[tokio::test]
    async fn test_connect_rejects_invalid_config() {
        let result = RedisCache::connect(RedisConfig::new("http://localhost:6379")).await;
        assert!(matches!(result, Err(SessionError::Redis(_))));
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_backend_operations() {
        let cache = RedisCache::connect(RedisConfig::default()).await.unwrap();
        cache.ping().await.unwrap();

        let key = "latch:test:redis-cache".to_string();
        cache.set(&key, b"payload", Duration::from_secs(30)).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), Some(b"payload".to_vec()));

        cache.del(std::slice::from_ref(&key)).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), None);

        // Deleting again is not an error.
        cache.del(&[key]).await.unwrap();
    }
}
