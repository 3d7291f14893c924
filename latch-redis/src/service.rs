//! Redis service shared by every request.

use redis::cluster_async::ClusterConnection;
use redis::FromRedisValue;
use std::time::Duration;
use tracing::debug;

use crate::{
    config::RedisMode,
    pool::{RedisPool, connect_cluster, connect_single},
    RedisConfig, RedisError, Result,
};

enum Backend {
    Single(RedisPool),
    Cluster(ClusterConnection),
}

/// Redis service providing the handful of commands session storage needs.
///
/// Safe for concurrent use: single-node mode checks connections out of a
/// bb8 pool per command, cluster mode clones a multiplexed cluster handle.
pub struct RedisService {
    config: RedisConfig,
    backend: Backend,
}

impl RedisService {
    /// Connect according to `config.mode` and verify the server answers.
    pub async fn new(config: RedisConfig) -> Result<Self> {
        config.validate()?;

        let backend = match config.mode {
            RedisMode::Single => Backend::Single(connect_single(&config).await?),
            RedisMode::Cluster => Backend::Cluster(connect_cluster(&config).await?),
        };

        Ok(Self { config, backend })
    }

    /// Get the configuration.
    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    /// Run one command with the configured command timeout.
    async fn query<T: FromRedisValue>(&self, cmd: &redis::Cmd) -> Result<T> {
        let run = async {
            let value: T = match &self.backend {
                Backend::Single(pool) => {
                    let mut conn = pool.get().await?;
                    cmd.query_async(&mut *conn).await?
                }
                Backend::Cluster(conn) => {
                    let mut conn = conn.clone();
                    cmd.query_async(&mut conn).await?
                }
            };
            Ok::<T, RedisError>(value)
        };

        tokio::time::timeout(self.config.command_timeout, run)
            .await
            .map_err(|_| RedisError::Timeout)?
    }

    /// Check if the connection is healthy.
    pub async fn ping(&self) -> Result<()> {
        let reply: String = self.query(&redis::cmd("PING")).await?;
        if reply != "PONG" {
            return Err(RedisError::Command(format!("unexpected PING reply: {}", reply)));
        }
        Ok(())
    }

    /// Get the raw bytes stored at `key`.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.query(&cmd).await
    }

    /// Store `value` at `key` with an expiration.
    pub async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("EX").arg(ttl.as_secs().max(1));
        let reply: String = self.query(&cmd).await?;
        if reply != "OK" {
            return Err(RedisError::Command(format!("unexpected SET reply: {}", reply)));
        }
        Ok(())
    }

    /// Delete keys, returning how many existed.
    pub async fn del(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }

        let deleted: u64 = match &self.backend {
            // Cluster DEL must not span hash slots.
            Backend::Cluster(_) => {
                let mut total = 0;
                for key in keys {
                    let mut cmd = redis::cmd("DEL");
                    cmd.arg(key);
                    total += self.query::<u64>(&cmd).await?;
                }
                total
            }
            Backend::Single(_) => {
                let mut cmd = redis::cmd("DEL");
                cmd.arg(keys);
                self.query(&cmd).await?
            }
        };

        debug!(requested = keys.len(), deleted, "Redis DEL");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_basic_operations() {
        let config = RedisConfig::new("redis://localhost:6379");

        let redis = RedisService::new(config).await.unwrap();
        redis.ping().await.unwrap();

        redis
            .set_ex("latch:test_key", b"test_value", Duration::from_secs(30))
            .await
            .unwrap();
        let value = redis.get("latch:test_key").await.unwrap();
        assert_eq!(value.as_deref(), Some(&b"test_value"[..]));

        assert_eq!(redis.del(&["latch:test_key".to_string()]).await.unwrap(), 1);
        assert_eq!(redis.get("latch:test_key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_connecting() {
        let config = RedisConfig::new("http://localhost:6379");
        assert!(matches!(
            RedisService::new(config).await,
            Err(RedisError::Config(_))
        ));
    }
}
