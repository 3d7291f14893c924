//! Connection setup: a bb8 pool for a single node, or a cluster connection.
//!
//! Both constructors issue a `PING` and fail if it is not answered.

use bb8::Pool;
use bb8_redis::RedisConnectionManager;
use redis::cluster::ClusterClientBuilder;
use redis::cluster_async::ClusterConnection;
use tracing::info;

use crate::{RedisConfig, RedisError, Result};

/// Pooled single-node connections.
pub type RedisPool = Pool<RedisConnectionManager>;

/// Build a connection pool for a single Redis node.
pub async fn connect_single(config: &RedisConfig) -> Result<RedisPool> {
    let manager = RedisConnectionManager::new(config.connection_url())
        .map_err(|e| RedisError::Config(e.to_string()))?;

    let pool = Pool::builder()
        .max_size(config.pool_size)
        .min_idle(config.min_idle)
        .connection_timeout(config.connection_timeout)
        .build(manager)
        .await
        .map_err(|e| RedisError::Connection(e.to_string()))?;

    let reply: String = {
        let mut conn = pool.get().await?;
        redis::cmd("PING").query_async(&mut *conn).await?
    };
    if reply != "PONG" {
        return Err(RedisError::Connection(format!("unexpected PING reply: {}", reply)));
    }

    info!(
        url = %config.url,
        pool_size = config.pool_size,
        "Connected to Redis"
    );
    Ok(pool)
}

/// Connect to a Redis Cluster through the configured seed nodes.
pub async fn connect_cluster(config: &RedisConfig) -> Result<ClusterConnection> {
    let mut builder = ClusterClientBuilder::new(config.cluster_nodes.clone());
    if let Some(username) = &config.username {
        builder = builder.username(username.clone());
    }
    if let Some(password) = &config.password {
        builder = builder.password(password.clone());
    }
    let client = builder
        .build()
        .map_err(|e| RedisError::Config(e.to_string()))?;

    let mut conn = tokio::time::timeout(config.connection_timeout, client.get_async_connection())
        .await
        .map_err(|_| RedisError::Timeout)?
        .map_err(|e| RedisError::Connection(e.to_string()))?;

    let _: String = redis::cmd("PING").query_async(&mut conn).await?;

    info!(nodes = config.cluster_nodes.len(), "Connected to Redis cluster");
    Ok(conn)
}
