//! Redis configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{RedisError, Result};

/// How the client reaches Redis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedisMode {
    /// A single server behind a connection pool.
    #[default]
    #[serde(alias = "singlepoint", alias = "singlePoint")]
    Single,
    /// A Redis Cluster, addressed through its seed nodes.
    Cluster,
}

impl RedisMode {
    /// Parse a mode name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "single" | "singlepoint" => Some(Self::Single),
            "cluster" => Some(Self::Cluster),
            _ => None,
        }
    }
}

/// Redis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Server URL, `redis://host:port` or `rediss://host:port` for TLS
    pub url: String,
    /// Maximum pooled connections (single mode)
    pub pool_size: u32,
    /// Idle connections kept open (single mode)
    pub min_idle: Option<u32>,
    /// Time allowed to establish a connection
    #[serde(with = "secs")]
    pub connection_timeout: Duration,
    /// Time allowed for one command round trip
    #[serde(with = "secs")]
    pub command_timeout: Duration,
    /// Database index; ignored in cluster mode
    pub database: Option<u8>,
    /// ACL user (Redis 6+)
    pub username: Option<String>,
    pub password: Option<String>,
    /// Single node or cluster
    pub mode: RedisMode,
    /// Seed nodes for cluster mode
    pub cluster_nodes: Vec<String>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            pool_size: 10,
            min_idle: Some(1),
            connection_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(3),
            database: None,
            username: None,
            password: None,
            mode: RedisMode::Single,
            cluster_nodes: Vec::new(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Result<Option<T>> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| RedisError::Config(format!("invalid {}: {}", var, raw))),
        Err(_) => Ok(None),
    }
}

impl RedisConfig {
    /// Single-node configuration for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Cluster configuration over the given seed nodes.
    pub fn cluster<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::default().with_cluster_nodes(nodes)
    }

    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// Reads `REDIS_URL`, `REDIS_POOL_SIZE`, `REDIS_DATABASE`,
    /// `REDIS_USERNAME`, `REDIS_PASSWORD`, `REDIS_MODE` and
    /// `REDIS_CLUSTER_NODES` (comma separated).
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("REDIS_URL") {
            config.url = url;
        }
        if let Some(size) = env_parse("REDIS_POOL_SIZE")? {
            config.pool_size = size;
        }
        if let Some(db) = env_parse("REDIS_DATABASE")? {
            config.database = Some(db);
        }
        config.username = std::env::var("REDIS_USERNAME").ok();
        config.password = std::env::var("REDIS_PASSWORD").ok();

        if let Ok(nodes) = std::env::var("REDIS_CLUSTER_NODES") {
            config = config.with_cluster_nodes(nodes.split(',').map(str::trim).filter(|s| !s.is_empty()));
        }
        if let Ok(mode) = std::env::var("REDIS_MODE") {
            config.mode = RedisMode::parse(&mode)
                .ok_or_else(|| RedisError::Config(format!("unknown REDIS_MODE: {}", mode)))?;
        }

        Ok(config)
    }

    /// Set the pool size.
    pub fn with_pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    /// Set the connect timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Set the per-command timeout.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Select a database index.
    pub fn with_database(mut self, db: u8) -> Self {
        self.database = Some(db);
        self
    }

    /// Set credentials; `username` is only sent to Redis 6+ ACL servers.
    pub fn with_auth(mut self, username: Option<&str>, password: impl Into<String>) -> Self {
        self.username = username.map(str::to_string);
        self.password = Some(password.into());
        self
    }

    /// Set the connection mode.
    pub fn with_mode(mut self, mode: RedisMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set cluster seed nodes; switches to cluster mode.
    pub fn with_cluster_nodes<I, S>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cluster_nodes = nodes.into_iter().map(Into::into).collect();
        self.mode = RedisMode::Cluster;
        self
    }

    /// Check the configuration for contradictions before connecting.
    pub fn validate(&self) -> Result<()> {
        let bad_scheme = |url: &str| !(url.starts_with("redis://") || url.starts_with("rediss://"));

        match self.mode {
            RedisMode::Single if bad_scheme(&self.url) => Err(RedisError::Config(format!(
                "URL {} must start with redis:// or rediss://",
                self.url
            ))),
            RedisMode::Single if self.pool_size == 0 => {
                Err(RedisError::Config("pool_size must be at least 1".to_string()))
            }
            RedisMode::Cluster if self.cluster_nodes.is_empty() => Err(RedisError::Config(
                "cluster mode requires at least one node".to_string(),
            )),
            RedisMode::Cluster => match self.cluster_nodes.iter().find(|n| bad_scheme(n)) {
                Some(node) => Err(RedisError::Config(format!(
                    "URL {} must start with redis:// or rediss://",
                    node
                ))),
                None => Ok(()),
            },
            RedisMode::Single => Ok(()),
        }
    }

    /// Single-node URL with credentials and database applied.
    ///
    /// Credentials or a database already present in `url` win.
    pub fn connection_url(&self) -> String {
        let Some((scheme, rest)) = self.url.split_once("://") else {
            return self.url.clone();
        };

        let auth = match (&self.username, &self.password) {
            _ if rest.contains('@') => String::new(),
            (Some(user), Some(pass)) => format!("{}:{}@", user, pass),
            (None, Some(pass)) => format!(":{}@", pass),
            _ => String::new(),
        };

        let db = match self.database {
            Some(db) if !rest.contains('/') => format!("/{}", db),
            _ => String::new(),
        };

        format!("{}://{}{}{}", scheme, auth, rest, db)
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RedisConfig::default();
        assert_eq!(config.url, "redis://localhost:6379");
        assert_eq!(config.mode, RedisMode::Single);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_connection_url_with_password() {
        let config = RedisConfig::new("redis://cache:6379")
            .with_auth(None, "hunter2")
            .with_database(2);
        assert_eq!(config.connection_url(), "redis://:hunter2@cache:6379/2");
    }

    #[test]
    fn test_connection_url_with_acl_user() {
        let config = RedisConfig::new("rediss://cache:6380").with_auth(Some("app"), "pw");
        assert_eq!(config.connection_url(), "rediss://app:pw@cache:6380");
    }

    #[test]
    fn test_connection_url_keeps_url_settings() {
        let config = RedisConfig::new("redis://u:p@cache:6379/5")
            .with_auth(None, "other")
            .with_database(2);
        assert_eq!(config.connection_url(), "redis://u:p@cache:6379/5");
    }

    #[test]
    fn test_cluster_nodes_switch_mode() {
        let config = RedisConfig::cluster(["redis://a:7000", "redis://b:7001"]);
        assert_eq!(config.mode, RedisMode::Cluster);
        assert_eq!(config.cluster_nodes.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_config() {
        let config = RedisConfig::new("http://localhost");
        assert!(matches!(config.validate(), Err(RedisError::Config(_))));

        let config = RedisConfig::default().with_mode(RedisMode::Cluster);
        assert!(matches!(config.validate(), Err(RedisError::Config(_))));

        let config = RedisConfig::cluster(["tcp://a:7000"]);
        assert!(config.validate().is_err());

        let config = RedisConfig::default().with_pool_size(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(RedisMode::parse("singlePoint"), Some(RedisMode::Single));
        assert_eq!(RedisMode::parse("CLUSTER"), Some(RedisMode::Cluster));
        assert_eq!(RedisMode::parse("sentinel"), None);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: RedisConfig = serde_json::from_str(
            r#"{
                "url": "redis://cache:6379",
                "pool_size": 4,
                "command_timeout": 2,
                "mode": "singlePoint"
            }"#,
        )
        .unwrap();
        assert_eq!(config.pool_size, 4);
        assert_eq!(config.command_timeout, Duration::from_secs(2));
        assert_eq!(config.connection_timeout, Duration::from_secs(5));
        assert_eq!(config.min_idle, Some(1));
        assert_eq!(config.mode, RedisMode::Single);
    }
}
