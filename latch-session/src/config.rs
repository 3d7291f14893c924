//! Session configuration.

use crate::error::{SessionError, SessionResult};
use crate::serializer::{BinarySerializer, JsonSerializer, SessionSerializer};
use latch_cookie::{CookieOptions, DEFAULT_MAX_AGE};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default cache key prefix.
pub const DEFAULT_KEY_PREFIX: &str = "session:";

/// Default session TTL (one day).
pub const DEFAULT_TTL: Duration = Duration::from_secs(86400);

/// Default limit on the serialized session size, in bytes.
pub const DEFAULT_MAX_LENGTH: usize = 4096;

/// Which serializer a store writes session values with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializerKind {
    /// JSON text; string keys only.
    Json,
    /// Compact binary (postcard).
    #[default]
    Binary,
}

impl SerializerKind {
    /// Parse a serializer name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "binary" | "postcard" => Some(Self::Binary),
            _ => None,
        }
    }

    /// Instantiate the serializer.
    pub fn build(self) -> Arc<dyn SessionSerializer> {
        match self {
            Self::Json => Arc::new(JsonSerializer),
            Self::Binary => Arc::new(BinarySerializer),
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Prefix prepended to session ids to form cache keys
    pub key_prefix: String,
    /// TTL for sessions whose cookie carries no explicit max age
    #[serde(with = "duration_secs")]
    pub default_ttl: Duration,
    /// Maximum serialized size in bytes; 0 disables the check
    pub max_length: usize,
    /// Maximum cookie age accepted by the codecs; defaults to `default_ttl`
    #[serde(with = "option_duration_secs")]
    pub codec_max_age: Option<Duration>,
    /// Template for new session cookies
    pub cookie: CookieOptions,
    /// Serializer for session values
    pub serializer: SerializerKind,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            default_ttl: DEFAULT_TTL,
            max_length: DEFAULT_MAX_LENGTH,
            codec_max_age: None,
            cookie: CookieOptions::default(),
            serializer: SerializerKind::default(),
        }
    }
}

impl SessionConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// Reads `SESSION_KEY_PREFIX`, `SESSION_MAX_AGE` (seconds),
    /// `SESSION_MAX_LENGTH`, `SESSION_COOKIE_PATH`, `SESSION_COOKIE_DOMAIN`,
    /// `SESSION_COOKIE_SECURE` and `SESSION_SERIALIZER`.
    pub fn from_env() -> SessionResult<Self> {
        let mut config = Self::default();

        if let Ok(prefix) = std::env::var("SESSION_KEY_PREFIX") {
            config.key_prefix = prefix;
        }

        if let Ok(max_age) = std::env::var("SESSION_MAX_AGE") {
            let secs: u64 = max_age
                .parse()
                .map_err(|_| SessionError::Config(format!("invalid SESSION_MAX_AGE: {}", max_age)))?;
            config.default_ttl = Duration::from_secs(secs);
        }

        if let Ok(max_length) = std::env::var("SESSION_MAX_LENGTH") {
            config.max_length = max_length.parse().map_err(|_| {
                SessionError::Config(format!("invalid SESSION_MAX_LENGTH: {}", max_length))
            })?;
        }

        if let Ok(path) = std::env::var("SESSION_COOKIE_PATH") {
            config.cookie.path = path;
        }

        if let Ok(domain) = std::env::var("SESSION_COOKIE_DOMAIN") {
            config.cookie.domain = Some(domain);
        }

        if let Ok(secure) = std::env::var("SESSION_COOKIE_SECURE") {
            config.cookie.secure = matches!(secure.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        if let Ok(name) = std::env::var("SESSION_SERIALIZER") {
            config.serializer = SerializerKind::parse(&name).ok_or_else(|| {
                SessionError::Config(format!("unknown SESSION_SERIALIZER: {}", name))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the cache key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the default TTL.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Set the maximum serialized size (0 = unlimited).
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Set the maximum cookie age accepted by the codecs.
    pub fn with_codec_max_age(mut self, max_age: Duration) -> Self {
        self.codec_max_age = Some(max_age);
        self
    }

    /// Set the cookie template.
    pub fn with_cookie(mut self, cookie: CookieOptions) -> Self {
        self.cookie = cookie;
        self
    }

    /// Set the serializer.
    pub fn with_serializer(mut self, serializer: SerializerKind) -> Self {
        self.serializer = serializer;
        self
    }

    /// Build the cache key for a session ID.
    pub fn session_key(&self, session_id: &str) -> String {
        format!("{}{}", self.key_prefix, session_id)
    }

    /// Default TTL in whole seconds, as used for cookie `Max-Age`.
    pub fn default_max_age(&self) -> i64 {
        i64::try_from(self.default_ttl.as_secs()).unwrap_or(i64::MAX)
    }

    /// Maximum cookie age the codecs accept, in seconds.
    ///
    /// Without an explicit `codec_max_age` this is the larger of
    /// [`DEFAULT_MAX_AGE`] and the default TTL.
    pub fn effective_codec_max_age(&self) -> i64 {
        match self.codec_max_age {
            Some(age) => i64::try_from(age.as_secs()).unwrap_or(i64::MAX),
            None => self.default_max_age().max(DEFAULT_MAX_AGE),
        }
    }

    /// Check the configuration before building a store.
    pub fn validate(&self) -> SessionResult<()> {
        if self.default_ttl.as_secs() == 0 {
            return Err(SessionError::Config(
                "default_ttl must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}

mod duration_secs {
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

mod option_duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.map(|d| d.as_secs()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_secs))
    }
}
