//! Cache-backed HTTP sessions for latch.
//!
//! A session is identified by an opaque ID carried in a signed (optionally
//! encrypted) cookie. The values themselves live in a cache backend under
//! `key_prefix + id` with a TTL, so the cookie stays small and sessions can
//! be revoked server side.
//!
//! # Pieces
//!
//! - [`SessionStore`] - configuration, cookie codecs and the cache backend
//! - [`SessionRegistry`] - the sessions of one request, keyed by store and name
//! - [`Session`] - typed values, flashes and cookie options for one session
//! - [`CacheBackend`] - [`MemoryCache`], or [`RedisCache`] with the `redis` feature
//! - [`SessionSerializer`] - [`BinarySerializer`] (default) or [`JsonSerializer`]
//!
//! # Features
//!
//! - `redis` - Redis cache backend, single node or cluster (enabled by default)
//! - `tower` - [`SessionLayer`] middleware (enabled by default)
//!
//! # Example
//!
//! ```
//! use http::HeaderMap;
//! use http::header::{COOKIE, SET_COOKIE};
//! use latch_session::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SessionStore::builder(MemoryCache::new())
//!     .key_pair(KeyPair::generate())
//!     .build()?;
//!
//! // First request: no cookie yet.
//! let registry = SessionRegistry::new(HeaderMap::new());
//! let session = registry.get(&store, "sid").await?;
//! assert!(session.is_new());
//!
//! session.set("userId", 42);
//! session.add_flash("Welcome back", None);
//! registry.save(&session).await?;
//!
//! let mut response = HeaderMap::new();
//! registry.apply(&mut response);
//!
//! // Second request: the browser echoes the cookie.
//! let set_cookie = response.get(SET_COOKIE).unwrap().to_str()?;
//! let mut request = HeaderMap::new();
//! request.insert(COOKIE, set_cookie.split(';').next().unwrap().parse()?);
//!
//! let registry = SessionRegistry::new(request);
//! let session = registry.get(&store, "sid").await?;
//! assert!(!session.is_new());
//! assert_eq!(session.get::<i64>("userId")?, Some(42));
//! assert_eq!(session.flashes(None).len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod memory;
pub mod registry;
pub mod serializer;
pub mod session;
pub mod store;
pub mod value;

#[cfg(feature = "redis")]
pub mod redis_cache;

#[cfg(feature = "tower")]
pub mod layer;

pub use backend::CacheBackend;
pub use config::{
    DEFAULT_KEY_PREFIX, DEFAULT_MAX_LENGTH, DEFAULT_TTL, SerializerKind, SessionConfig,
};
pub use error::{SessionError, SessionResult};
pub use memory::MemoryCache;
pub use registry::SessionRegistry;
pub use serializer::{BinarySerializer, JsonSerializer, SessionSerializer};
pub use session::{DEFAULT_FLASH_KEY, Persist, Session};
pub use store::{SessionStore, SessionStoreBuilder, StoreId, generate_session_id};
pub use value::{FromSessionValue, SessionKey, SessionValue, SessionValues};

pub use latch_cookie::{CookieOptions, KeyPair, SameSite};

#[cfg(feature = "redis")]
pub use redis_cache::RedisCache;

#[cfg(feature = "tower")]
pub use layer::{SessionLayer, SessionService};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::backend::CacheBackend;
    pub use crate::config::{SerializerKind, SessionConfig};
    pub use crate::error::{SessionError, SessionResult};
    pub use crate::memory::MemoryCache;
    pub use crate::registry::SessionRegistry;
    pub use crate::session::Session;
    pub use crate::store::SessionStore;
    pub use crate::value::{SessionKey, SessionValue};
    pub use latch_cookie::{CookieOptions, KeyPair, SameSite};

    #[cfg(feature = "redis")]
    pub use crate::redis_cache::RedisCache;

    #[cfg(feature = "tower")]
    pub use crate::layer::SessionLayer;
}
