// Latch - server-side HTTP sessions for Rust
//
// A session is identified by an opaque ID carried in a signed (optionally
// encrypted) cookie; its values live in a cache backend with a TTL.

//! # Latch
//!
//! ```
//! use latch::prelude::*;
//!
//! let store = SessionStore::builder(MemoryCache::new())
//!     .key_pair(KeyPair::generate())
//!     .build()
//!     .unwrap();
//! assert_eq!(store.config().key_prefix, "session:");
//! ```
//!
//! See [`latch_session`] for the session API, [`latch_cookie`] for the cookie
//! codec and, with the `redis` feature, [`latch_redis`] for the Redis client.

// Re-export session functionality
pub use latch_session::*;

// Re-export member crates
pub use latch_cookie;
pub use latch_session;

#[cfg(feature = "redis")]
pub use latch_redis;

/// Re-export commonly used types
pub mod prelude {
    pub use latch_session::prelude::*;

    #[cfg(feature = "redis")]
    pub use latch_redis::RedisConfig;
}
