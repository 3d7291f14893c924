//! # Latch Secure Cookies
//!
//! Tamper-evident cookie values for carrying an opaque session identifier.
//!
//! ## Features
//!
//! - ✅ **Signed Values** - HMAC-SHA256 over name, timestamp and payload
//! - ✅ **Optional Encryption** - AES-GCM with a random nonce per value
//! - ✅ **Key Rotation** - Encode with the newest key, decode with any
//! - ✅ **Expiry** - Embedded creation timestamp checked against a max age
//! - ✅ **Set-Cookie Rendering** - Path, Domain, Max-Age, Secure, HttpOnly, SameSite
//!
//! ## Quick Start
//!
//! ```rust
//! use latch_cookie::{SecureCookie, generate_random_key};
//!
//! let codec = SecureCookie::new(generate_random_key(64), None).unwrap();
//!
//! let value = codec.encode("sid", "4ZKQ2M").unwrap();
//! assert_eq!(codec.decode("sid", &value).unwrap(), b"4ZKQ2M");
//!
//! // A value minted for one cookie name is rejected under another.
//! assert!(codec.decode("other", &value).is_err());
//! ```
//!
//! ## Key Rotation
//!
//! ```rust
//! use latch_cookie::{KeyPair, codecs_from_pairs, decode_multi, encode_multi};
//!
//! let old = KeyPair::signing("old-signing-key");
//! let new = KeyPair::generate();
//!
//! // Cookie minted before the rotation.
//! let before = encode_multi("sid", "ID1", &codecs_from_pairs([old.clone()]).unwrap()).unwrap();
//!
//! // After deploying `[new, old]` both old and new cookies are accepted.
//! let codecs = codecs_from_pairs([new, old]).unwrap();
//! assert_eq!(decode_multi("sid", &before, &codecs).unwrap(), b"ID1");
//!
//! let after = encode_multi("sid", "ID2", &codecs).unwrap();
//! assert_eq!(decode_multi("sid", &after, &codecs).unwrap(), b"ID2");
//! ```
//!
//! ## Response Cookies
//!
//! ```rust
//! use latch_cookie::{CookieOptions, SameSite, SessionCookie};
//!
//! let options = CookieOptions::default()
//!     .with_max_age(3600)
//!     .with_secure(true)
//!     .with_same_site(Some(SameSite::Strict));
//!
//! let header = SessionCookie::new("sid", "value", options).to_header_string();
//! assert!(header.contains("Max-Age=3600"));
//! assert!(header.contains("SameSite=Strict"));
//! ```

pub mod cookie;
pub mod error;
pub mod secure_cookie;

pub use cookie::{CookieOptions, SameSite, SessionCookie, find_cookie};
pub use error::{CookieError, Result};
pub use secure_cookie::{
    DEFAULT_MAX_AGE, DEFAULT_MAX_LENGTH, KeyPair, SecureCookie, codecs_from_pairs, decode_multi,
    encode_multi, generate_random_key,
};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cookie::{CookieOptions, SameSite, SessionCookie, find_cookie};
    pub use crate::error::{CookieError, Result};
    pub use crate::secure_cookie::{
        KeyPair, SecureCookie, codecs_from_pairs, decode_multi, encode_multi, generate_random_key,
    };
}
