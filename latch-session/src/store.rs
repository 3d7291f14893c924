//! Cache-backed session store.

use crate::backend::CacheBackend;
use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::registry::SessionRegistry;
use crate::serializer::SessionSerializer;
use crate::session::{Persist, Session};
use async_trait::async_trait;
use data_encoding::BASE32_NOPAD;
use http::HeaderMap;
use latch_cookie::{
    CookieOptions, KeyPair, SecureCookie, SessionCookie, codecs_from_pairs, decode_multi,
    encode_multi, find_cookie, generate_random_key,
};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`SessionStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreId(u64);

impl StoreId {
    fn next() -> Self {
        Self(NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Generate a new session ID: 32 random bytes, base32 without padding.
pub fn generate_session_id() -> String {
    BASE32_NOPAD.encode(&generate_random_key(32))
}

struct Inner {
    id: StoreId,
    backend: Arc<dyn CacheBackend>,
    codecs: Arc<[SecureCookie]>,
    serializer: Arc<dyn SessionSerializer>,
    config: SessionConfig,
}

/// Session store holding configuration only.
///
/// Sessions are loaded from the cookie named after the session and kept in
/// the injected [`CacheBackend`] under `key_prefix + id`. The store keeps no
/// per-session state and is cheap to clone.
///
/// # Examples
///
/// ```
/// use http::HeaderMap;
/// use latch_session::{KeyPair, MemoryCache, SessionStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = SessionStore::builder(MemoryCache::new())
///     .key_pair(KeyPair::generate())
///     .build()?;
///
/// let session = store.new_session(&HeaderMap::new(), "sid").await?;
/// assert!(session.is_new());
///
/// session.set("userId", 42);
/// let mut response = HeaderMap::new();
/// session.save(&mut response).await?;
/// assert!(response.contains_key("set-cookie"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl SessionStore {
    /// Start building a store over `backend`.
    pub fn builder(backend: impl CacheBackend + 'static) -> SessionStoreBuilder {
        SessionStoreBuilder::new(Arc::new(backend))
    }

    /// Identity used by the registry.
    pub fn id(&self) -> StoreId {
        self.inner.id
    }

    /// Get the configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Cookie codecs, newest key first.
    pub fn codecs(&self) -> &[SecureCookie] {
        &self.inner.codecs
    }

    /// Cache key for a session ID.
    pub fn session_key(&self, session_id: &str) -> String {
        self.inner.config.session_key(session_id)
    }

    /// Check that the cache backend answers.
    pub async fn ping(&self) -> SessionResult<()> {
        self.inner.backend.ping().await
    }

    /// Get the session `name` for the request behind `registry`.
    pub async fn get(&self, registry: &SessionRegistry, name: &str) -> SessionResult<Session> {
        registry.get(self, name).await
    }

    /// Load the session `name` from the request cookies.
    ///
    /// A missing, tampered or expired cookie yields a fresh session. A cookie
    /// whose session is no longer cached yields empty values but keeps the ID.
    /// Backend failures and corrupt payloads are returned as errors.
    pub async fn new_session(&self, request: &HeaderMap, name: &str) -> SessionResult<Session> {
        let session = self.fresh_session(name);

        let Some(raw) = find_cookie(request, name) else {
            return Ok(session);
        };

        let id = match decode_multi(name, &raw, &self.inner.codecs) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(id) if !id.is_empty() => id,
                _ => {
                    debug!(cookie = name, "Session cookie carried an invalid ID");
                    return Ok(session);
                }
            },
            Err(e) => {
                debug!(cookie = name, error = %e, expired = e.is_expired(), "Rejected session cookie");
                return Ok(session);
            }
        };

        let data = self.inner.backend.get(&self.session_key(&id)).await?;

        let mut state = session.state();
        state.id = id;
        match data {
            Some(bytes) => {
                self.inner.serializer.deserialize(&bytes, &mut state.values)?;
                state.is_new = false;
            }
            None => debug!(cookie = name, "Session not found in cache"),
        }
        drop(state);

        Ok(session)
    }

    /// Save `session`, appending its `Set-Cookie` to `response`.
    pub async fn save(&self, session: &Session, response: &mut HeaderMap) -> SessionResult<()> {
        self.inner.save(session, response).await
    }

    /// Delete `session` from the cache and expire its cookie.
    pub async fn delete(&self, session: &Session, response: &mut HeaderMap) -> SessionResult<()> {
        self.inner.delete(session, response).await
    }

    /// A new, empty session bound to this store.
    pub(crate) fn fresh_session(&self, name: &str) -> Session {
        let options = self
            .inner
            .config
            .cookie
            .clone()
            .with_max_age(self.inner.config.default_max_age());
        Session::new(name, options, self.inner.clone())
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("id", &self.inner.id)
            .field("codecs", &self.inner.codecs.len())
            .field("serializer", &self.inner.serializer.name())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl Inner {
    fn session_key(&self, id: &str) -> String {
        self.config.session_key(id)
    }

    fn ttl_for(&self, max_age: i64) -> Duration {
        if max_age > 0 {
            Duration::from_secs(max_age as u64)
        } else {
            self.config.default_ttl
        }
    }

    async fn remove(&self, session: &Session, response: &mut HeaderMap) -> SessionResult<()> {
        let (id, options) = {
            let state = session.state();
            (state.id.clone(), state.options.clone())
        };

        if !id.is_empty() {
            self.backend.del(&[self.session_key(&id)]).await?;
        }
        SessionCookie::removal(session.name(), &options).append_to(response)?;

        let mut state = session.state();
        state.id.clear();
        state.values.clear();
        state.is_new = true;
        state.dirty = false;
        Ok(())
    }
}

#[async_trait]
impl Persist for Inner {
    async fn save(&self, session: &Session, response: &mut HeaderMap) -> SessionResult<()> {
        let (id, options, payload) = {
            let state = session.state();
            if !state.dirty {
                return Ok(());
            }
            if state.options.max_age <= 0 {
                (state.id.clone(), state.options.clone(), None)
            } else {
                let payload = self.serializer.serialize(&state.values)?;
                (state.id.clone(), state.options.clone(), Some(payload))
            }
        };

        let Some(payload) = payload else {
            debug!(cookie = session.name(), "Deleting session with non-positive max age");
            return self.remove(session, response).await;
        };

        let max = self.config.max_length;
        if max != 0 && payload.len() > max {
            return Err(SessionError::TooLarge {
                size: payload.len(),
                max,
            });
        }

        let id = if id.is_empty() { generate_session_id() } else { id };
        let value = encode_multi(session.name(), &id, &self.codecs)?;
        let cookie = SessionCookie::new(session.name(), value, options.clone());

        self.backend
            .set(&self.session_key(&id), &payload, self.ttl_for(options.max_age))
            .await?;
        cookie.append_to(response)?;

        let mut state = session.state();
        state.id = id;
        state.is_new = false;
        state.dirty = false;
        Ok(())
    }

    async fn delete(&self, session: &Session, response: &mut HeaderMap) -> SessionResult<()> {
        self.remove(session, response).await
    }
}

/// Builder for [`SessionStore`].
pub struct SessionStoreBuilder {
    backend: Arc<dyn CacheBackend>,
    key_pairs: Vec<KeyPair>,
    config: SessionConfig,
    serializer: Option<Arc<dyn SessionSerializer>>,
}

impl SessionStoreBuilder {
    fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            key_pairs: Vec::new(),
            config: SessionConfig::default(),
            serializer: None,
        }
    }

    /// Add a key pair. The first pair signs new cookies; later pairs are
    /// only accepted when decoding.
    pub fn key_pair(mut self, pair: KeyPair) -> Self {
        self.key_pairs.push(pair);
        self
    }

    /// Add several key pairs, newest first.
    pub fn key_pairs(mut self, pairs: impl IntoIterator<Item = KeyPair>) -> Self {
        self.key_pairs.extend(pairs);
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the cache key prefix.
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.key_prefix = prefix.into();
        self
    }

    /// Set the default TTL (and default cookie max age).
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.config.default_ttl = ttl;
        self
    }

    /// Set the maximum serialized size (0 = unlimited).
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.config.max_length = max_length;
        self
    }

    /// Set the cookie template.
    pub fn cookie_options(mut self, options: CookieOptions) -> Self {
        self.config.cookie = options;
        self
    }

    /// Use a custom serializer instead of the configured kind.
    pub fn serializer(mut self, serializer: impl SessionSerializer + 'static) -> Self {
        self.serializer = Some(Arc::new(serializer));
        self
    }

    /// Build the store.
    ///
    /// Fails if no key pair was given, a key is invalid or the configuration
    /// does not validate.
    pub fn build(self) -> SessionResult<SessionStore> {
        self.config.validate()?;

        if self.key_pairs.is_empty() {
            return Err(SessionError::Config(
                "at least one key pair is required".to_string(),
            ));
        }

        let max_age = self.config.effective_codec_max_age();
        let codecs: Arc<[SecureCookie]> = codecs_from_pairs(self.key_pairs)?
            .into_iter()
            .map(|codec| codec.with_max_age(max_age))
            .collect();

        let serializer = self
            .serializer
            .unwrap_or_else(|| self.config.serializer.build());

        Ok(SessionStore {
            inner: Arc::new(Inner {
                id: StoreId::next(),
                backend: self.backend,
                codecs,
                serializer,
                config: self.config,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCache;
    use http::HeaderValue;
    use http::header::{COOKIE, SET_COOKIE};

    fn store(cache: Arc<MemoryCache>) -> SessionStore {
        SessionStore::builder(cache)
            .key_pair(KeyPair::signing("store-test-key"))
            .build()
            .unwrap()
    }

    fn echo(response: &HeaderMap) -> HeaderMap {
        let set_cookie = response.get(SET_COOKIE).unwrap().to_str().unwrap();
        let pair = set_cookie.split(';').next().unwrap();
        let mut request = HeaderMap::new();
        request.insert(COOKIE, HeaderValue::from_str(pair).unwrap());
        request
    }

    #[test]
    fn test_session_id_format() {
        let id = generate_session_id();
        // 32 bytes -> 52 base32 characters once padding is stripped.
        assert_eq!(id.len(), 52);
        assert!(id.chars().all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c)));
        assert_ne!(id, generate_session_id());
    }

    #[test]
    fn test_store_ids_are_unique() {
        let cache = Arc::new(MemoryCache::new());
        assert_ne!(store(cache.clone()).id(), store(cache).id());
    }

    #[test]
    fn test_build_requires_key_pair() {
        let result = SessionStore::builder(MemoryCache::new()).build();
        assert!(matches!(result, Err(SessionError::Config(_))));
    }

    #[test]
    fn test_build_rejects_bad_encryption_key() {
        let result = SessionStore::builder(MemoryCache::new())
            .key_pair(KeyPair::new("signing", vec![0u8; 7]))
            .build();
        assert!(matches!(result, Err(SessionError::Cookie(_))));
    }

    #[test]
    fn test_codecs_follow_default_ttl() {
        let store = SessionStore::builder(MemoryCache::new())
            .key_pair(KeyPair::generate())
            .default_ttl(Duration::from_secs(7200))
            .build()
            .unwrap();
        assert_eq!(store.codecs()[0].max_age(), 7200);
    }

    #[tokio::test]
    async fn test_no_cookie_gives_fresh_session() {
        let store = store(Arc::new(MemoryCache::new()));
        let session = store.new_session(&HeaderMap::new(), "sid").await.unwrap();

        assert!(session.is_new());
        assert_eq!(session.id(), "");
        assert_eq!(session.options().max_age, 86400);
    }

    #[tokio::test]
    async fn test_tampered_cookie_gives_fresh_session() {
        let store = store(Arc::new(MemoryCache::new()));
        let mut request = HeaderMap::new();
        request.insert(COOKIE, HeaderValue::from_static("sid=not-a-valid-envelope"));

        let session = store.new_session(&request, "sid").await.unwrap();
        assert!(session.is_new());
        assert_eq!(session.id(), "");
    }

    #[tokio::test]
    async fn test_clean_session_save_is_noop() {
        let cache = Arc::new(MemoryCache::new());
        let store = store(cache.clone());
        let session = store.new_session(&HeaderMap::new(), "sid").await.unwrap();

        let mut response = HeaderMap::new();
        store.save(&session, &mut response).await.unwrap();

        assert!(response.is_empty());
        assert!(cache.is_empty());
        assert_eq!(session.id(), "");
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let cache = Arc::new(MemoryCache::new());
        let store = store(cache.clone());

        let session = store.new_session(&HeaderMap::new(), "sid").await.unwrap();
        session.set("userId", 42);
        let mut response = HeaderMap::new();
        store.save(&session, &mut response).await.unwrap();

        let id = session.id();
        assert!(!id.is_empty());
        assert!(!session.is_new());
        assert!(!session.is_dirty());
        assert!(cache.contains_key(&format!("session:{}", id)));

        let loaded = store.new_session(&echo(&response), "sid").await.unwrap();
        assert!(!loaded.is_new());
        assert_eq!(loaded.id(), id);
        assert_eq!(loaded.get::<i64>("userId").unwrap(), Some(42));
    }

    #[tokio::test]
    async fn test_cache_miss_keeps_id() {
        let cache = Arc::new(MemoryCache::new());
        let store = store(cache.clone());

        let session = store.new_session(&HeaderMap::new(), "sid").await.unwrap();
        session.set("a", 1);
        let mut response = HeaderMap::new();
        session.save(&mut response).await.unwrap();
        let id = session.id();

        cache.del(&[store.session_key(&id)]).await.unwrap();

        let loaded = store.new_session(&echo(&response), "sid").await.unwrap();
        assert!(loaded.is_new());
        assert!(loaded.is_empty());
        assert_eq!(loaded.id(), id);
    }

    #[tokio::test]
    async fn test_corrupt_payload_is_error() {
        let cache = Arc::new(MemoryCache::new());
        let store = store(cache.clone());

        let session = store.new_session(&HeaderMap::new(), "sid").await.unwrap();
        session.set("a", 1);
        let mut response = HeaderMap::new();
        session.save(&mut response).await.unwrap();

        cache
            .set(&store.session_key(&session.id()), &[0xff; 3], Duration::from_secs(60))
            .await
            .unwrap();

        let result = store.new_session(&echo(&response), "sid").await;
        assert!(matches!(result, Err(SessionError::Deserialization(_))));
    }

    #[tokio::test]
    async fn test_ttl_uses_max_age() {
        let cache = Arc::new(MemoryCache::new());
        let store = store(cache.clone());

        let session = store.new_session(&HeaderMap::new(), "sid").await.unwrap();
        session.set_max_age(120);
        session.set("a", 1);
        session.save(&mut HeaderMap::new()).await.unwrap();

        let ttl = cache.ttl(&store.session_key(&session.id())).unwrap();
        assert!(ttl <= Duration::from_secs(120));
        assert!(ttl > Duration::from_secs(100));
    }

    #[tokio::test]
    async fn test_delete_expires_cookie() {
        let cache = Arc::new(MemoryCache::new());
        let store = store(cache.clone());

        let session = store.new_session(&HeaderMap::new(), "sid").await.unwrap();
        session.set("a", 1);
        session.save(&mut HeaderMap::new()).await.unwrap();
        let key = store.session_key(&session.id());

        let mut response = HeaderMap::new();
        store.delete(&session, &mut response).await.unwrap();

        assert!(!cache.contains_key(&key));
        assert!(session.is_empty());
        let header = response.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(header.starts_with("sid=;"));
        assert!(header.contains("Max-Age=0"));
    }
}
