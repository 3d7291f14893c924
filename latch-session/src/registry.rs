//! Per-request session registry.

use crate::error::SessionResult;
use crate::session::Session;
use crate::store::{SessionStore, StoreId};
use http::header::SET_COOKIE;
use http::{HeaderMap, HeaderValue};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

struct RegistryInner {
    request: HeaderMap,
    sessions: Mutex<HashMap<(StoreId, String), Session>>,
    pending: Mutex<Vec<HeaderValue>>,
}

/// Sessions loaded during one request.
///
/// Repeated lookups of the same store and name return the same [`Session`].
/// Saving through the registry collects the `Set-Cookie` values until the
/// response is finalized with [`SessionRegistry::apply`]. Nothing is saved
/// implicitly.
///
/// # Examples
///
/// ```
/// use http::HeaderMap;
/// use latch_session::{KeyPair, MemoryCache, SessionRegistry, SessionStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = SessionStore::builder(MemoryCache::new())
///     .key_pair(KeyPair::generate())
///     .build()?;
///
/// let registry = SessionRegistry::new(HeaderMap::new());
/// let a = registry.get(&store, "sid").await?;
/// let b = registry.get(&store, "sid").await?;
/// assert!(a.ptr_eq(&b));
///
/// a.set("userId", 42);
/// registry.save(&a).await?;
///
/// let mut response = HeaderMap::new();
/// registry.apply(&mut response);
/// assert!(response.contains_key("set-cookie"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

impl SessionRegistry {
    /// Create a registry for a request with the given headers.
    pub fn new(request: HeaderMap) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                request,
                sessions: Mutex::new(HashMap::new()),
                pending: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Headers of the request this registry belongs to.
    pub fn request_headers(&self) -> &HeaderMap {
        &self.inner.request
    }

    fn lookup(&self, store: StoreId, name: &str) -> Option<Session> {
        self.inner
            .sessions
            .lock()
            .get(&(store, name.to_string()))
            .cloned()
    }

    fn insert(&self, store: StoreId, name: &str, session: Session) -> Session {
        self.inner
            .sessions
            .lock()
            .entry((store, name.to_string()))
            .or_insert(session)
            .clone()
    }

    /// Get the session `name` from `store`, loading it on first use.
    ///
    /// Load errors are returned and not remembered; a later call retries.
    pub async fn get(&self, store: &SessionStore, name: &str) -> SessionResult<Session> {
        if let Some(session) = self.lookup(store.id(), name) {
            return Ok(session);
        }

        let session = store.new_session(&self.inner.request, name).await?;
        Ok(self.insert(store.id(), name, session))
    }

    /// Like [`SessionRegistry::get`], but falls back to a fresh session when
    /// loading fails.
    pub async fn get_or_fresh(&self, store: &SessionStore, name: &str) -> Session {
        if let Some(session) = self.lookup(store.id(), name) {
            return session;
        }

        let session = match store.new_session(&self.inner.request, name).await {
            Ok(session) => session,
            Err(e) => {
                warn!(cookie = name, error = %e, "Failed to load session, starting a fresh one");
                store.fresh_session(name)
            }
        };
        self.insert(store.id(), name, session)
    }

    /// Save one session, keeping its `Set-Cookie` for the response.
    pub async fn save(&self, session: &Session) -> SessionResult<()> {
        let mut headers = HeaderMap::new();
        session.save(&mut headers).await?;
        self.inner
            .pending
            .lock()
            .extend(headers.get_all(SET_COOKIE).iter().cloned());
        Ok(())
    }

    /// Save every dirty session held by this registry.
    ///
    /// All sessions are attempted; the first error is returned.
    pub async fn save_all(&self) -> SessionResult<()> {
        let sessions: Vec<Session> = self
            .inner
            .sessions
            .lock()
            .values()
            .filter(|s| s.is_dirty())
            .cloned()
            .collect();

        let mut first_error = None;
        for session in sessions {
            if let Err(e) = self.save(&session).await {
                warn!(cookie = session.name(), error = %e, "Failed to save session");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Take the pending `Set-Cookie` values.
    pub fn take_cookies(&self) -> Vec<HeaderValue> {
        std::mem::take(&mut *self.inner.pending.lock())
    }

    /// Append the pending `Set-Cookie` values to a response.
    pub fn apply(&self, response: &mut HeaderMap) {
        for value in self.take_cookies() {
            response.append(SET_COOKIE, value);
        }
    }

    /// Number of sessions loaded so far.
    pub fn len(&self) -> usize {
        self.inner.sessions.lock().len()
    }

    /// Whether no session was loaded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.len())
            .field("pending_cookies", &self.inner.pending.lock().len())
            .finish()
    }
}
