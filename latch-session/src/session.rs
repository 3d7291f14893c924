//! Session facade handed to request handlers.

use crate::error::{SessionError, SessionResult};
use crate::value::{FromSessionValue, SessionKey, SessionValue, SessionValues};
use async_trait::async_trait;
use http::HeaderMap;
use latch_cookie::CookieOptions;
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::Arc;

/// Key used by flash messages when none is given.
pub const DEFAULT_FLASH_KEY: &str = "_flash";

/// Writes a session back to its store.
///
/// This is the only view a [`Session`] has of the store that created it.
#[async_trait]
pub trait Persist: Send + Sync {
    /// Persist `session` and append the resulting `Set-Cookie` to `response`.
    async fn save(&self, session: &Session, response: &mut HeaderMap) -> SessionResult<()>;

    /// Remove `session` from the cache and expire its cookie.
    async fn delete(&self, session: &Session, response: &mut HeaderMap) -> SessionResult<()>;
}

pub(crate) struct SessionState {
    pub(crate) id: String,
    pub(crate) values: SessionValues,
    pub(crate) options: CookieOptions,
    pub(crate) is_new: bool,
    pub(crate) dirty: bool,
}

/// One named session within one request.
///
/// Cloning yields another handle to the same session; values set through
/// one handle are visible through every other.
#[derive(Clone)]
pub struct Session {
    name: Arc<str>,
    state: Arc<Mutex<SessionState>>,
    store: Arc<dyn Persist>,
}

impl Session {
    pub(crate) fn new(name: &str, options: CookieOptions, store: Arc<dyn Persist>) -> Self {
        Self {
            name: Arc::from(name),
            state: Arc::new(Mutex::new(SessionState {
                id: String::new(),
                values: SessionValues::new(),
                options,
                is_new: true,
                dirty: false,
            })),
            store,
        }
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock()
    }

    /// Session ID; empty until the session is first saved.
    pub fn id(&self) -> String {
        self.state.lock().id.clone()
    }

    /// Cookie name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether no stored session was found for the incoming cookie.
    pub fn is_new(&self) -> bool {
        self.state.lock().is_new
    }

    /// Whether the session changed since it was loaded or last saved.
    pub fn is_dirty(&self) -> bool {
        self.state.lock().dirty
    }

    /// Whether two handles refer to the same session.
    pub fn ptr_eq(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    /// Get a typed value.
    ///
    /// Returns `Ok(None)` if the key is absent and
    /// [`SessionError::TypeMismatch`] if the stored value has another shape.
    pub fn get<T: FromSessionValue>(&self, key: impl Into<SessionKey>) -> SessionResult<Option<T>> {
        let key = key.into();
        let state = self.state.lock();
        let Some(value) = state.values.get(&key) else {
            return Ok(None);
        };

        T::from_session_value(value)
            .map(Some)
            .ok_or_else(|| SessionError::TypeMismatch {
                key: key.to_string(),
                expected: T::EXPECTED,
                found: value.type_name(),
            })
    }

    /// Get a value as stored.
    pub fn get_raw(&self, key: impl Into<SessionKey>) -> Option<SessionValue> {
        self.state.lock().values.get(&key.into()).cloned()
    }

    /// Set a value.
    pub fn set(&self, key: impl Into<SessionKey>, value: impl Into<SessionValue>) {
        let mut state = self.state.lock();
        state.values.insert(key.into(), value.into());
        state.dirty = true;
    }

    /// Remove a value, returning it if present.
    pub fn remove(&self, key: impl Into<SessionKey>) -> Option<SessionValue> {
        let mut state = self.state.lock();
        state.dirty = true;
        state.values.remove(&key.into())
    }

    /// Remove every value.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.values.clear();
        state.dirty = true;
    }

    /// Check if a key exists.
    pub fn contains(&self, key: impl Into<SessionKey>) -> bool {
        self.state.lock().values.contains_key(&key.into())
    }

    /// All keys, in no particular order.
    pub fn keys(&self) -> Vec<SessionKey> {
        self.state.lock().values.keys().cloned().collect()
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.state.lock().values.len()
    }

    /// Whether the session holds no values.
    pub fn is_empty(&self) -> bool {
        self.state.lock().values.is_empty()
    }

    /// Snapshot of every value.
    pub fn values(&self) -> SessionValues {
        self.state.lock().values.clone()
    }

    /// Cookie options used on the next save.
    pub fn options(&self) -> CookieOptions {
        self.state.lock().options.clone()
    }

    /// Replace the cookie options.
    pub fn set_options(&self, options: CookieOptions) {
        let mut state = self.state.lock();
        state.options = options;
        state.dirty = true;
    }

    /// Set the cookie max age in seconds.
    ///
    /// A value `<= 0` makes the next save delete the session.
    pub fn set_max_age(&self, max_age: i64) {
        let mut state = self.state.lock();
        state.options.max_age = max_age;
        state.dirty = true;
    }

    /// Queue a flash message under `key` (default `_flash`).
    pub fn add_flash(&self, value: impl Into<SessionValue>, key: Option<&str>) {
        let key = SessionKey::from(key.unwrap_or(DEFAULT_FLASH_KEY));
        let value = value.into();

        let mut state = self.state.lock();
        match state.values.get_mut(&key) {
            Some(SessionValue::List(items)) => items.push(value),
            _ => {
                state.values.insert(key, SessionValue::List(vec![value]));
            }
        }
        state.dirty = true;
    }

    /// Take the flash messages under `key` (default `_flash`), removing them.
    pub fn flashes(&self, key: Option<&str>) -> Vec<SessionValue> {
        let key = SessionKey::from(key.unwrap_or(DEFAULT_FLASH_KEY));

        let mut state = self.state.lock();
        state.dirty = true;
        match state.values.remove(&key) {
            Some(SessionValue::List(items)) => items,
            Some(other) => vec![other],
            None => Vec::new(),
        }
    }

    /// Persist through the owning store, appending `Set-Cookie` to `response`.
    ///
    /// Does nothing if the session is not dirty.
    pub async fn save(&self, response: &mut HeaderMap) -> SessionResult<()> {
        self.store.save(self, response).await
    }

    /// Delete the stored session and expire its cookie.
    pub async fn delete(&self, response: &mut HeaderMap) -> SessionResult<()> {
        self.store.delete(self, response).await
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Session")
            .field("name", &self.name)
            .field("id", &state.id)
            .field("is_new", &state.is_new)
            .field("dirty", &state.dirty)
            .field("values", &state.values.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopStore;

    #[async_trait]
    impl Persist for NoopStore {
        async fn save(&self, session: &Session, _response: &mut HeaderMap) -> SessionResult<()> {
            session.state().dirty = false;
            Ok(())
        }

        async fn delete(&self, _session: &Session, _response: &mut HeaderMap) -> SessionResult<()> {
            Ok(())
        }
    }

    fn session() -> Session {
        Session::new("sid", CookieOptions::default(), Arc::new(NoopStore))
    }

    #[test]
    fn test_fresh_session() {
        let session = session();
        assert_eq!(session.name(), "sid");
        assert_eq!(session.id(), "");
        assert!(session.is_new());
        assert!(!session.is_dirty());
        assert!(session.is_empty());
    }

    #[test]
    fn test_typed_get() {
        let session = session();
        session.set("userId", 42);
        session.set("name", "alice");

        assert_eq!(session.get::<i64>("userId").unwrap(), Some(42));
        assert_eq!(session.get::<String>("name").unwrap().as_deref(), Some("alice"));
        assert_eq!(session.get::<i64>("missing").unwrap(), None);

        let err = session.get::<String>("userId").unwrap_err();
        assert!(matches!(
            err,
            SessionError::TypeMismatch { expected: "text", found: "int", .. }
        ));
    }

    #[test]
    fn test_mutations_mark_dirty() {
        let session = session();
        session.set("a", 1);
        assert!(session.is_dirty());

        session.state().dirty = false;
        assert_eq!(session.remove("a"), Some(SessionValue::Int(1)));
        assert!(session.is_dirty());

        session.state().dirty = false;
        session.clear();
        assert!(session.is_dirty());

        session.state().dirty = false;
        session.set_max_age(60);
        assert!(session.is_dirty());
        assert_eq!(session.options().max_age, 60);
    }

    #[test]
    fn test_reads_do_not_mark_dirty() {
        let session = session();
        let _ = session.get::<i64>("a");
        let _ = session.contains("a");
        let _ = session.keys();
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_clones_share_state() {
        let a = session();
        let b = a.clone();
        a.set("k", true);

        assert_eq!(b.get::<bool>("k").unwrap(), Some(true));
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&session()));
    }

    #[test]
    fn test_flashes_are_consumed() {
        let session = session();
        session.add_flash("saved", None);
        session.add_flash("twice", None);
        session.add_flash("oops", Some("errors"));

        assert_eq!(
            session.flashes(None),
            vec![SessionValue::from("saved"), SessionValue::from("twice")]
        );
        assert!(session.flashes(None).is_empty());
        assert_eq!(session.flashes(Some("errors")), vec![SessionValue::from("oops")]);
    }

    #[tokio::test]
    async fn test_save_delegates_to_store() {
        let session = session();
        session.set("a", 1);

        let mut headers = HeaderMap::new();
        session.save(&mut headers).await.unwrap();
        assert!(!session.is_dirty());
    }
}
