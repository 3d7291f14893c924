//! Process-local cache backend.

use crate::backend::CacheBackend;
use crate::error::SessionResult;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Entry count at which `set` first sweeps expired entries.
pub const DEFAULT_PURGE_THRESHOLD: usize = 1024;

struct State {
    entries: HashMap<String, Entry>,
    next_purge: usize,
}

/// In-memory cache with per-key TTL.
///
/// Suitable for tests and single-process deployments. Expired entries are
/// dropped on read, by [`MemoryCache::purge_expired`], and by `set` whenever
/// the map grows past the purge threshold (which then doubles over the live
/// count). Expiry follows tokio's clock, so paused-time tests can advance
/// past a TTL.
pub struct MemoryCache {
    state: RwLock<State>,
    purge_threshold: usize,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_purge_threshold(DEFAULT_PURGE_THRESHOLD)
    }
}

impl MemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache that sweeps on `set` once it holds `threshold` entries.
    pub fn with_purge_threshold(threshold: usize) -> Self {
        let threshold = threshold.max(1);
        Self {
            state: RwLock::new(State {
                entries: HashMap::new(),
                next_purge: threshold,
            }),
            purge_threshold: threshold,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.state.read().entries.values().filter(|e| e.is_live(now)).count()
    }

    /// Number of stored entries, expired ones included.
    pub fn stored_len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Whether the cache holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a live entry exists for `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.state
            .read()
            .entries
            .get(key)
            .is_some_and(|e| e.is_live(now))
    }

    /// Remaining time to live of `key`.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.state
            .read()
            .entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.expires_at - now)
    }

    /// Drop expired entries, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut state = self.state.write();
        self.purge_locked(&mut state, Instant::now())
    }

    fn purge_locked(&self, state: &mut State, now: Instant) -> usize {
        let before = state.entries.len();
        state.entries.retain(|_, e| e.is_live(now));
        state.next_purge = (state.entries.len() * 2).max(self.purge_threshold);
        before - state.entries.len()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn ping(&self) -> SessionResult<()> {
        Ok(())
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> SessionResult<()> {
        let ttl = ttl.max(Duration::from_secs(1));
        let now = Instant::now();
        let mut state = self.state.write();
        if state.entries.len() >= state.next_purge {
            let removed = self.purge_locked(&mut state, now);
            trace!(removed, remaining = state.entries.len(), "Purged expired cache entries");
        }
        state.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> SessionResult<Option<Vec<u8>>> {
        let now = Instant::now();
        {
            let state = self.state.read();
            match state.entries.get(key) {
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        self.state.write().entries.remove(key);
        Ok(None)
    }

    async fn del(&self, keys: &[String]) -> SessionResult<()> {
        let mut state = self.state.write();
        for key in keys {
            state.entries.remove(key);
        }
        Ok(())
    }
}
