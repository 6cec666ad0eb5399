//! Process-local session store
//!
//! Sessions live in a map guarded by a single async mutex, which makes
//! [`SessionStore::take`] trivially atomic. Idle sessions expire after the
//! configured TTL; expiry is checked lazily on access and expired entries are
//! swept whenever a new session is created.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{generate_session_id, short_id, SessionId, SessionStore};
use crate::error::Result;

#[derive(Debug)]
struct Entry {
    values: HashMap<String, Value>,
    last_seen: Instant,
}

impl Entry {
    fn new() -> Self {
        Self {
            values: HashMap::new(),
            last_seen: Instant::now(),
        }
    }
}

/// In-memory [`SessionStore`].
#[derive(Debug)]
pub struct MemorySessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<SessionId, Entry>>,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(60 * 60))
    }
}

impl MemorySessionStore {
    /// Creates a store whose sessions expire after `ttl` of inactivity.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Number of sessions currently held, including not yet swept ones.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Returns `true` when no sessions are held.
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        now.duration_since(entry.last_seen) > self.ttl
    }

    /// Returns the live entry for `id`, dropping it first if it expired.
    fn live_entry<'a>(
        &self,
        sessions: &'a mut HashMap<SessionId, Entry>,
        id: &str,
    ) -> Option<&'a mut Entry> {
        let now = Instant::now();
        if sessions.get(id).is_some_and(|e| self.is_expired(e, now)) {
            tracing::debug!(session = short_id(id), "Session expired");
            sessions.remove(id);
            return None;
        }
        let entry = sessions.get_mut(id)?;
        entry.last_seen = now;
        Some(entry)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self) -> Result<SessionId> {
        let mut sessions = self.sessions.lock().await;

        let now = Instant::now();
        let before = sessions.len();
        sessions.retain(|_, e| !self.is_expired(e, now));
        let swept = before - sessions.len();
        if swept > 0 {
            tracing::debug!(swept, "Swept expired sessions");
        }

        let id = generate_session_id();
        sessions.insert(id.clone(), Entry::new());
        Ok(id)
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        let mut sessions = self.sessions.lock().await;
        Ok(self.live_entry(&mut sessions, id).is_some())
    }

    async fn get(&self, id: &str, key: &str) -> Result<Option<Value>> {
        let mut sessions = self.sessions.lock().await;
        Ok(self
            .live_entry(&mut sessions, id)
            .and_then(|e| e.values.get(key).cloned()))
    }

    async fn set(&self, id: &str, key: &str, value: Value) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        if self.live_entry(&mut sessions, id).is_none() {
            sessions.insert(id.to_string(), Entry::new());
        }
        if let Some(entry) = sessions.get_mut(id) {
            entry.values.insert(key.to_string(), value);
        }
        Ok(())
    }

    async fn remove(&self, id: &str, key: &str) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        if let Some(entry) = self.live_entry(&mut sessions, id) {
            entry.values.remove(key);
        }
        Ok(())
    }

    async fn take(&self, id: &str, key: &str) -> Result<Option<Value>> {
        let mut sessions = self.sessions.lock().await;
        Ok(self
            .live_entry(&mut sessions, id)
            .and_then(|e| e.values.remove(key)))
    }

    async fn destroy(&self, id: &str) -> Result<()> {
        self.sessions.lock().await.remove(id);
        Ok(())
    }
}
