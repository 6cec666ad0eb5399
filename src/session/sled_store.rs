//! Persistent session store backed by an embedded `sled` database
//!
//! Layout:
//!
//! - `meta:<sid>` -- last activity as big-endian epoch seconds
//! - `attr:<sid>:<key>` -- JSON-encoded attribute value
//!
//! Session ids are base64url and never contain `:`. `take` maps onto
//! `sled::Tree::remove`, which returns the previous value atomically.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sled::Db;

use super::{generate_session_id, short_id, SessionId, SessionStore};
use crate::error::{AuthflowError, Result};

/// `sled`-backed [`SessionStore`].
pub struct SledSessionStore {
    db: Db,
    ttl_seconds: i64,
}

impl SledSessionStore {
    /// Open or create a session database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the database directory
    /// * `ttl_seconds` - Idle lifetime of a session
    ///
    /// # Errors
    ///
    /// Returns `AuthflowError::Session` if the database cannot be opened
    pub fn open(path: impl AsRef<Path>, ttl_seconds: u64) -> Result<Self> {
        let db = sled::open(path)
            .map_err(|e| AuthflowError::Session(format!("Failed to open database: {}", e)))?;
        Ok(Self {
            db,
            ttl_seconds: i64::try_from(ttl_seconds).unwrap_or(i64::MAX),
        })
    }

    fn meta_key(id: &str) -> String {
        format!("meta:{id}")
    }

    fn attr_prefix(id: &str) -> String {
        format!("attr:{id}:")
    }

    fn attr_key(id: &str, key: &str) -> String {
        format!("attr:{id}:{key}")
    }

    fn touch(&self, id: &str) -> Result<()> {
        self.db
            .insert(Self::meta_key(id), Utc::now().timestamp().to_be_bytes().to_vec())
            .map_err(|e| AuthflowError::Session(format!("Insert failed: {}", e)))?;
        Ok(())
    }

    fn last_seen(&self, id: &str) -> Result<Option<i64>> {
        let raw = self
            .db
            .get(Self::meta_key(id))
            .map_err(|e| AuthflowError::Session(format!("Get failed: {}", e)))?;
        Ok(raw.and_then(|bytes| {
            let arr: [u8; 8] = bytes.as_ref().try_into().ok()?;
            Some(i64::from_be_bytes(arr))
        }))
    }

    /// Returns `true` if the session is live, refreshing its activity stamp.
    /// Expired sessions are destroyed.
    fn check_live(&self, id: &str) -> Result<bool> {
        match self.last_seen(id)? {
            None => Ok(false),
            Some(seen) if Utc::now().timestamp() - seen > self.ttl_seconds => {
                tracing::debug!(session = short_id(id), "Session expired");
                self.purge(id)?;
                Ok(false)
            }
            Some(_) => {
                self.touch(id)?;
                Ok(true)
            }
        }
    }

    fn purge(&self, id: &str) -> Result<()> {
        for item in self.db.scan_prefix(Self::attr_prefix(id)) {
            let (key, _) =
                item.map_err(|e| AuthflowError::Session(format!("Iteration failed: {}", e)))?;
            self.db
                .remove(key)
                .map_err(|e| AuthflowError::Session(format!("Remove failed: {}", e)))?;
        }
        self.db
            .remove(Self::meta_key(id))
            .map_err(|e| AuthflowError::Session(format!("Remove failed: {}", e)))?;
        Ok(())
    }

    fn decode(bytes: &[u8]) -> Result<Value> {
        serde_json::from_slice(bytes).map_err(|e| {
            AuthflowError::Session(format!("Deserialization failed: {}", e)).into()
        })
    }
}

#[async_trait]
impl SessionStore for SledSessionStore {
    async fn create(&self) -> Result<SessionId> {
        let id = generate_session_id();
        self.touch(&id)?;
        Ok(id)
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        self.check_live(id)
    }

    async fn get(&self, id: &str, key: &str) -> Result<Option<Value>> {
        if !self.check_live(id)? {
            return Ok(None);
        }
        match self
            .db
            .get(Self::attr_key(id, key))
            .map_err(|e| AuthflowError::Session(format!("Get failed: {}", e)))?
        {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, id: &str, key: &str, value: Value) -> Result<()> {
        let bytes = serde_json::to_vec(&value)
            .map_err(|e| AuthflowError::Session(format!("Serialization failed: {}", e)))?;
        // An expired session is purged first, so writing starts it over empty.
        if !self.check_live(id)? {
            self.touch(id)?;
        }
        self.db
            .insert(Self::attr_key(id, key), bytes)
            .map_err(|e| AuthflowError::Session(format!("Insert failed: {}", e)))?;
        Ok(())
    }

    async fn remove(&self, id: &str, key: &str) -> Result<()> {
        if !self.check_live(id)? {
            return Ok(());
        }
        self.db
            .remove(Self::attr_key(id, key))
            .map_err(|e| AuthflowError::Session(format!("Remove failed: {}", e)))?;
        Ok(())
    }

    async fn take(&self, id: &str, key: &str) -> Result<Option<Value>> {
        if !self.check_live(id)? {
            return Ok(None);
        }
        let previous = self
            .db
            .remove(Self::attr_key(id, key))
            .map_err(|e| AuthflowError::Session(format!("Remove failed: {}", e)))?;
        match previous {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn destroy(&self, id: &str) -> Result<()> {
        self.purge(id)
    }
}
