//! Browser session state used by the authorization flow
//!
//! A browser session is a server-side key/value map addressed by an opaque
//! session identifier carried in a cookie. The flow reads and writes three
//! attributes:
//!
//! - `user` -- the cached [`Identity`] (authentication cache)
//! - `authTime` -- the instant the cached identity authenticated
//! - `pendingRequest` -- the [`AuthorizationContext`] awaiting the user's
//!   decision (pending-request store)
//!
//! # Module Layout
//!
//! - [`SessionStore`] -- the storage capability, injected by the web tier
//! - [`Session`] -- a store handle bound to one session id; every
//!   orchestration call receives one explicitly
//! - [`memory::MemorySessionStore`] -- process-local store with idle expiry
//! - [`sled_store::SledSessionStore`] -- persistent store backed by `sled`
//!
//! Every store must implement [`SessionStore::take`] atomically: of two
//! concurrent takes on the same key, at most one observes the value.

pub mod memory;
pub mod sled_store;

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::authorization::context::AuthorizationContext;
use crate::error::{AuthflowError, Result};
use crate::identity::Identity;

pub use memory::MemorySessionStore;
pub use sled_store::SledSessionStore;

/// Opaque session identifier.
pub type SessionId = String;

/// Session attribute holding the cached identity.
pub const USER_KEY: &str = "user";

/// Session attribute holding the authentication instant.
pub const AUTH_TIME_KEY: &str = "authTime";

/// Session attribute holding the pending authorization request.
pub const PENDING_REQUEST_KEY: &str = "pendingRequest";

/// Per-session key/value storage.
///
/// Values are JSON so that stores can persist them without knowing the
/// attribute types. Implementations provide read-your-writes consistency
/// for a single session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Allocates a new, empty session and returns its id.
    async fn create(&self) -> Result<SessionId>;

    /// Returns `true` if the session exists and has not expired.
    async fn exists(&self, id: &str) -> Result<bool>;

    /// Reads an attribute.
    async fn get(&self, id: &str, key: &str) -> Result<Option<Value>>;

    /// Writes an attribute, replacing any previous value.
    async fn set(&self, id: &str, key: &str, value: Value) -> Result<()>;

    /// Deletes an attribute. Deleting a missing attribute is not an error.
    async fn remove(&self, id: &str, key: &str) -> Result<()>;

    /// Atomically reads and deletes an attribute.
    async fn take(&self, id: &str, key: &str) -> Result<Option<Value>>;

    /// Deletes the session and all of its attributes.
    async fn destroy(&self, id: &str) -> Result<()>;
}

/// Generates a new session identifier.
///
/// 32 random bytes encoded as base64url without padding.
pub fn generate_session_id() -> SessionId {
    use rand::RngCore as _;
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Abbreviated session id for log output.
pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// A session store bound to one browser session.
///
/// `Session` is cheap to clone and is passed explicitly into the
/// dispatcher, resolver and decision collector.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn SessionStore>,
    id: SessionId,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &short_id(&self.id))
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Binds `store` to the session `id`.
    pub fn new(store: Arc<dyn SessionStore>, id: impl Into<SessionId>) -> Self {
        Self {
            store,
            id: id.into(),
        }
    }

    /// Allocates a fresh session in `store`.
    pub async fn create(store: Arc<dyn SessionStore>) -> Result<Self> {
        let id = store.create().await?;
        Ok(Self { store, id })
    }

    /// The session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    // -----------------------------------------------------------------------
    // Authentication cache
    // -----------------------------------------------------------------------

    /// The cached identity, if any.
    pub async fn user(&self) -> Result<Option<Identity>> {
        self.read(USER_KEY).await
    }

    /// The instant the cached identity authenticated, if any.
    pub async fn auth_time(&self) -> Result<Option<DateTime<Utc>>> {
        self.read(AUTH_TIME_KEY).await
    }

    /// Caches `identity` as authenticated at `auth_time`.
    pub async fn set_authentication(
        &self,
        identity: &Identity,
        auth_time: DateTime<Utc>,
    ) -> Result<()> {
        self.write(USER_KEY, identity).await?;
        self.write(AUTH_TIME_KEY, &auth_time).await
    }

    /// Forgets the cached identity and its authentication instant.
    pub async fn clear_authentication(&self) -> Result<()> {
        self.store.remove(&self.id, USER_KEY).await?;
        self.store.remove(&self.id, AUTH_TIME_KEY).await
    }

    // -----------------------------------------------------------------------
    // Pending-request store
    // -----------------------------------------------------------------------

    /// Stores the pending authorization request, replacing any previous one.
    pub async fn put_pending_request(&self, context: &AuthorizationContext) -> Result<()> {
        self.write(PENDING_REQUEST_KEY, context).await
    }

    /// Reads the pending authorization request without consuming it.
    pub async fn peek_pending_request(&self) -> Result<Option<AuthorizationContext>> {
        self.read(PENDING_REQUEST_KEY).await
    }

    /// Reads and clears the pending authorization request in one atomic
    /// store operation.
    pub async fn take_pending_request(&self) -> Result<Option<AuthorizationContext>> {
        match self.store.take(&self.id, PENDING_REQUEST_KEY).await? {
            Some(value) => Ok(Some(decode(PENDING_REQUEST_KEY, value)?)),
            None => Ok(None),
        }
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    async fn read<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(&self.id, key).await? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(decode(key, value)?)),
        }
    }

    async fn write<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.store.set(&self.id, key, value).await
    }
}

fn decode<T: serde::de::DeserializeOwned>(key: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        AuthflowError::Session(format!("corrupt session attribute '{key}': {e}")).into()
    })
}
