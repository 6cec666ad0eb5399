//! Test utilities for Authflow
//!
//! Builders for the contexts, sessions and users most unit tests need.

use std::sync::Arc;

use crate::authorization::context::{AuthorizationContext, ClientInfo, Prompt};
use crate::config::UserConfig;
use crate::credentials::password_digest;
use crate::error::AuthflowError;
use crate::session::{MemorySessionStore, Session, SessionStore};

/// Create an authorization context for client `client`
///
/// # Arguments
///
/// * `ticket` - Engine ticket
/// * `prompts` - Requested prompts
/// * `max_age` - Requested maximum authentication age
pub fn sample_context(ticket: &str, prompts: Vec<Prompt>, max_age: i64) -> AuthorizationContext {
    AuthorizationContext {
        ticket: ticket.to_string(),
        client: ClientInfo {
            client_id: "client".to_string(),
            client_name: Some("Demo Client".to_string()),
        },
        prompts,
        acrs: vec![],
        max_age,
        scopes: vec![],
        claims: vec![],
        claims_locales: vec![],
    }
}

/// Create a fresh session in a new in-memory store
///
/// # Panics
///
/// Panics if the store cannot allocate a session
pub async fn new_session() -> Session {
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::default());
    Session::create(store)
        .await
        .expect("Failed to create session")
}

/// The user `john` / `john` with subject `1001` and a `name` claim
pub fn john() -> UserConfig {
    UserConfig {
        subject: "1001".to_string(),
        login_id: "john".to_string(),
        password_sha256: password_digest("john"),
        claims: [("name".to_string(), serde_json::json!("John Smith"))]
            .into_iter()
            .collect(),
    }
}

/// Extract the [`AuthflowError`] behind an `anyhow::Error`
///
/// # Panics
///
/// Panics if the error is of another type
pub fn authflow_error(error: &anyhow::Error) -> &AuthflowError {
    error
        .downcast_ref::<AuthflowError>()
        .unwrap_or_else(|| panic!("expected AuthflowError, got: {error}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_session_is_empty() {
        let session = new_session().await;
        assert!(session.user().await.unwrap().is_none());
        assert!(session.peek_pending_request().await.unwrap().is_none());
    }

    #[test]
    fn test_authflow_error_downcasts() {
        let err: anyhow::Error = AuthflowError::MissingPendingRequest.into();
        assert!(matches!(
            authflow_error(&err),
            AuthflowError::MissingPendingRequest
        ));
    }
}
