//! Entry point for incoming authorization requests
//!
//! The dispatcher submits the raw request to the engine and routes on its
//! verdict:
//!
//! - `Interaction` -- remember the request as pending, apply the freshness
//!   policy and show the authorization page
//! - `NoInteraction` -- resolve from the cached authentication and let the
//!   engine finalize immediately
//! - `Error` -- hand the engine's response through untouched

use std::sync::Arc;

use chrono::Utc;

use crate::authorization::context::AuthorizationContext;
use crate::authorization::freshness::apply_freshness_policy;
use crate::authorization::no_interaction;
use crate::error::Result;
use crate::identity::Identity;
use crate::session::{short_id, Session};
use crate::upstream::{AuthorizationEngine, EngineResponse, EngineVerdict};

/// Data needed to render the authorization page.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionPage {
    /// The pending request.
    pub context: AuthorizationContext,
    /// The cached user; `None` means the login form must be shown.
    pub identity: Option<Identity>,
    /// The previous submission carried wrong credentials.
    pub login_error: bool,
}

/// Result of dispatching an authorization request.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Show the authorization page.
    Interaction(InteractionPage),
    /// The engine finalized the request without interaction.
    Completed(EngineResponse),
    /// The engine rejected the request.
    Rejected(EngineResponse),
}

/// Routes authorization requests.
pub struct AuthorizationDispatcher {
    engine: Arc<dyn AuthorizationEngine>,
}

impl AuthorizationDispatcher {
    /// Creates a dispatcher over `engine`.
    pub fn new(engine: Arc<dyn AuthorizationEngine>) -> Self {
        Self { engine }
    }

    /// Handles one authorization request.
    ///
    /// # Arguments
    ///
    /// * `parameters` - The request's query string or form body, verbatim
    /// * `session` - The caller's browser session
    ///
    /// # Errors
    ///
    /// Returns `AuthflowError::UpstreamUnavailable` when the engine cannot be
    /// reached; the session is not modified in that case.
    pub async fn dispatch(&self, parameters: &str, session: &Session) -> Result<DispatchOutcome> {
        let verdict = self.engine.authorize(parameters).await?;

        match verdict {
            EngineVerdict::Interaction(context) => {
                tracing::info!(
                    session = short_id(session.id()),
                    action = "INTERACTION",
                    client_id = %context.client.client_id,
                    "Authorization requires interaction"
                );

                session.put_pending_request(&context).await?;
                apply_freshness_policy(&context, session, Utc::now()).await?;
                let identity = session.user().await?;

                Ok(DispatchOutcome::Interaction(InteractionPage {
                    context,
                    identity,
                    login_error: false,
                }))
            }
            EngineVerdict::NoInteraction(context) => {
                tracing::info!(
                    session = short_id(session.id()),
                    action = "NO_INTERACTION",
                    client_id = %context.client.client_id,
                    "Authorization without interaction"
                );

                let verdict = no_interaction::resolve(session).await?;
                let response = self
                    .engine
                    .finalize_no_interaction(&context, &verdict)
                    .await?;
                Ok(DispatchOutcome::Completed(response))
            }
            EngineVerdict::Error(response) => {
                tracing::info!(
                    session = short_id(session.id()),
                    action = ?response.action,
                    "Authorization request rejected by engine"
                );
                Ok(DispatchOutcome::Rejected(response))
            }
        }
    }
}
