//! Collection of the user's decision on the authorization page
//!
//! The page posts the login form and the approve/deny choice. The collector
//! authenticates the user when the session has no cached identity, consumes
//! the pending request and hands the combined [`Decision`] to the engine.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::authorization::context::AuthorizationContext;
use crate::authorization::dispatcher::InteractionPage;
use crate::authorization::disposition::{Disposition, FailReason, Issuance};
use crate::credentials::CredentialLookup;
use crate::error::{AuthflowError, Result};
use crate::identity::Identity;
use crate::session::{short_id, Session};
use crate::upstream::{AuthorizationEngine, EngineResponse};

/// The user's answer to a pending authorization request.
///
/// Built once from the consumed pending request and handed to
/// [`AuthorizationEngine::finalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// The request being decided.
    pub context: AuthorizationContext,
    /// Whether the user approved.
    pub approved: bool,
    /// The authenticated user, if any.
    pub identity: Option<Identity>,
    /// When the user authenticated, if known.
    pub auth_time: Option<DateTime<Utc>>,
}

impl Decision {
    /// Subject of the authenticated user.
    pub fn subject(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.subject.as_str())
    }

    /// Authentication time in epoch seconds; zero when unknown.
    pub fn authenticated_at(&self) -> i64 {
        match (&self.identity, self.auth_time) {
            (Some(_), Some(at)) => at.timestamp(),
            _ => 0,
        }
    }

    /// Issue when the user approved and is authenticated; otherwise fail
    /// with `DENIED` or `NOT_AUTHENTICATED`.
    pub fn disposition(&self) -> Disposition {
        if !self.approved {
            return Disposition::Fail(FailReason::Denied);
        }

        match &self.identity {
            None => Disposition::Fail(FailReason::NotAuthenticated),
            Some(identity) => Disposition::Issue(Issuance {
                subject: identity.subject.clone(),
                auth_time: self.authenticated_at(),
                claims: identity
                    .collect_claims(&self.context.claims, &self.context.claims_locales),
            }),
        }
    }
}

/// Fields posted by the authorization page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecisionForm {
    /// Login identifier, when the login form was shown.
    pub login_id: Option<String>,
    /// Password, when the login form was shown.
    pub password: Option<String>,
    /// `true` iff the user pressed the approve button.
    pub authorized: bool,
}

/// What happened to a submitted decision.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionOutcome {
    /// The engine produced the final response for the client.
    Finalized(EngineResponse),
    /// Credentials were wrong; show the page again. The pending request was
    /// left in the session.
    RetryLogin(InteractionPage),
}

/// Turns posted decisions into engine calls.
pub struct DecisionCollector {
    engine: Arc<dyn AuthorizationEngine>,
    credentials: Arc<dyn CredentialLookup>,
    strict: bool,
}

impl DecisionCollector {
    /// Creates a collector.
    ///
    /// # Arguments
    ///
    /// * `engine` - Engine that finalizes the request
    /// * `credentials` - Lookup used when the session has no cached user
    /// * `strict` - Re-render on failed credentials instead of finalizing
    ///   unauthenticated
    pub fn new(
        engine: Arc<dyn AuthorizationEngine>,
        credentials: Arc<dyn CredentialLookup>,
        strict: bool,
    ) -> Self {
        Self {
            engine,
            credentials,
            strict,
        }
    }

    /// Processes a submitted decision for `session`.
    ///
    /// # Errors
    ///
    /// Returns `AuthflowError::MissingPendingRequest` if the session holds no
    /// pending request, or the engine's error if finalization fails.
    pub async fn collect(&self, form: &DecisionForm, session: &Session) -> Result<DecisionOutcome> {
        if let Err(e) = self.authenticate_if_necessary(form, session).await {
            let Some(AuthflowError::AuthenticationFailed(login_id)) =
                e.downcast_ref::<AuthflowError>()
            else {
                return Err(e);
            };

            if self.strict && form.authorized {
                let context = session
                    .peek_pending_request()
                    .await?
                    .ok_or(AuthflowError::MissingPendingRequest)?;
                tracing::info!(
                    session = short_id(session.id()),
                    client_id = %context.client.client_id,
                    login_id = %login_id,
                    "Credentials rejected, asking again"
                );
                return Ok(DecisionOutcome::RetryLogin(InteractionPage {
                    context,
                    identity: None,
                    login_error: true,
                }));
            }

            tracing::info!(
                session = short_id(session.id()),
                login_id = %login_id,
                "Continuing without an authenticated user"
            );
        }

        let context = session
            .take_pending_request()
            .await?
            .ok_or(AuthflowError::MissingPendingRequest)?;

        let decision = Decision {
            context,
            approved: form.authorized,
            identity: session.user().await?,
            auth_time: session.auth_time().await?,
        };

        tracing::info!(
            session = short_id(session.id()),
            client_id = %decision.context.client.client_id,
            approved = decision.approved,
            subject = decision.subject().unwrap_or("-"),
            "Finalizing authorization decision"
        );

        let response = self.engine.finalize(&decision).await?;
        Ok(DecisionOutcome::Finalized(response))
    }

    /// Ensures the session has a cached user, verifying the posted
    /// credentials when it does not.
    ///
    /// # Errors
    ///
    /// Returns `AuthflowError::AuthenticationFailed` when no user is cached
    /// and the credentials are missing or match nobody.
    async fn authenticate_if_necessary(&self, form: &DecisionForm, session: &Session) -> Result<()> {
        if session.user().await?.is_some() {
            return Ok(());
        }

        let (Some(login_id), Some(password)) = (form.login_id.as_deref(), form.password.as_deref())
        else {
            return Err(AuthflowError::AuthenticationFailed(
                form.login_id.clone().unwrap_or_default(),
            )
            .into());
        };

        match self.credentials.lookup(login_id, password).await? {
            Some(identity) => {
                session.set_authentication(&identity, Utc::now()).await?;
                tracing::info!(
                    session = short_id(session.id()),
                    subject = %identity.subject,
                    "User authenticated"
                );
                Ok(())
            }
            None => {
                tracing::warn!(
                    session = short_id(session.id()),
                    login_id,
                    "Authentication failed"
                );
                Err(AuthflowError::AuthenticationFailed(login_id.to_string()).into())
            }
        }
    }
}
