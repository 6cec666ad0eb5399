//! Authorization engine abstraction and implementations
//!
//! The engine validates OAuth/OIDC requests and issues the protocol
//! responses; this crate only decides when to call it and with what
//! authentication evidence. Implementations live in submodules:
//!
//! - [`http::HttpEngine`] -- talks to an Authlete-style JSON API over HTTPS
//! - [`fake::FakeEngine`] -- in-process scripted engine for tests
//!
//! # Canonical Import Path
//!
//! ```no_run
//! use authflow::upstream::AuthorizationEngine;
//! ```

pub mod fake;
pub mod http;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::authorization::context::AuthorizationContext;
use crate::authorization::decision::Decision;
use crate::authorization::disposition::{Disposition, FailReason, Issuance};
use crate::authorization::no_interaction::NoInteractionVerdict;
use crate::error::Result;

pub use fake::FakeEngine;
pub use http::HttpEngine;

/// How the HTTP layer must deliver an engine response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseAction {
    /// 200 with a JSON body.
    Ok,
    /// 204 without a body.
    NoContent,
    /// 400 with a JSON error body.
    BadRequest,
    /// 401 with a JSON error body and a Basic challenge.
    InvalidClient,
    /// 401 with a JSON error body.
    Unauthorized,
    /// 403 with a JSON error body.
    Forbidden,
    /// 302 redirect; the content is the target URL.
    Location,
    /// 200 with an auto-submitting HTML form.
    Form,
    /// 500 with a JSON error body.
    InternalServerError,
}

/// A protocol response produced by the engine, ready to be sent to the
/// user agent or client.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineResponse {
    /// Delivery method.
    pub action: ResponseAction,
    /// Body, redirect URL, or HTML depending on `action`.
    pub content: Option<String>,
}

impl EngineResponse {
    /// Creates a response.
    pub fn new(action: ResponseAction, content: impl Into<Option<String>>) -> Self {
        Self {
            action,
            content: content.into(),
        }
    }
}

/// The engine's answer to an authorization request.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineVerdict {
    /// The user must be shown the authorization page.
    Interaction(AuthorizationContext),
    /// The request must be resolved without user interaction.
    NoInteraction(AuthorizationContext),
    /// The request is invalid; deliver the response as is.
    Error(EngineResponse),
}

/// A client-authenticated request to the token or revocation endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientRequest {
    /// Form-encoded request body.
    pub parameters: String,
    /// Client id from HTTP Basic, if present.
    pub client_id: Option<String>,
    /// Client secret from HTTP Basic, if present.
    pub client_secret: Option<String>,
}

/// The engine's answer to a token request.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenOutcome {
    /// Deliver the response as is.
    Response(EngineResponse),
    /// Resource owner password credentials must be verified locally.
    Password {
        /// Continuation for `issue_token` / `fail_token`.
        ticket: String,
        /// Submitted username.
        username: String,
        /// Submitted password.
        password: String,
    },
}

/// Reasons for failing a token request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenFailReason {
    /// Username or password is wrong.
    InvalidResourceOwnerCredentials,
}

/// The authorization engine.
///
/// `issue` and `fail` finalize a pending authorization; `finalize` and
/// `finalize_no_interaction` pick between them from the collected evidence.
#[async_trait]
pub trait AuthorizationEngine: Send + Sync {
    /// Submits raw authorization request parameters.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::AuthflowError::UpstreamUnavailable`] when the
    /// engine cannot be reached or answers with something unusable.
    async fn authorize(&self, parameters: &str) -> Result<EngineVerdict>;

    /// Issues the authorization response for `ticket`.
    async fn issue(&self, ticket: &str, issuance: &Issuance) -> Result<EngineResponse>;

    /// Fails the authorization request for `ticket`.
    async fn fail(&self, ticket: &str, reason: FailReason) -> Result<EngineResponse>;

    /// Finalizes an authorization after the user's decision.
    async fn finalize(&self, decision: &Decision) -> Result<EngineResponse> {
        let ticket = &decision.context.ticket;
        match decision.disposition() {
            Disposition::Issue(issuance) => self.issue(ticket, &issuance).await,
            Disposition::Fail(reason) => self.fail(ticket, reason).await,
        }
    }

    /// Finalizes an authorization that allows no user interaction.
    async fn finalize_no_interaction(
        &self,
        context: &AuthorizationContext,
        verdict: &NoInteractionVerdict,
    ) -> Result<EngineResponse> {
        match verdict.disposition(context, Utc::now()) {
            Disposition::Issue(issuance) => self.issue(&context.ticket, &issuance).await,
            Disposition::Fail(reason) => self.fail(&context.ticket, reason).await,
        }
    }

    /// Submits a token request.
    async fn token(&self, request: &ClientRequest) -> Result<TokenOutcome>;

    /// Issues tokens after local password verification.
    async fn issue_token(&self, ticket: &str, subject: &str) -> Result<EngineResponse>;

    /// Fails a token request after local password verification.
    async fn fail_token(&self, ticket: &str, reason: TokenFailReason) -> Result<EngineResponse>;

    /// Submits a revocation request.
    async fn revocation(&self, request: &ClientRequest) -> Result<EngineResponse>;

    /// Submits an introspection request.
    async fn introspection(&self, parameters: &str) -> Result<EngineResponse>;

    /// Fetches the JWK Set document.
    async fn jwks(&self) -> Result<EngineResponse>;

    /// Fetches the OpenID Provider configuration document.
    async fn configuration(&self) -> Result<EngineResponse>;
}
