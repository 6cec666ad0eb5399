//! Scripted in-process authorization engine
//!
//! `FakeEngine` answers authorization requests with queued verdicts and
//! records every call, so flows can be exercised without a network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    AuthorizationEngine, ClientRequest, EngineResponse, EngineVerdict, ResponseAction,
    TokenFailReason, TokenOutcome,
};
use crate::authorization::disposition::{FailReason, Issuance};
use crate::error::{AuthflowError, Result};

/// Redirect URI used in the responses the fake engine issues.
pub const FAKE_REDIRECT_URI: &str = "https://client.example.com/cb";

/// A call received by [`FakeEngine`].
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    /// `authorize(parameters)`
    Authorize(String),
    /// `issue(ticket, issuance)`
    Issue {
        /// Ticket
        ticket: String,
        /// Evidence
        issuance: Issuance,
    },
    /// `fail(ticket, reason)`
    Fail {
        /// Ticket
        ticket: String,
        /// Reason
        reason: FailReason,
    },
    /// `token(request)`
    Token(ClientRequest),
    /// `issue_token(ticket, subject)`
    IssueToken {
        /// Ticket
        ticket: String,
        /// Subject
        subject: String,
    },
    /// `fail_token(ticket, reason)`
    FailToken {
        /// Ticket
        ticket: String,
        /// Reason
        reason: TokenFailReason,
    },
    /// `revocation(request)`
    Revocation(ClientRequest),
    /// `introspection(parameters)`
    Introspection(String),
    /// `jwks()`
    Jwks,
    /// `configuration()`
    Configuration,
}

/// Scripted [`AuthorizationEngine`].
///
/// # Examples
///
/// ```
/// use authflow::upstream::fake::FakeEngine;
/// use authflow::upstream::{AuthorizationEngine, EngineVerdict};
///
/// # #[tokio::main]
/// # async fn main() {
/// let engine = FakeEngine::new();
/// let verdict = engine.authorize("response_type=code").await.unwrap();
/// assert!(matches!(verdict, EngineVerdict::Error(_)));
/// assert_eq!(engine.calls().len(), 1);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct FakeEngine {
    verdicts: Mutex<VecDeque<EngineVerdict>>,
    token_outcomes: Mutex<VecDeque<TokenOutcome>>,
    unavailable: AtomicBool,
    calls: Mutex<Vec<EngineCall>>,
}

impl FakeEngine {
    /// Creates an engine with nothing queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the verdict for the next `authorize` call.
    pub fn push_verdict(&self, verdict: EngineVerdict) -> &Self {
        lock(&self.verdicts).push_back(verdict);
        self
    }

    /// Queues the outcome for the next `token` call.
    pub fn push_token_outcome(&self, outcome: TokenOutcome) -> &Self {
        lock(&self.token_outcomes).push_back(outcome);
        self
    }

    /// Makes every subsequent call fail with `UpstreamUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// All calls received so far, oldest first.
    pub fn calls(&self) -> Vec<EngineCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: EngineCall) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AuthflowError::UpstreamUnavailable("fake engine is down".into()).into());
        }
        lock(&self.calls).push(call);
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn json(body: serde_json::Value) -> EngineResponse {
    EngineResponse::new(ResponseAction::Ok, body.to_string())
}

#[async_trait]
impl AuthorizationEngine for FakeEngine {
    async fn authorize(&self, parameters: &str) -> Result<EngineVerdict> {
        self.record(EngineCall::Authorize(parameters.to_string()))?;
        Ok(lock(&self.verdicts).pop_front().unwrap_or_else(|| {
            EngineVerdict::Error(EngineResponse::new(
                ResponseAction::BadRequest,
                r#"{"error":"invalid_request"}"#.to_string(),
            ))
        }))
    }

    async fn issue(&self, ticket: &str, issuance: &Issuance) -> Result<EngineResponse> {
        self.record(EngineCall::Issue {
            ticket: ticket.to_string(),
            issuance: issuance.clone(),
        })?;
        Ok(EngineResponse::new(
            ResponseAction::Location,
            format!("{FAKE_REDIRECT_URI}?code=code-{ticket}"),
        ))
    }

    async fn fail(&self, ticket: &str, reason: FailReason) -> Result<EngineResponse> {
        self.record(EngineCall::Fail {
            ticket: ticket.to_string(),
            reason,
        })?;
        let error = match reason {
            FailReason::NotLoggedIn => "login_required",
            FailReason::ExceedsMaxAge => "login_required",
            FailReason::Denied => "access_denied",
            FailReason::NotAuthenticated => "access_denied",
        };
        Ok(EngineResponse::new(
            ResponseAction::Location,
            format!("{FAKE_REDIRECT_URI}?error={error}"),
        ))
    }

    async fn token(&self, request: &ClientRequest) -> Result<TokenOutcome> {
        self.record(EngineCall::Token(request.clone()))?;
        Ok(lock(&self.token_outcomes).pop_front().unwrap_or_else(|| {
            TokenOutcome::Response(json(serde_json::json!({
                "access_token": "fake-access-token",
                "token_type": "Bearer"
            })))
        }))
    }

    async fn issue_token(&self, ticket: &str, subject: &str) -> Result<EngineResponse> {
        self.record(EngineCall::IssueToken {
            ticket: ticket.to_string(),
            subject: subject.to_string(),
        })?;
        Ok(json(serde_json::json!({
            "access_token": format!("token-for-{subject}"),
            "token_type": "Bearer"
        })))
    }

    async fn fail_token(&self, ticket: &str, reason: TokenFailReason) -> Result<EngineResponse> {
        self.record(EngineCall::FailToken {
            ticket: ticket.to_string(),
            reason,
        })?;
        Ok(EngineResponse::new(
            ResponseAction::BadRequest,
            r#"{"error":"invalid_grant"}"#.to_string(),
        ))
    }

    async fn revocation(&self, request: &ClientRequest) -> Result<EngineResponse> {
        self.record(EngineCall::Revocation(request.clone()))?;
        Ok(EngineResponse::new(ResponseAction::Ok, None::<String>))
    }

    async fn introspection(&self, parameters: &str) -> Result<EngineResponse> {
        self.record(EngineCall::Introspection(parameters.to_string()))?;
        Ok(json(serde_json::json!({ "active": true })))
    }

    async fn jwks(&self) -> Result<EngineResponse> {
        self.record(EngineCall::Jwks)?;
        Ok(json(serde_json::json!({ "keys": [] })))
    }

    async fn configuration(&self) -> Result<EngineResponse> {
        self.record(EngineCall::Configuration)?;
        Ok(json(serde_json::json!({ "issuer": "https://as.example.com" })))
    }
}
