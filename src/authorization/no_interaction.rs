//! Resolution of authorization requests that allow no user interaction
//!
//! When the engine answers `NO_INTERACTION` (the request carried
//! `prompt=none`), the outcome depends only on what the session already
//! knows: a cached identity means the user is authenticated.

use chrono::{DateTime, Utc};

use crate::authorization::context::AuthorizationContext;
use crate::authorization::disposition::{Disposition, FailReason, Issuance};
use crate::error::Result;
use crate::identity::Identity;
use crate::session::{short_id, Session};

/// What the session knows about the user, for a no-interaction request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoInteractionVerdict {
    /// Cached identity, if any.
    pub identity: Option<Identity>,

    /// Cached authentication instant, if any.
    pub auth_time: Option<DateTime<Utc>>,
}

impl NoInteractionVerdict {
    /// `true` iff an identity is cached.
    pub fn is_authenticated(&self) -> bool {
        self.subject().is_some()
    }

    /// Subject of the cached identity.
    pub fn subject(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.subject.as_str())
    }

    /// Authentication time in epoch seconds; zero unless both an identity
    /// and an authentication instant are cached.
    pub fn authenticated_at(&self) -> i64 {
        match (&self.identity, self.auth_time) {
            (Some(_), Some(at)) => at.timestamp(),
            _ => 0,
        }
    }

    /// Looks up a claim of the cached identity.
    pub fn claim(&self, name: &str, language_tag: Option<&str>) -> Option<serde_json::Value> {
        self.identity.as_ref()?.claim(name, language_tag)
    }

    /// Decides whether the engine may complete the request silently.
    ///
    /// Fails with `NOT_LOGGED_IN` when no identity is cached and with
    /// `EXCEEDS_MAX_AGE` when the request's `max_age` has elapsed since
    /// authentication.
    pub fn disposition(&self, context: &AuthorizationContext, now: DateTime<Utc>) -> Disposition {
        let Some(identity) = &self.identity else {
            return Disposition::Fail(FailReason::NotLoggedIn);
        };

        let auth_time = self.authenticated_at();
        if let Some(max_age) = context.max_age_limit() {
            if auth_time.saturating_add(max_age) < now.timestamp() {
                return Disposition::Fail(FailReason::ExceedsMaxAge);
            }
        }

        Disposition::Issue(Issuance {
            subject: identity.subject.clone(),
            auth_time,
            claims: identity.collect_claims(&context.claims, &context.claims_locales),
        })
    }
}

/// Reads the cached authentication from the session.
///
/// Never mutates the session and never touches the pending request.
pub async fn resolve(session: &Session) -> Result<NoInteractionVerdict> {
    let verdict = NoInteractionVerdict {
        identity: session.user().await?,
        auth_time: session.auth_time().await?,
    };

    tracing::debug!(
        session = short_id(session.id()),
        authenticated = verdict.is_authenticated(),
        auth_time = verdict.authenticated_at(),
        "Resolved no-interaction request"
    );

    Ok(verdict)
}
