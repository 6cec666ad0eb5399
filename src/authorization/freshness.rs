//! Freshness policy for the cached authentication
//!
//! Before the authorization page is shown, the cached identity is checked
//! against the request:
//!
//! 1. `prompt=login` forces re-authentication.
//! 2. A positive `max_age` forces re-authentication once the cached
//!    authentication is older than `max_age` seconds.
//!
//! Both checks always run. Either one clears `user` and `authTime` from the
//! session; clearing an already cleared session is a no-op.

use chrono::{DateTime, Utc};

use crate::authorization::context::{AuthorizationContext, Prompt};
use crate::error::Result;
use crate::session::{short_id, Session};

/// Why cached authentication was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// The request carried `prompt=login`.
    LoginPrompt,
    /// The authentication is older than the request's `max_age`.
    MaxAgeExceeded {
        /// Seconds since authentication (rounded).
        age: i64,
        /// The request's `max_age`.
        max_age: i64,
    },
}

/// Result of applying the freshness policy to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FreshnessOutcome {
    /// The session held neither a user nor an authentication time.
    NothingCached,
    /// The cached authentication may be reused.
    Fresh,
    /// The cached authentication was cleared.
    Cleared(Vec<StaleReason>),
}

/// Seconds elapsed between `auth_time` and `now`, rounded to the nearest
/// second (halves round up).
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use authflow::authorization::freshness::authentication_age;
///
/// let now = Utc::now();
/// assert_eq!(authentication_age(now - Duration::milliseconds(1499), now), 1);
/// assert_eq!(authentication_age(now - Duration::milliseconds(1500), now), 2);
/// ```
pub fn authentication_age(auth_time: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (now - auth_time).num_milliseconds();
    (millis + 500).div_euclid(1000)
}

/// Runs both freshness checks without touching the session.
///
/// `auth_time` is `None` when the session caches a user but no
/// authentication time; only the prompt check can fire then.
pub fn assess(
    context: &AuthorizationContext,
    auth_time: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Vec<StaleReason> {
    let mut reasons = Vec::new();

    if context.has_prompt(Prompt::Login) {
        reasons.push(StaleReason::LoginPrompt);
    }

    if let (Some(max_age), Some(auth_time)) = (context.max_age_limit(), auth_time) {
        let age = authentication_age(auth_time, now);
        if age > max_age {
            reasons.push(StaleReason::MaxAgeExceeded { age, max_age });
        }
    }

    reasons
}

/// Applies the freshness policy to `session`, clearing the cached
/// authentication when any check fires.
pub async fn apply_freshness_policy(
    context: &AuthorizationContext,
    session: &Session,
    now: DateTime<Utc>,
) -> Result<FreshnessOutcome> {
    let user = session.user().await?;
    let auth_time = session.auth_time().await?;

    if user.is_none() && auth_time.is_none() {
        return Ok(FreshnessOutcome::NothingCached);
    }

    let reasons = assess(context, auth_time, now);
    if reasons.is_empty() {
        return Ok(FreshnessOutcome::Fresh);
    }

    session.clear_authentication().await?;
    tracing::info!(
        session = short_id(session.id()),
        subject = user.as_ref().map(|u| u.subject.as_str()).unwrap_or("-"),
        ?reasons,
        "Cleared cached authentication"
    );
    Ok(FreshnessOutcome::Cleared(reasons))
}
