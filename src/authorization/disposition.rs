//! Final disposition of an authorization request
//!
//! Both the decision path and the no-interaction path end in either issuing
//! a response for an authenticated subject or failing with a reason the
//! engine turns into an OAuth error for the client.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reasons for failing an authorization request, as understood by the
/// engine's `/auth/authorization/fail` API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailReason {
    /// `prompt=none` but no user is logged in.
    NotLoggedIn,
    /// `prompt=none` and the cached authentication is older than `max_age`.
    ExceedsMaxAge,
    /// The user denied the request.
    Denied,
    /// The user approved but never authenticated.
    NotAuthenticated,
}

impl FailReason {
    /// Wire name of the reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotLoggedIn => "NOT_LOGGED_IN",
            Self::ExceedsMaxAge => "EXCEEDS_MAX_AGE",
            Self::Denied => "DENIED",
            Self::NotAuthenticated => "NOT_AUTHENTICATED",
        }
    }
}

impl std::fmt::Display for FailReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Evidence handed to the engine when issuing.
#[derive(Debug, Clone, PartialEq)]
pub struct Issuance {
    /// Subject of the authenticated user.
    pub subject: String,

    /// Authentication time in epoch seconds; zero when unknown.
    pub auth_time: i64,

    /// Requested claims resolved from the user's identity.
    pub claims: Map<String, Value>,
}

/// Issue or fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// Issue the authorization response.
    Issue(Issuance),
    /// Fail the authorization request.
    Fail(FailReason),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_reason_wire_names_match_serde() {
        for reason in [
            FailReason::NotLoggedIn,
            FailReason::ExceedsMaxAge,
            FailReason::Denied,
            FailReason::NotAuthenticated,
        ] {
            let json = serde_json::to_value(reason).unwrap();
            assert_eq!(json, Value::String(reason.as_str().to_string()));
        }
    }

    #[test]
    fn test_fail_reason_display() {
        assert_eq!(FailReason::Denied.to_string(), "DENIED");
    }
}
