//! End-user identity cached in the browser session
//!
//! An [`Identity`] is produced by a [`CredentialLookup`](crate::credentials::CredentialLookup)
//! and cached by the session; the orchestration core never constructs one
//! itself. Claims are stored by name, with language-tagged variants stored
//! under `name#tag` (the OpenID Connect convention, e.g. `name#ja`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An authenticated end-user.
///
/// # Examples
///
/// ```
/// use authflow::identity::Identity;
///
/// let user = Identity::new("1001")
///     .with_claim("name", "John Smith")
///     .with_claim("name#ja", "ジョン・スミス");
///
/// assert_eq!(user.subject, "1001");
/// assert_eq!(user.claim("name", Some("ja")).unwrap(), "ジョン・スミス");
/// assert_eq!(user.claim("name", Some("fr")).unwrap(), "John Smith");
/// assert!(user.claim("email", None).is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Unique, never reassigned identifier of the end-user.
    pub subject: String,

    /// Login identifier the user authenticated with, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_id: Option<String>,

    /// Claim values keyed by claim name (optionally `name#language-tag`).
    #[serde(default)]
    pub claims: BTreeMap<String, Value>,
}

impl Identity {
    /// Creates an identity with no claims.
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            login_id: None,
            claims: BTreeMap::new(),
        }
    }

    /// Sets the login identifier.
    pub fn with_login_id(mut self, login_id: impl Into<String>) -> Self {
        self.login_id = Some(login_id.into());
        self
    }

    /// Adds a claim value.
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.claims.insert(name.into(), value.into());
        self
    }

    /// Looks up a claim value.
    ///
    /// When `language_tag` is given, the tagged variant `name#tag` wins over
    /// the untagged value. The `sub` claim always resolves to the subject.
    pub fn claim(&self, name: &str, language_tag: Option<&str>) -> Option<Value> {
        if name == "sub" {
            return Some(Value::String(self.subject.clone()));
        }

        if let Some(tag) = language_tag.filter(|t| !t.is_empty()) {
            if let Some(value) = self.claims.get(&format!("{name}#{tag}")) {
                return Some(value.clone());
            }
        }

        self.claims.get(name).cloned()
    }

    /// Resolves a set of requested claims.
    ///
    /// Every locale in `locales` is tried in order before the untagged value.
    /// Claims the identity does not carry are omitted from the result.
    pub fn collect_claims(
        &self,
        names: &[String],
        locales: &[String],
    ) -> serde_json::Map<String, Value> {
        let mut out = serde_json::Map::new();
        for name in names {
            let value = locales
                .iter()
                .find_map(|tag| self.claims.get(&format!("{name}#{tag}")).cloned())
                .or_else(|| self.claim(name, None));
            if let Some(value) = value {
                out.insert(name.clone(), value);
            }
        }
        out
    }
}
