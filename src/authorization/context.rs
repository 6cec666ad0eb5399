//! Authorization request context carried between the initial request and
//! the user's decision

use serde::{Deserialize, Serialize};

/// The `prompt` values defined by OpenID Connect Core 1.0, section 3.1.2.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Prompt {
    /// No user interface may be displayed.
    #[serde(alias = "none")]
    None,
    /// The user must re-authenticate.
    #[serde(alias = "login")]
    Login,
    /// The user must be asked for consent.
    #[serde(alias = "consent")]
    Consent,
    /// The user must be asked to pick an account.
    #[serde(alias = "select_account")]
    SelectAccount,
    /// The user should be offered account creation.
    #[serde(alias = "create")]
    Create,
    /// A value this server does not act on.
    #[serde(other)]
    Other,
}

/// The client application that sent the authorization request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client identifier.
    pub client_id: String,

    /// Human readable client name, when registered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
}

/// A scope requested by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    /// Scope name, e.g. `openid` or `profile`.
    pub name: String,

    /// Description shown on the consent page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Continuation of an in-flight authorization request.
///
/// Produced by the authorization engine on first contact and stored in the
/// session as the pending request while the user decides.
///
/// # Examples
///
/// ```
/// use authflow::authorization::context::{AuthorizationContext, ClientInfo, Prompt};
///
/// let ctx = AuthorizationContext {
///     ticket: "ticket-1".to_string(),
///     client: ClientInfo { client_id: "client".to_string(), client_name: None },
///     prompts: vec![Prompt::Login],
///     acrs: vec![],
///     max_age: 0,
///     scopes: vec![],
///     claims: vec![],
///     claims_locales: vec![],
/// };
///
/// assert!(ctx.has_prompt(Prompt::Login));
/// assert!(ctx.max_age_limit().is_none());
/// assert_eq!(ctx.client_display_name(), "client");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationContext {
    /// Opaque continuation token issued by the engine.
    pub ticket: String,

    /// The requesting client.
    pub client: ClientInfo,

    /// Requested prompts.
    #[serde(default)]
    pub prompts: Vec<Prompt>,

    /// Requested authentication context class references.
    #[serde(default)]
    pub acrs: Vec<String>,

    /// Maximum authentication age in seconds; zero or negative means
    /// unconstrained.
    #[serde(default)]
    pub max_age: i64,

    /// Requested scopes.
    #[serde(default)]
    pub scopes: Vec<Scope>,

    /// Names of the claims to embed in the ID token.
    #[serde(default)]
    pub claims: Vec<String>,

    /// Preferred claim languages, most preferred first.
    #[serde(default)]
    pub claims_locales: Vec<String>,
}

impl AuthorizationContext {
    /// Returns `true` if `prompt` was requested.
    pub fn has_prompt(&self, prompt: Prompt) -> bool {
        self.prompts.contains(&prompt)
    }

    /// The max-age constraint, or `None` when unconstrained.
    pub fn max_age_limit(&self) -> Option<i64> {
        (self.max_age > 0).then_some(self.max_age)
    }

    /// Client name for display, falling back to the client id.
    pub fn client_display_name(&self) -> &str {
        self.client
            .client_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.client.client_id)
    }
}
