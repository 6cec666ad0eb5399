//! Credential lookup for end-user authentication
//!
//! The orchestration core only needs to turn a `(login_id, password)` pair
//! into an [`Identity`]. [`CredentialLookup`] is that seam; [`ConfiguredUsers`]
//! implements it over the `users` section of the configuration, where
//! passwords are stored as SHA-256 hex digests.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::config::UserConfig;
use crate::error::Result;
use crate::identity::Identity;

/// Resolves end-user credentials to an identity.
#[async_trait]
pub trait CredentialLookup: Send + Sync {
    /// Returns the identity owning the credentials, or `None` when no user
    /// matches.
    async fn lookup(&self, login_id: &str, password: &str) -> Result<Option<Identity>>;
}

/// Computes the lowercase hex SHA-256 digest of a password.
///
/// # Examples
///
/// ```
/// use authflow::credentials::password_digest;
///
/// assert_eq!(
///     password_digest("john"),
///     "96d9632f363564cc3032521409cf22a852f2032eec099ed5967c0d000cec607a"
/// );
/// ```
pub fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Checks `secret` against a stored hex SHA-256 digest in constant time.
///
/// A stored digest that is not valid hex never matches.
///
/// # Examples
///
/// ```
/// use authflow::credentials::{password_digest, verify_digest};
///
/// let stored = password_digest("s3cret");
/// assert!(verify_digest(&stored, "s3cret"));
/// assert!(verify_digest(&stored.to_uppercase(), "s3cret"));
/// assert!(!verify_digest(&stored, "guess"));
/// ```
pub fn verify_digest(stored_hex: &str, secret: &str) -> bool {
    let Ok(stored) = hex::decode(stored_hex) else {
        return false;
    };
    let computed = Sha256::digest(secret.as_bytes());
    stored.as_slice().ct_eq(computed.as_slice()).into()
}

/// In-memory user table built from configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredUsers {
    users: Vec<UserConfig>,
}

impl ConfiguredUsers {
    /// Creates a lookup over the given users.
    pub fn new(users: Vec<UserConfig>) -> Self {
        Self { users }
    }

    /// Number of known users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns `true` when no users are configured.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn to_identity(user: &UserConfig) -> Identity {
        Identity {
            subject: user.subject.clone(),
            login_id: Some(user.login_id.clone()),
            claims: user.claims.clone(),
        }
    }
}

#[async_trait]
impl CredentialLookup for ConfiguredUsers {
    async fn lookup(&self, login_id: &str, password: &str) -> Result<Option<Identity>> {
        let found = self
            .users
            .iter()
            .find(|u| u.login_id == login_id && verify_digest(&u.password_sha256, password));

        match found {
            Some(user) => {
                tracing::debug!(subject = %user.subject, "Credentials matched");
                Ok(Some(Self::to_identity(user)))
            }
            None => {
                tracing::debug!(login_id, "No user matches the submitted credentials");
                Ok(None)
            }
        }
    }
}
