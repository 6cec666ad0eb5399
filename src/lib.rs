//! Authflow - OAuth 2.0 / OpenID Connect authorization front end
//!
//! This library sits between user agents and an authorization engine. The
//! engine validates requests and mints codes and tokens; Authflow owns the
//! user-facing half of the flow: the authorization page, the login form,
//! the session-backed authentication cache and the resumption of a pending
//! request once the user has decided.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `authorization`: Dispatch, freshness policy, no-interaction resolution
//!   and decision collection
//! - `session`: Browser session storage (in-memory and `sled`)
//! - `upstream`: Authorization engine trait, HTTP client and test fake
//! - `server`: axum router, handlers and response mapping
//! - `identity` / `credentials`: End-user identities and credential lookup
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use authflow::cli::Cli;
//! use authflow::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cli = Cli::parse_args();
//!     let config = Config::load("config/config.yaml", &cli)?;
//!     config.validate()?;
//!     authflow::server::serve(config).await
//! }
//! ```

pub mod authorization;
pub mod cli;
pub mod commands;
pub mod config;
pub mod credentials;
pub mod error;
pub mod identity;
pub mod server;
pub mod session;
pub mod upstream;

// Re-export commonly used types
pub use authorization::{AuthorizationDispatcher, DecisionCollector};
pub use config::Config;
pub use error::{AuthflowError, Result};
pub use identity::Identity;
pub use session::{Session, SessionStore};
pub use upstream::AuthorizationEngine;

#[cfg(test)]
pub mod test_utils;
