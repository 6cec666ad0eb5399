/*!
Command handlers for the CLI

This module provides the handlers invoked by the CLI entrypoint:

- `serve` -- run the authorization server
- `check_config` -- validate configuration and print a summary
- `hash_password` -- produce a digest for the `users` section
*/

use crate::config::Config;
use crate::error::Result;

// Server command handler
pub mod serve {
    //! Runs the HTTP server until interrupted.

    use super::*;

    /// Start the authorization server
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be started
    pub async fn run_serve(config: Config) -> Result<()> {
        tracing::info!(
            users = config.users.len(),
            strict = config.interaction.strict_authentication,
            "Starting authorization server"
        );
        crate::server::serve(config).await
    }
}

// Configuration check command handler
pub mod check_config {
    //! Prints the effective configuration without secrets.

    use super::*;
    use crate::config::SessionBackend;

    /// Render the configuration summary
    ///
    /// Secrets and password digests are never included.
    pub fn summary(config: &Config) -> String {
        let backend = match config.session.backend {
            SessionBackend::Memory => "memory".to_string(),
            SessionBackend::Sled => format!(
                "sled ({})",
                config
                    .session
                    .path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            ),
        };

        let mut lines = vec![
            format!("bind:                 {}", config.server.bind),
            format!("path prefix:          {}", config.server.path_prefix),
            format!("session cookie:       {}", config.server.session_cookie),
            format!("session ttl:          {}s", config.server.session_ttl_seconds),
            format!("secure cookie:        {}", config.server.secure_cookie),
            format!("session backend:      {}", backend),
            format!("upstream:             {}", config.upstream.base_url),
            format!(
                "upstream credentials: {}",
                if config.upstream.api_key.is_empty() {
                    "not set"
                } else {
                    "set"
                }
            ),
            format!("upstream timeout:     {}s", config.upstream.timeout_seconds),
            format!(
                "strict login:         {}",
                config.interaction.strict_authentication
            ),
            format!("users:                {}", config.users.len()),
        ];
        for user in &config.users {
            lines.push(format!("  - {} (subject {})", user.login_id, user.subject));
        }
        lines.push(format!(
            "introspection:        {} caller(s)",
            config.introspection_callers.len()
        ));
        lines.join("\n")
    }

    /// Print the configuration summary
    pub fn run_check_config(config: &Config) -> Result<()> {
        println!("Configuration OK\n{}", summary(config));
        Ok(())
    }

}

// Password digest command handler
pub mod hash_password {
    //! Prints the SHA-256 digest stored in `users[].password_sha256`.

    use super::*;
    use crate::credentials::password_digest;

    /// Print the digest of `password`
    pub fn run_hash_password(password: &str) -> Result<()> {
        println!("{}", password_digest(password));
        Ok(())
    }
}
