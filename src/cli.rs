//! Command-line interface definition for Authflow
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands to run the server, check configuration and
//! produce credential digests.

use clap::{Parser, Subcommand};

/// Authflow - OAuth 2.0 / OpenID Connect authorization front end
///
/// Serves the authorization, decision and pass-through endpoints in front
/// of an authorization engine.
#[derive(Parser, Debug, Clone)]
#[command(name = "authflow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Authflow
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Override the listen address from config (e.g. 0.0.0.0:1902)
        #[arg(short, long)]
        bind: Option<String>,

        /// Override the authorization engine base URL from config
        #[arg(long)]
        upstream: Option<String>,
    },

    /// Load and validate the configuration, then print a summary
    CheckConfig,

    /// Print the SHA-256 digest of a password for the `users` section
    HashPassword {
        /// Plaintext password
        password: String,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_with_overrides() {
        let cli = Cli::try_parse_from([
            "authflow",
            "--config",
            "custom.yaml",
            "serve",
            "--bind",
            "0.0.0.0:8080",
            "--upstream",
            "http://localhost:9000",
        ])
        .unwrap();

        assert_eq!(cli.config.as_deref(), Some("custom.yaml"));
        match cli.command {
            Commands::Serve { bind, upstream } => {
                assert_eq!(bind.as_deref(), Some("0.0.0.0:8080"));
                assert_eq!(upstream.as_deref(), Some("http://localhost:9000"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_default_config_path() {
        let cli = Cli::try_parse_from(["authflow", "check-config"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some("config/config.yaml"));
        assert!(matches!(cli.command, Commands::CheckConfig));
    }

    #[test]
    fn test_parse_hash_password() {
        let cli = Cli::try_parse_from(["authflow", "--json-logs", "hash-password", "s3cret"]).unwrap();
        assert!(cli.json_logs);
        assert!(matches!(cli.command, Commands::HashPassword { ref password } if password == "s3cret"));
    }

    #[test]
    fn test_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["authflow"]).is_err());
    }
}
