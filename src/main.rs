//! Authflow - OAuth 2.0 / OpenID Connect authorization front end
//!
#![doc = "Main entry point for the Authflow server."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use authflow::cli::{Cli, Commands};
use authflow::commands;
use authflow::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    // Digests need no configuration
    if let Commands::HashPassword { password } = &cli.command {
        return commands::hash_password::run_hash_password(password);
    }

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Serve { .. } => {
            tracing::info!("Starting server mode");
            commands::serve::run_serve(config).await?;
            Ok(())
        }
        Commands::CheckConfig => {
            tracing::debug!("Checking configuration at {}", config_path);
            commands::check_config::run_check_config(&config)?;
            Ok(())
        }
        Commands::HashPassword { .. } => Ok(()),
    }
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins over `--verbose`; `--json-logs` switches to JSON lines.
fn init_tracing(verbose: bool, json: bool) {
    let default_directive = if verbose { "authflow=debug" } else { "authflow=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
