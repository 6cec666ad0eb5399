//! Configuration management for Authflow
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cli::{Cli, Commands};
use crate::error::{AuthflowError, Result};

/// Main configuration structure for Authflow
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listener and cookie settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Session store backend
    #[serde(default)]
    pub session: SessionConfig,

    /// Authorization engine connection
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Interaction policy
    #[serde(default)]
    pub interaction: InteractionConfig,

    /// End-users accepted by the login form and the password grant
    #[serde(default)]
    pub users: Vec<UserConfig>,

    /// Callers allowed to use the introspection endpoint
    #[serde(default)]
    pub introspection_callers: Vec<CallerConfig>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Prefix under which the API endpoints are mounted
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,

    /// Name of the session cookie
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,

    /// Idle lifetime of a browser session (seconds)
    #[serde(default = "default_session_ttl")]
    pub session_ttl_seconds: u64,

    /// Mark the session cookie `Secure`
    #[serde(default)]
    pub secure_cookie: bool,
}

fn default_bind() -> String {
    "127.0.0.1:1902".to_string()
}

fn default_path_prefix() -> String {
    "/api".to_string()
}

fn default_session_cookie() -> String {
    "authflow_session".to_string()
}

fn default_session_ttl() -> u64 {
    3600
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            path_prefix: default_path_prefix(),
            session_cookie: default_session_cookie(),
            session_ttl_seconds: default_session_ttl(),
            secure_cookie: false,
        }
    }
}

/// Session store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionBackend {
    /// Process-local map; sessions are lost on restart
    #[default]
    Memory,
    /// Embedded `sled` database at `session.path`
    Sled,
}

/// Session store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Backend to use
    #[serde(default)]
    pub backend: SessionBackend,

    /// Database directory for the `sled` backend
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Authorization engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the engine API
    #[serde(default = "default_upstream_url")]
    pub base_url: String,

    /// Service API key (HTTP Basic user)
    #[serde(default)]
    pub api_key: String,

    /// Service API secret (HTTP Basic password)
    #[serde(default)]
    pub api_secret: String,

    /// Timeout for a single engine call (seconds)
    #[serde(default = "default_upstream_timeout")]
    pub timeout_seconds: u64,
}

fn default_upstream_url() -> String {
    "https://api.authlete.com".to_string()
}

fn default_upstream_timeout() -> u64 {
    10
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_url(),
            api_key: String::new(),
            api_secret: String::new(),
            timeout_seconds: default_upstream_timeout(),
        }
    }
}

/// Interaction policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionConfig {
    /// Re-render the authorization page when submitted credentials are
    /// wrong instead of continuing unauthenticated
    #[serde(default = "default_strict_authentication")]
    pub strict_authentication: bool,
}

fn default_strict_authentication() -> bool {
    true
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            strict_authentication: default_strict_authentication(),
        }
    }
}

/// A configured end-user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    /// Subject identifier
    pub subject: String,

    /// Login identifier typed into the form
    pub login_id: String,

    /// Lowercase hex SHA-256 of the password
    pub password_sha256: String,

    /// Claim values, language-tagged as `name#tag`
    #[serde(default)]
    pub claims: BTreeMap<String, serde_json::Value>,
}

/// A caller allowed to use the introspection endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallerConfig {
    /// HTTP Basic user id
    pub id: String,

    /// Lowercase hex SHA-256 of the HTTP Basic password
    pub secret_sha256: String,
}

impl Config {
    /// Load configuration from file, environment, and CLI
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML configuration file
    /// * `cli` - Parsed command line used for overrides
    ///
    /// # Errors
    ///
    /// Returns `AuthflowError::Config` if the file exists but cannot be read
    /// or parsed
    pub fn load(path: &str, cli: &Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AuthflowError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| AuthflowError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(bind) = std::env::var("AUTHFLOW_BIND") {
            self.server.bind = bind;
        }

        if let Ok(secure) = std::env::var("AUTHFLOW_SECURE_COOKIE") {
            match secure.parse::<bool>() {
                Ok(v) => self.server.secure_cookie = v,
                Err(_) => tracing::warn!("Invalid AUTHFLOW_SECURE_COOKIE: {}", secure),
            }
        }

        if let Ok(backend) = std::env::var("AUTHFLOW_SESSION_BACKEND") {
            self.session.backend = match backend.to_lowercase().as_str() {
                "memory" => SessionBackend::Memory,
                "sled" => SessionBackend::Sled,
                _ => {
                    tracing::warn!("Invalid session backend: {}, using default", backend);
                    SessionBackend::default()
                }
            };
        }

        if let Ok(path) = std::env::var("AUTHFLOW_SESSION_PATH") {
            self.session.path = Some(PathBuf::from(path));
        }

        if let Ok(url) = std::env::var("AUTHFLOW_UPSTREAM_URL") {
            self.upstream.base_url = url;
        }

        if let Ok(key) = std::env::var("AUTHFLOW_API_KEY") {
            self.upstream.api_key = key;
        }

        if let Ok(secret) = std::env::var("AUTHFLOW_API_SECRET") {
            self.upstream.api_secret = secret;
        }

        if let Ok(timeout) = std::env::var("AUTHFLOW_UPSTREAM_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.upstream.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid AUTHFLOW_UPSTREAM_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(strict) = std::env::var("AUTHFLOW_STRICT_AUTHENTICATION") {
            match strict.parse::<bool>() {
                Ok(v) => {
                    self.interaction.strict_authentication = v;
                    tracing::debug!(strict = v, "Env override: AUTHFLOW_STRICT_AUTHENTICATION");
                }
                Err(_) => tracing::warn!("Invalid AUTHFLOW_STRICT_AUTHENTICATION: {}", strict),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Commands::Serve { bind, upstream } = &cli.command {
            if let Some(bind) = bind {
                self.server.bind = bind.clone();
            }
            if let Some(upstream) = upstream {
                self.upstream.base_url = upstream.clone();
            }
        }
    }

    /// Parsed listen address
    ///
    /// # Errors
    ///
    /// Returns `AuthflowError::Config` if `server.bind` is not a socket address
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server.bind.parse().map_err(|e| {
            AuthflowError::Config(format!("Invalid server.bind '{}': {}", self.server.bind, e))
                .into()
        })
    }

    /// Validate the configuration
    ///
    /// Ensures all configuration values are within acceptable ranges
    /// and that required fields are properly set.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        self.bind_addr()?;

        let prefix = &self.server.path_prefix;
        if !prefix.is_empty() && (!prefix.starts_with('/') || prefix.ends_with('/')) {
            return Err(AuthflowError::Config(format!(
                "server.path_prefix must be empty or start with '/' and not end with '/': {}",
                prefix
            ))
            .into());
        }

        let cookie = &self.server.session_cookie;
        if cookie.is_empty()
            || cookie
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, ';' | '=' | ','))
        {
            return Err(AuthflowError::Config(format!(
                "Invalid server.session_cookie name: '{}'",
                cookie
            ))
            .into());
        }

        if self.server.session_ttl_seconds == 0 {
            return Err(AuthflowError::Config(
                "server.session_ttl_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.session.backend == SessionBackend::Sled && self.session.path.is_none() {
            return Err(AuthflowError::Config(
                "session.path is required for the sled backend".to_string(),
            )
            .into());
        }

        let url = url::Url::parse(&self.upstream.base_url).map_err(|e| {
            AuthflowError::Config(format!(
                "Invalid upstream.base_url '{}': {}",
                self.upstream.base_url, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AuthflowError::Config(format!(
                "upstream.base_url must use http or https: {}",
                self.upstream.base_url
            ))
            .into());
        }

        if self.upstream.timeout_seconds == 0 || self.upstream.timeout_seconds > 300 {
            return Err(AuthflowError::Config(
                "upstream.timeout_seconds must be between 1 and 300".to_string(),
            )
            .into());
        }

        let mut login_ids = HashSet::new();
        for user in &self.users {
            if user.subject.is_empty() || user.login_id.is_empty() {
                return Err(AuthflowError::Config(
                    "users entries require a subject and a login_id".to_string(),
                )
                .into());
            }
            if !login_ids.insert(user.login_id.as_str()) {
                return Err(AuthflowError::Config(format!(
                    "Duplicate login_id in users: {}",
                    user.login_id
                ))
                .into());
            }
            if !is_sha256_hex(&user.password_sha256) {
                return Err(AuthflowError::Config(format!(
                    "users[{}].password_sha256 must be 64 hex characters",
                    user.login_id
                ))
                .into());
            }
        }

        for caller in &self.introspection_callers {
            if caller.id.is_empty() || !is_sha256_hex(&caller.secret_sha256) {
                return Err(AuthflowError::Config(format!(
                    "Invalid introspection caller entry: '{}'",
                    caller.id
                ))
                .into());
            }
        }

        Ok(())
    }
}

fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64 && value.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::password_digest;
    use clap::Parser;
    use serial_test::serial;

    fn serve_cli(bind: Option<&str>, upstream: Option<&str>) -> Cli {
        Cli {
            config: None,
            verbose: false,
            json_logs: false,
            command: Commands::Serve {
                bind: bind.map(str::to_string),
                upstream: upstream.map(str::to_string),
            },
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.bind, "127.0.0.1:1902");
        assert_eq!(config.server.path_prefix, "/api");
        assert_eq!(config.session.backend, SessionBackend::Memory);
        assert_eq!(config.upstream.timeout_seconds, 10);
        assert!(config.interaction.strict_authentication);
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_bind() {
        let mut config = Config::default();
        config.server.bind = "localhost".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_prefix() {
        let mut config = Config::default();
        config.server.path_prefix = "api".to_string();
        assert!(config.validate().is_err());

        config.server.path_prefix = "/api/".to_string();
        assert!(config.validate().is_err());

        config.server.path_prefix = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_cookie_name() {
        let mut config = Config::default();
        config.server.session_cookie = "bad name".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_sled_requires_path() {
        let mut config = Config::default();
        config.session.backend = SessionBackend::Sled;
        assert!(config.validate().is_err());

        config.session.path = Some(PathBuf::from("/tmp/authflow-sessions"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_upstream_url() {
        let mut config = Config::default();
        config.upstream.base_url = "ftp://engine.example.com".to_string();
        assert!(config.validate().is_err());

        config.upstream.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let mut config = Config::default();
        config.upstream.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_duplicate_login_id() {
        let mut config = Config::default();
        let user = UserConfig {
            subject: "1".to_string(),
            login_id: "john".to_string(),
            password_sha256: password_digest("john"),
            claims: BTreeMap::new(),
        };
        config.users = vec![user.clone(), UserConfig { subject: "2".into(), ..user }];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_rejects_plaintext_password() {
        let mut config = Config::default();
        config.users = vec![UserConfig {
            subject: "1".to_string(),
            login_id: "john".to_string(),
            password_sha256: "john".to_string(),
            claims: BTreeMap::new(),
        }];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
server:
  bind: 0.0.0.0:8080
  session_ttl_seconds: 600
session:
  backend: sled
  path: /var/lib/authflow/sessions
upstream:
  base_url: http://localhost:9000
  api_key: "5593494640"
  api_secret: secret
interaction:
  strict_authentication: false
users:
  - subject: "1001"
    login_id: john
    password_sha256: 96d9632f363564cc3032521409cf22a852f2032eec099ed5967c0d000cec607a
    claims:
      name: John Smith
      "name#ja": ジョン・スミス
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.server.session_ttl_seconds, 600);
        assert_eq!(config.server.path_prefix, "/api");
        assert_eq!(config.session.backend, SessionBackend::Sled);
        assert_eq!(config.upstream.api_key, "5593494640");
        assert!(!config.interaction.strict_authentication);
        assert_eq!(config.users.len(), 1);
        assert_eq!(config.users[0].claims["name"], "John Smith");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_overrides_apply_to_serve() {
        let mut config = Config::default();
        config.apply_cli_overrides(&serve_cli(Some("0.0.0.0:9999"), Some("http://engine:1")));
        assert_eq!(config.server.bind, "0.0.0.0:9999");
        assert_eq!(config.upstream.base_url, "http://engine:1");
    }

    #[test]
    fn test_cli_overrides_ignored_for_other_commands() {
        let mut config = Config::default();
        let cli = Cli::try_parse_from(["authflow", "check-config"]).unwrap();
        config.apply_cli_overrides(&cli);
        assert_eq!(config.server.bind, "127.0.0.1:1902");
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var("AUTHFLOW_UPSTREAM_URL", "http://env-engine:9000");
        std::env::set_var("AUTHFLOW_STRICT_AUTHENTICATION", "false");
        std::env::set_var("AUTHFLOW_SESSION_BACKEND", "sled");
        std::env::set_var("AUTHFLOW_UPSTREAM_TIMEOUT_SECONDS", "not-a-number");

        let mut config = Config::default();
        config.apply_env_vars();

        std::env::remove_var("AUTHFLOW_UPSTREAM_URL");
        std::env::remove_var("AUTHFLOW_STRICT_AUTHENTICATION");
        std::env::remove_var("AUTHFLOW_SESSION_BACKEND");
        std::env::remove_var("AUTHFLOW_UPSTREAM_TIMEOUT_SECONDS");

        assert_eq!(config.upstream.base_url, "http://env-engine:9000");
        assert!(!config.interaction.strict_authentication);
        assert_eq!(config.session.backend, SessionBackend::Sled);
        assert_eq!(config.upstream.timeout_seconds, 10);
    }

    #[test]
    #[serial]
    fn test_load_missing_file_uses_defaults() {
        let cli = serve_cli(None, None);
        let config = Config::load("/nonexistent/authflow.yaml", &cli).unwrap();
        assert_eq!(config.server.session_cookie, "authflow_session");
    }
}
