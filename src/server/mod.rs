//! HTTP surface of the authorization server
//!
//! Endpoints are mounted under `server.path_prefix` (default `/api`):
//!
//! | Method   | Path                       | Handler                       |
//! |----------|----------------------------|-------------------------------|
//! | GET/POST | `/authorization`           | authorization request         |
//! | POST     | `/authorization/decision`  | user's decision               |
//! | POST     | `/token`                   | token request                 |
//! | POST     | `/revocation`              | token revocation              |
//! | POST     | `/introspection`           | token introspection           |
//! | GET      | `/jwks`                    | JWK Set document              |
//!
//! `GET /.well-known/openid-configuration` is served at the root.

pub mod authorization;
pub mod cookie;
pub mod endpoints;
pub mod render;
pub mod responses;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;

use crate::authorization::{AuthorizationDispatcher, DecisionCollector};
use crate::config::{CallerConfig, Config, SessionBackend};
use crate::credentials::{ConfiguredUsers, CredentialLookup};
use crate::error::{AuthflowError, Result};
use crate::session::{MemorySessionStore, SessionStore, SledSessionStore};
use crate::upstream::{AuthorizationEngine, HttpEngine};

use render::{HtmlRenderer, InteractionRenderer};

/// Request-independent settings the handlers need.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Mount point of the API routes.
    pub path_prefix: String,
    /// Session cookie name.
    pub session_cookie: String,
    /// Whether the session cookie is marked `Secure`.
    pub secure_cookie: bool,
    /// Callers allowed to introspect tokens.
    pub introspection_callers: Vec<CallerConfig>,
}

impl ServerSettings {
    /// Extracts the server settings from `config`.
    pub fn from_config(config: &Config) -> Self {
        Self {
            path_prefix: config.server.path_prefix.clone(),
            session_cookie: config.server.session_cookie.clone(),
            secure_cookie: config.server.secure_cookie,
            introspection_callers: config.introspection_callers.clone(),
        }
    }

    /// Absolute path of an API route.
    pub fn route_path(&self, route: &str) -> String {
        format!("{}{}", self.path_prefix, route)
    }
}

/// Shared state of all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Authorization engine.
    pub engine: Arc<dyn AuthorizationEngine>,
    /// Browser session storage.
    pub sessions: Arc<dyn SessionStore>,
    /// End-user credential lookup.
    pub credentials: Arc<dyn CredentialLookup>,
    /// Authorization request routing.
    pub dispatcher: Arc<AuthorizationDispatcher>,
    /// Decision handling.
    pub decisions: Arc<DecisionCollector>,
    /// Authorization page renderer.
    pub renderer: Arc<dyn InteractionRenderer>,
    /// Static settings.
    pub settings: Arc<ServerSettings>,
}

impl AppState {
    /// Wires the orchestration components together.
    ///
    /// # Arguments
    ///
    /// * `config` - Loaded configuration
    /// * `engine` - Authorization engine
    /// * `sessions` - Session store
    /// * `credentials` - Credential lookup for the login form and the
    ///   password grant
    pub fn new(
        config: &Config,
        engine: Arc<dyn AuthorizationEngine>,
        sessions: Arc<dyn SessionStore>,
        credentials: Arc<dyn CredentialLookup>,
    ) -> Self {
        Self {
            dispatcher: Arc::new(AuthorizationDispatcher::new(engine.clone())),
            decisions: Arc::new(DecisionCollector::new(
                engine.clone(),
                credentials.clone(),
                config.interaction.strict_authentication,
            )),
            engine,
            sessions,
            credentials,
            renderer: Arc::new(HtmlRenderer),
            settings: Arc::new(ServerSettings::from_config(config)),
        }
    }

    /// Replaces the authorization page renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn InteractionRenderer>) -> Self {
        self.renderer = renderer;
        self
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/authorization",
            get(authorization::authorization_get).post(authorization::authorization_post),
        )
        .route("/authorization/decision", post(authorization::decision))
        .route("/token", post(endpoints::token))
        .route("/revocation", post(endpoints::revocation))
        .route("/introspection", post(endpoints::introspection))
        .route("/jwks", get(endpoints::jwks));

    let root = Router::new().route(
        "/.well-known/openid-configuration",
        get(endpoints::configuration),
    );

    let prefix = state.settings.path_prefix.clone();
    let app = if prefix.is_empty() {
        root.merge(api)
    } else {
        root.nest(&prefix, api)
    };

    app.with_state(state)
}

/// Opens the configured session store.
///
/// # Errors
///
/// Returns `AuthflowError::Config` when the sled backend has no path, or
/// the store's error when it cannot be opened.
pub fn open_session_store(config: &Config) -> Result<Arc<dyn SessionStore>> {
    let ttl = config.server.session_ttl_seconds;
    match config.session.backend {
        SessionBackend::Memory => Ok(Arc::new(MemorySessionStore::new(Duration::from_secs(ttl)))),
        SessionBackend::Sled => {
            let path = config.session.path.as_ref().ok_or_else(|| {
                AuthflowError::Config("session.path is required for the sled backend".to_string())
            })?;
            Ok(Arc::new(SledSessionStore::open(path, ttl)?))
        }
    }
}

/// Runs the server until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the engine client, session store or listener cannot
/// be set up.
pub async fn serve(config: Config) -> Result<()> {
    let engine: Arc<dyn AuthorizationEngine> = Arc::new(HttpEngine::new(&config.upstream)?);
    let sessions = open_session_store(&config)?;
    let users = ConfiguredUsers::new(config.users.clone());
    if users.is_empty() {
        tracing::warn!("No users configured; nobody can log in");
    }
    let credentials: Arc<dyn CredentialLookup> = Arc::new(users);

    let state = AppState::new(&config, engine, sessions, credentials);
    let app = router(state);

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        prefix = %config.server.path_prefix,
        upstream = %config.upstream.base_url,
        backend = ?config.session.backend,
        "Authorization server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
