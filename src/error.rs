//! Error types for Authflow
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use axum::http::StatusCode;
use thiserror::Error;

/// Main error type for Authflow operations
///
/// Orchestration failures (`UpstreamUnavailable`, `MissingPendingRequest`,
/// `AuthenticationFailed`) are the outcomes the HTTP layer maps to
/// responses. Error actions reported by the engine are not errors here; they
/// arrive as [`crate::upstream::EngineVerdict::Error`] and are delivered as
/// is. The remaining variants cover configuration, session storage and
/// serialization.
#[derive(Error, Debug)]
pub enum AuthflowError {
    /// Transport or protocol failure talking to the authorization engine
    #[error("Authorization engine unavailable: {0}")]
    UpstreamUnavailable(String),

    /// A decision was submitted but the session holds no pending request
    #[error("No pending authorization request in the session")]
    MissingPendingRequest,

    /// Submitted credentials did not match any known user
    #[error("Authentication failed for login id: {0}")]
    AuthenticationFailed(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Session store errors
    #[error("Session error: {0}")]
    Session(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl AuthflowError {
    /// HTTP status the interaction surface answers with for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingPendingRequest => StatusCode::BAD_REQUEST,
            Self::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Result type alias for Authflow operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation. Use
/// `downcast_ref::<AuthflowError>()` to classify a failure.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_unavailable_display() {
        let error = AuthflowError::UpstreamUnavailable("connection refused".to_string());
        assert_eq!(
            error.to_string(),
            "Authorization engine unavailable: connection refused"
        );
    }

    #[test]
    fn test_authentication_failed_display() {
        let error = AuthflowError::AuthenticationFailed("john".to_string());
        assert_eq!(error.to_string(), "Authentication failed for login id: john");
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_missing_pending_request_is_client_error() {
        let error = AuthflowError::MissingPendingRequest;
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upstream_errors_are_server_errors() {
        assert_eq!(
            AuthflowError::UpstreamUnavailable("timeout".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AuthflowError::Session("store closed".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_config_error_display() {
        let error = AuthflowError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: AuthflowError = io_error.into();
        assert!(matches!(error, AuthflowError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let error: AuthflowError = json_error.into();
        assert!(matches!(error, AuthflowError::Serialization(_)));
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = AuthflowError::MissingPendingRequest.into();
        assert!(matches!(
            err.downcast_ref::<AuthflowError>(),
            Some(AuthflowError::MissingPendingRequest)
        ));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AuthflowError>();
    }
}
