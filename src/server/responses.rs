//! Conversion of engine responses and errors into HTTP responses
//!
//! Every response produced here carries `Cache-Control: no-store` and
//! `Pragma: no-cache`, as required for token and authorization responses.

use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE, LOCATION, PRAGMA, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::AuthflowError;
use crate::upstream::{EngineResponse, ResponseAction};

const JSON_UTF8: &str = "application/json;charset=UTF-8";
const HTML_UTF8: &str = "text/html;charset=UTF-8";

fn no_store_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

/// Merges `extra` (e.g. `Set-Cookie`) into `response`.
pub fn with_headers(mut response: Response, extra: HeaderMap) -> Response {
    response.headers_mut().extend(extra);
    response
}

/// `200 OK` with an HTML body.
pub fn html(body: String) -> Response {
    let mut headers = no_store_headers();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(HTML_UTF8));
    (StatusCode::OK, headers, body).into_response()
}

/// JSON body with the given status.
pub fn json(status: StatusCode, body: String) -> Response {
    let mut headers = no_store_headers();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_UTF8));
    (status, headers, body).into_response()
}

/// `401 Unauthorized` with a Basic challenge for `realm`.
pub fn basic_challenge(realm: &str) -> Response {
    let mut response = json(
        StatusCode::UNAUTHORIZED,
        serde_json::json!({ "error": "unauthorized" }).to_string(),
    );
    if let Ok(value) = HeaderValue::from_str(&format!("Basic realm=\"{realm}\"")) {
        response.headers_mut().insert(WWW_AUTHENTICATE, value);
    }
    response
}

/// Delivers an engine response according to its action.
pub fn engine_response(response: EngineResponse) -> Response {
    let content = response.content.unwrap_or_default();

    match response.action {
        ResponseAction::Ok => json(StatusCode::OK, content),
        ResponseAction::NoContent => (StatusCode::NO_CONTENT, no_store_headers()).into_response(),
        ResponseAction::BadRequest => json(StatusCode::BAD_REQUEST, content),
        ResponseAction::InvalidClient => {
            let mut response = json(StatusCode::UNAUTHORIZED, content);
            response.headers_mut().insert(
                WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"authflow\""),
            );
            response
        }
        ResponseAction::Unauthorized => json(StatusCode::UNAUTHORIZED, content),
        ResponseAction::Forbidden => json(StatusCode::FORBIDDEN, content),
        ResponseAction::InternalServerError => json(StatusCode::INTERNAL_SERVER_ERROR, content),
        ResponseAction::Form => html(content),
        ResponseAction::Location => match HeaderValue::from_str(&content) {
            Ok(location) => {
                let mut headers = no_store_headers();
                headers.insert(LOCATION, location);
                (StatusCode::FOUND, headers).into_response()
            }
            Err(e) => {
                tracing::error!("Engine returned an unusable redirect location: {}", e);
                error_response(&AuthflowError::UpstreamUnavailable(
                    "invalid redirect location".to_string(),
                ))
            }
        },
    }
}

/// Maps an orchestration error to an HTTP response.
pub fn error_response(error: &AuthflowError) -> Response {
    let status = error.status_code();
    let code = match error {
        AuthflowError::MissingPendingRequest => "invalid_request",
        AuthflowError::AuthenticationFailed(_) => "access_denied",
        _ => "server_error",
    };

    if status.is_server_error() {
        tracing::error!(error = %error, "Request failed");
    } else {
        tracing::warn!(error = %error, "Request rejected");
    }

    json(
        status,
        serde_json::json!({ "error": code, "error_description": error.to_string() }).to_string(),
    )
}

/// Maps any failure to an HTTP response, classifying [`AuthflowError`]s.
pub fn failure_response(error: anyhow::Error) -> Response {
    if let Some(error) = error.downcast_ref::<AuthflowError>() {
        return error_response(error);
    }

    tracing::error!(error = %error, "Request failed");
    json(
        StatusCode::INTERNAL_SERVER_ERROR,
        serde_json::json!({ "error": "server_error", "error_description": error.to_string() })
            .to_string(),
    )
}
