//! Session cookie handling
//!
//! The cookie carries only the opaque session id. Unknown or expired ids
//! start a fresh session, and only then is a `Set-Cookie` header emitted.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};

use crate::error::{AuthflowError, Result};
use crate::session::Session;

use super::AppState;

/// Returns the value of cookie `name` from the request headers.
pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name && !value.is_empty()).then(|| value.to_string())
        })
}

/// Builds the `Set-Cookie` value for a session id.
pub fn session_cookie(name: &str, session_id: &str, secure: bool) -> Result<HeaderValue> {
    let secure = if secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{name}={session_id}; HttpOnly; SameSite=Lax; Path=/{secure}"
    ))
    .map_err(|e| AuthflowError::Session(format!("Invalid session cookie: {e}")).into())
}

/// Binds the request to its browser session, creating one when the cookie
/// is missing or stale.
///
/// # Returns
///
/// The session and, for a newly created session, the headers that set the
/// cookie on the user agent.
pub async fn resolve_session(state: &AppState, headers: &HeaderMap) -> Result<(Session, HeaderMap)> {
    let settings = &state.settings;
    let mut response_headers = HeaderMap::new();

    if let Some(id) = parse_cookie(headers, &settings.session_cookie) {
        if state.sessions.exists(&id).await? {
            return Ok((Session::new(state.sessions.clone(), id), response_headers));
        }
        tracing::debug!("Session cookie refers to an unknown session, starting a new one");
    }

    let session = Session::create(state.sessions.clone()).await?;
    response_headers.insert(
        SET_COOKIE,
        session_cookie(&settings.session_cookie, session.id(), settings.secure_cookie)?,
    );
    Ok((session, response_headers))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookie_finds_named_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; authflow_session=abc123; lang=en"),
        );
        assert_eq!(
            parse_cookie(&headers, "authflow_session").as_deref(),
            Some("abc123")
        );
        assert_eq!(parse_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_parse_cookie_across_multiple_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("a=1"));
        headers.append(COOKIE, HeaderValue::from_static("sid=xyz"));
        assert_eq!(parse_cookie(&headers, "sid").as_deref(), Some("xyz"));
    }

    #[test]
    fn test_parse_cookie_ignores_empty_value() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("sid="));
        assert_eq!(parse_cookie(&headers, "sid"), None);
    }

    #[test]
    fn test_session_cookie_flags() {
        let plain = session_cookie("sid", "abc", false).unwrap();
        assert_eq!(plain, "sid=abc; HttpOnly; SameSite=Lax; Path=/");

        let secure = session_cookie("sid", "abc", true).unwrap();
        assert!(secure.to_str().unwrap().ends_with("; Secure"));
    }
}
