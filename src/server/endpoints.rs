//! Token, revocation, introspection and discovery endpoint handlers
//!
//! These endpoints pass the request to the engine and deliver its answer;
//! the only local logic is client credential extraction, the password
//! grant's user check and the introspection caller check.

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::response::Response;
use base64::Engine as _;

use crate::credentials::{verify_digest, CredentialLookup};
use crate::error::Result;
use crate::upstream::{
    AuthorizationEngine, ClientRequest, EngineResponse, TokenFailReason, TokenOutcome,
};

use super::responses::{basic_challenge, engine_response, failure_response};
use super::AppState;

/// Credentials from an `Authorization: Basic` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    /// User id (client id for clients).
    pub user_id: String,
    /// Password (client secret for clients).
    pub password: String,
}

/// Parses an `Authorization: Basic` header.
///
/// Returns `None` when the header is missing, uses another scheme or is
/// malformed.
pub fn basic_credentials(headers: &HeaderMap) -> Option<BasicCredentials> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user_id, password) = decoded.split_once(':')?;

    Some(BasicCredentials {
        user_id: user_id.to_string(),
        password: password.to_string(),
    })
}

/// Client credentials from HTTP Basic, falling back to `client_id` and
/// `client_secret` form parameters.
fn client_request(headers: &HeaderMap, body: String) -> ClientRequest {
    if let Some(basic) = basic_credentials(headers) {
        return ClientRequest {
            parameters: body,
            client_id: Some(basic.user_id),
            client_secret: Some(basic.password),
        };
    }

    let mut client_id = None;
    let mut client_secret = None;
    for (key, value) in url::form_urlencoded::parse(body.as_bytes()) {
        match key.as_ref() {
            "client_id" => client_id = Some(value.into_owned()),
            "client_secret" => client_secret = Some(value.into_owned()),
            _ => {}
        }
    }

    ClientRequest {
        parameters: body,
        client_id,
        client_secret,
    }
}

fn deliver(result: Result<EngineResponse>) -> Response {
    match result {
        Ok(response) => engine_response(response),
        Err(e) => failure_response(e),
    }
}

/// `POST /token`
pub async fn token(State(state): State<AppState>, headers: HeaderMap, body: String) -> Response {
    let request = client_request(&headers, body);
    deliver(
        process_token(
            state.engine.as_ref(),
            state.credentials.as_ref(),
            &request,
        )
        .await,
    )
}

/// Runs a token request, verifying resource owner credentials locally for
/// the password grant.
pub async fn process_token(
    engine: &dyn AuthorizationEngine,
    credentials: &dyn CredentialLookup,
    request: &ClientRequest,
) -> Result<EngineResponse> {
    match engine.token(request).await? {
        TokenOutcome::Response(response) => Ok(response),
        TokenOutcome::Password {
            ticket,
            username,
            password,
        } => match credentials.lookup(&username, &password).await? {
            Some(identity) => {
                tracing::info!(subject = %identity.subject, "Password grant accepted");
                engine.issue_token(&ticket, &identity.subject).await
            }
            None => {
                tracing::warn!(username = %username, "Password grant rejected");
                engine
                    .fail_token(&ticket, TokenFailReason::InvalidResourceOwnerCredentials)
                    .await
            }
        },
    }
}

/// `POST /revocation`
pub async fn revocation(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let request = client_request(&headers, body);
    deliver(state.engine.revocation(&request).await)
}

/// `POST /introspection`
///
/// Only callers listed in `introspection_callers` may introspect tokens.
pub async fn introspection(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let realm = state.settings.route_path("/introspection");
    if !caller_permitted(&state, &headers) {
        tracing::warn!("Introspection caller rejected");
        return basic_challenge(&realm);
    }

    deliver(state.engine.introspection(&body).await)
}

fn caller_permitted(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(basic) = basic_credentials(headers) else {
        return false;
    };

    state
        .settings
        .introspection_callers
        .iter()
        .any(|caller| {
            caller.id == basic.user_id && verify_digest(&caller.secret_sha256, &basic.password)
        })
}

/// `GET /jwks`
pub async fn jwks(State(state): State<AppState>) -> Response {
    deliver(state.engine.jwks().await)
}

/// `GET /.well-known/openid-configuration`
pub async fn configuration(State(state): State<AppState>) -> Response {
    deliver(state.engine.configuration().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::ConfiguredUsers;
    use crate::test_utils::john;
    use crate::upstream::fake::{EngineCall, FakeEngine};
    use crate::upstream::ResponseAction;
    use axum::http::HeaderValue;

    fn basic(user: &str, password: &str) -> HeaderMap {
        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!("{user}:{password}"));
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {encoded}")).unwrap(),
        );
        headers
    }

    fn users() -> ConfiguredUsers {
        ConfiguredUsers::new(vec![john()])
    }

    #[test]
    fn test_basic_credentials_parses_header() {
        let creds = basic_credentials(&basic("client", "s3:cret")).unwrap();
        assert_eq!(creds.user_id, "client");
        assert_eq!(creds.password, "s3:cret");
    }

    #[test]
    fn test_basic_credentials_rejects_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert!(basic_credentials(&headers).is_none());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic !!!"));
        assert!(basic_credentials(&headers).is_none());
        assert!(basic_credentials(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_client_request_prefers_basic() {
        let request = client_request(
            &basic("from-header", "secret"),
            "grant_type=client_credentials&client_id=from-body".to_string(),
        );
        assert_eq!(request.client_id.as_deref(), Some("from-header"));
        assert_eq!(request.client_secret.as_deref(), Some("secret"));
    }

    #[test]
    fn test_client_request_falls_back_to_form() {
        let request = client_request(
            &HeaderMap::new(),
            "grant_type=client_credentials&client_id=abc&client_secret=x%2By".to_string(),
        );
        assert_eq!(request.client_id.as_deref(), Some("abc"));
        assert_eq!(request.client_secret.as_deref(), Some("x+y"));
        assert!(request.parameters.starts_with("grant_type="));
    }

    #[tokio::test]
    async fn test_password_grant_issues_for_valid_user() {
        let engine = FakeEngine::new();
        engine.push_token_outcome(TokenOutcome::Password {
            ticket: "TT".to_string(),
            username: "john".to_string(),
            password: "john".to_string(),
        });

        let response = process_token(&engine, &users(), &ClientRequest::default())
            .await
            .unwrap();

        assert_eq!(response.action, ResponseAction::Ok);
        assert!(matches!(
            &engine.calls()[..],
            [EngineCall::Token(_), EngineCall::IssueToken { subject, .. }] if subject == "1001"
        ));
    }

    #[tokio::test]
    async fn test_password_grant_fails_for_wrong_password() {
        let engine = FakeEngine::new();
        engine.push_token_outcome(TokenOutcome::Password {
            ticket: "TT".to_string(),
            username: "john".to_string(),
            password: "nope".to_string(),
        });

        process_token(&engine, &users(), &ClientRequest::default())
            .await
            .unwrap();

        assert!(matches!(
            &engine.calls()[..],
            [
                EngineCall::Token(_),
                EngineCall::FailToken {
                    reason: TokenFailReason::InvalidResourceOwnerCredentials,
                    ..
                }
            ]
        ));
    }
}
