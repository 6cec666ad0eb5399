//! HttpEngine integration tests using wiremock
//!
//! Verifies that `src/upstream/http.rs` speaks the engine's JSON API:
//!
//! - authorization verdicts are mapped from the `action` field
//! - issue and fail calls carry the expected bodies
//! - the password grant surfaces its ticket and credentials
//! - transport failures and non-2xx answers are `UpstreamUnavailable`

use base64::Engine as _;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use authflow::authorization::{FailReason, Issuance, Prompt};
use authflow::config::UpstreamConfig;
use authflow::error::AuthflowError;
use authflow::upstream::{
    AuthorizationEngine, ClientRequest, EngineVerdict, HttpEngine, ResponseAction, TokenOutcome,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn engine_for(server: &MockServer) -> HttpEngine {
    HttpEngine::new(&UpstreamConfig {
        base_url: server.uri(),
        api_key: "key".to_string(),
        api_secret: "secret".to_string(),
        timeout_seconds: 2,
    })
    .expect("engine must build")
}

fn basic_header() -> String {
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode("key:secret")
    )
}

async fn request_body(server: &MockServer, index: usize) -> serde_json::Value {
    let requests = server
        .received_requests()
        .await
        .expect("request recording is enabled");
    serde_json::from_slice(&requests[index].body).expect("request body is JSON")
}

// ---------------------------------------------------------------------------
// authorize
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_authorize_interaction_maps_context() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/authorization"))
        .and(header("authorization", basic_header().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "action": "INTERACTION",
            "ticket": "TICKET-1",
            "client": {"clientId": 123, "clientName": "Demo"},
            "prompts": ["CREATE", "LOGIN", "CONSENT"],
            "maxAge": 600,
            "scopes": [{"name": "openid", "description": "OpenID"}],
            "claims": ["name"],
            "claimsLocales": ["ja"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let verdict = engine_for(&server)
        .authorize("response_type=code&client_id=123")
        .await
        .unwrap();

    match verdict {
        EngineVerdict::Interaction(ctx) => {
            assert_eq!(ctx.ticket, "TICKET-1");
            assert_eq!(ctx.client.client_id, "123");
            assert!(ctx.has_prompt(Prompt::Login));
            assert_eq!(ctx.max_age_limit(), Some(600));
            assert_eq!(ctx.claims, vec!["name".to_string()]);
        }
        other => panic!("expected interaction, got {other:?}"),
    }

    let body = request_body(&server, 0).await;
    assert_eq!(body["parameters"], "response_type=code&client_id=123");
}

#[tokio::test]
async fn test_authorize_no_interaction() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "action": "NO_INTERACTION",
            "ticket": "T",
            "client": {"clientId": "c"}
        })))
        .mount(&server)
        .await;

    let verdict = engine_for(&server).authorize("prompt=none").await.unwrap();
    assert!(matches!(verdict, EngineVerdict::NoInteraction(ctx) if ctx.ticket == "T"));
}

#[tokio::test]
async fn test_authorize_error_action_passes_response_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "action": "BAD_REQUEST",
            "responseContent": "{\"error\":\"invalid_request\"}"
        })))
        .mount(&server)
        .await;

    let verdict = engine_for(&server).authorize("bogus").await.unwrap();
    match verdict {
        EngineVerdict::Error(response) => {
            assert_eq!(response.action, ResponseAction::BadRequest);
            assert_eq!(
                response.content.as_deref(),
                Some("{\"error\":\"invalid_request\"}")
            );
        }
        other => panic!("expected error verdict, got {other:?}"),
    }
}

#[tokio::test]
async fn test_authorize_interaction_without_ticket_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/authorization"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"action": "INTERACTION"})),
        )
        .mount(&server)
        .await;

    let err = engine_for(&server).authorize("q").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AuthflowError>(),
        Some(AuthflowError::UpstreamUnavailable(_))
    ));
}

#[tokio::test]
async fn test_non_success_status_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/authorization"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad api key"))
        .mount(&server)
        .await;

    let err = engine_for(&server).authorize("q").await.unwrap_err();
    match err.downcast_ref::<AuthflowError>() {
        Some(AuthflowError::UpstreamUnavailable(message)) => {
            assert!(message.contains("HTTP 401"), "{message}");
            assert!(message.contains("bad api key"), "{message}");
        }
        other => panic!("expected UpstreamUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_proxy_503_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/token"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let err = engine_for(&server)
        .token(&ClientRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AuthflowError>(),
        Some(AuthflowError::UpstreamUnavailable(message)) if message.contains("HTTP 503")
    ));
}

#[tokio::test]
async fn test_malformed_json_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = engine_for(&server).authorize("q").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AuthflowError>(),
        Some(AuthflowError::UpstreamUnavailable(_))
    ));
}

#[tokio::test]
async fn test_unreachable_engine_is_unavailable() {
    let server = MockServer::start().await;
    let engine = engine_for(&server);
    drop(server);

    let err = engine.authorize("q").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AuthflowError>(),
        Some(AuthflowError::UpstreamUnavailable(_))
    ));
}

// ---------------------------------------------------------------------------
// issue / fail
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_issue_sends_subject_auth_time_and_claims() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/authorization/issue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "action": "LOCATION",
            "responseContent": "https://client.example.com/cb?code=abc"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut claims = serde_json::Map::new();
    claims.insert("name".to_string(), serde_json::json!("John Smith"));
    let issuance = Issuance {
        subject: "1001".to_string(),
        auth_time: 1_700_000_000,
        claims,
    };

    let response = engine_for(&server).issue("T", &issuance).await.unwrap();
    assert_eq!(response.action, ResponseAction::Location);

    let body = request_body(&server, 0).await;
    assert_eq!(body["ticket"], "T");
    assert_eq!(body["subject"], "1001");
    assert_eq!(body["authTime"], 1_700_000_000i64);
    let claims: serde_json::Value =
        serde_json::from_str(body["claims"].as_str().expect("claims is a string")).unwrap();
    assert_eq!(claims["name"], "John Smith");
}

#[tokio::test]
async fn test_fail_sends_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/authorization/fail"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "action": "LOCATION",
            "responseContent": "https://client.example.com/cb?error=login_required"
        })))
        .mount(&server)
        .await;

    engine_for(&server)
        .fail("T", FailReason::NotLoggedIn)
        .await
        .unwrap();

    let body = request_body(&server, 0).await;
    assert_eq!(body, serde_json::json!({"ticket": "T", "reason": "NOT_LOGGED_IN"}));
}

// ---------------------------------------------------------------------------
// token / documents
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_token_password_grant_surfaces_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "action": "PASSWORD",
            "ticket": "TT",
            "username": "john",
            "password": "john"
        })))
        .mount(&server)
        .await;

    let outcome = engine_for(&server)
        .token(&ClientRequest {
            parameters: "grant_type=password".to_string(),
            client_id: Some("c".to_string()),
            client_secret: Some("s".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(
        outcome,
        TokenOutcome::Password {
            ticket: "TT".to_string(),
            username: "john".to_string(),
            password: "john".to_string(),
        }
    );
    let body = request_body(&server, 0).await;
    assert_eq!(body["clientId"], "c");
    assert_eq!(body["clientSecret"], "s");
}

#[tokio::test]
async fn test_token_invalid_client() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "action": "INVALID_CLIENT",
            "responseContent": "{\"error\":\"invalid_client\"}"
        })))
        .mount(&server)
        .await;

    let outcome = engine_for(&server)
        .token(&ClientRequest::default())
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        TokenOutcome::Response(ref r) if r.action == ResponseAction::InvalidClient
    ));
}

#[tokio::test]
async fn test_jwks_document_is_returned_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/service/jwks/get"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"keys\":[]}"))
        .mount(&server)
        .await;

    let response = engine_for(&server).jwks().await.unwrap();
    assert_eq!(response.action, ResponseAction::Ok);
    assert_eq!(response.content.as_deref(), Some("{\"keys\":[]}"));
}
