//! Authorization and decision endpoint handlers

use std::collections::HashMap;

use axum::extract::{RawQuery, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Form;

use crate::authorization::{DecisionForm, DecisionOutcome, DispatchOutcome, InteractionPage};

use super::cookie::resolve_session;
use super::responses::{engine_response, failure_response, html, with_headers};
use super::AppState;

/// `GET /authorization`: parameters come from the query string.
pub async fn authorization_get(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    handle_authorization(&state, &headers, &query.unwrap_or_default()).await
}

/// `POST /authorization`: parameters come from the form body.
pub async fn authorization_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    handle_authorization(&state, &headers, &body).await
}

async fn handle_authorization(state: &AppState, headers: &HeaderMap, parameters: &str) -> Response {
    let (session, cookie_headers) = match resolve_session(state, headers).await {
        Ok(resolved) => resolved,
        Err(e) => return failure_response(e),
    };

    let response = match state.dispatcher.dispatch(parameters, &session).await {
        Ok(DispatchOutcome::Interaction(page)) => render_page(state, &page),
        Ok(DispatchOutcome::Completed(response)) | Ok(DispatchOutcome::Rejected(response)) => {
            engine_response(response)
        }
        Err(e) => failure_response(e),
    };

    with_headers(response, cookie_headers)
}

/// `POST /authorization/decision`: the authorization page's form.
///
/// The approve button is the only control named `authorized`; its presence
/// alone means approval.
pub async fn decision(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    let (session, cookie_headers) = match resolve_session(&state, &headers).await {
        Ok(resolved) => resolved,
        Err(e) => return failure_response(e),
    };

    let form = decision_form(fields);
    let response = match state.decisions.collect(&form, &session).await {
        Ok(DecisionOutcome::Finalized(response)) => engine_response(response),
        Ok(DecisionOutcome::RetryLogin(page)) => render_page(&state, &page),
        Err(e) => failure_response(e),
    };

    with_headers(response, cookie_headers)
}

fn decision_form(mut fields: HashMap<String, String>) -> DecisionForm {
    DecisionForm {
        login_id: fields.remove("loginId").filter(|v| !v.is_empty()),
        password: fields.remove("password"),
        authorized: fields.contains_key("authorized"),
    }
}

fn render_page(state: &AppState, page: &InteractionPage) -> Response {
    let decision_url = state.settings.route_path("/authorization/decision");
    html(state.renderer.render(page, &decision_url))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_form_presence_of_authorized() {
        let fields: HashMap<String, String> = [
            ("loginId".to_string(), "john".to_string()),
            ("password".to_string(), "pw".to_string()),
            ("authorized".to_string(), String::new()),
        ]
        .into_iter()
        .collect();
        let form = decision_form(fields);
        assert!(form.authorized);
        assert_eq!(form.login_id.as_deref(), Some("john"));
        assert_eq!(form.password.as_deref(), Some("pw"));
    }

    #[test]
    fn test_decision_form_deny_and_blank_login() {
        let fields: HashMap<String, String> = [
            ("loginId".to_string(), String::new()),
            ("denied".to_string(), "Deny".to_string()),
        ]
        .into_iter()
        .collect();
        let form = decision_form(fields);
        assert!(!form.authorized);
        assert!(form.login_id.is_none());
    }
}
