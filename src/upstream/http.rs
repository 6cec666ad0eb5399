//! Authorization engine client for an Authlete-style JSON API
//!
//! Every call is an HTTP POST (or GET for the service documents) against
//! `base_url`, authenticated with the service API key and secret via HTTP
//! Basic. The engine answers with an `action` that tells the caller how to
//! deliver `responseContent`.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use super::{
    AuthorizationEngine, ClientRequest, EngineResponse, EngineVerdict, ResponseAction,
    TokenFailReason, TokenOutcome,
};
use crate::authorization::context::{AuthorizationContext, ClientInfo, Prompt, Scope};
use crate::authorization::disposition::{FailReason, Issuance};
use crate::config::UpstreamConfig;
use crate::error::{AuthflowError, Result};

// ---------------------------------------------------------------------------
// API paths
// ---------------------------------------------------------------------------

const AUTHORIZATION_PATH: &str = "api/auth/authorization";
const AUTHORIZATION_ISSUE_PATH: &str = "api/auth/authorization/issue";
const AUTHORIZATION_FAIL_PATH: &str = "api/auth/authorization/fail";
const TOKEN_PATH: &str = "api/auth/token";
const TOKEN_ISSUE_PATH: &str = "api/auth/token/issue";
const TOKEN_FAIL_PATH: &str = "api/auth/token/fail";
const REVOCATION_PATH: &str = "api/auth/revocation";
const INTROSPECTION_PATH: &str = "api/auth/introspection/standard";
const JWKS_PATH: &str = "api/service/jwks/get";
const CONFIGURATION_PATH: &str = "api/service/configuration";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ParametersRequest<'a> {
    parameters: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientParametersRequest<'a> {
    parameters: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_secret: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IssueRequest<'a> {
    ticket: &'a str,
    subject: &'a str,
    auth_time: i64,
    /// JSON object serialized as a string, as the API expects.
    #[serde(skip_serializing_if = "Option::is_none")]
    claims: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FailRequest<'a, R: Serialize> {
    ticket: &'a str,
    reason: R,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenIssueRequest<'a> {
    ticket: &'a str,
    subject: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiClient {
    client_id: Option<serde_json::Value>,
    client_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiScope {
    name: String,
    description: Option<String>,
}

/// Common shape of the engine's answers; fields absent from a given API
/// are left at their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ApiResponse {
    action: String,
    result_message: Option<String>,
    response_content: Option<String>,
    ticket: Option<String>,
    client: Option<ApiClient>,
    prompts: Option<Vec<Prompt>>,
    acrs: Option<Vec<String>>,
    max_age: i64,
    scopes: Option<Vec<ApiScope>>,
    claims: Option<Vec<String>>,
    claims_locales: Option<Vec<String>>,
    username: Option<String>,
    password: Option<String>,
}

impl ApiResponse {
    fn into_engine_response(self, api: &str) -> Result<EngineResponse> {
        let action = response_action(api, &self.action)?;
        Ok(EngineResponse::new(action, self.response_content))
    }

    fn require_ticket(&mut self, api: &str) -> Result<String> {
        self.ticket.take().filter(|t| !t.is_empty()).ok_or_else(|| {
            AuthflowError::UpstreamUnavailable(format!(
                "{api} answered {} without a ticket",
                self.action
            ))
            .into()
        })
    }

    fn into_context(mut self, api: &str) -> Result<AuthorizationContext> {
        let ticket = self.require_ticket(api)?;
        let client = self.client.unwrap_or(ApiClient {
            client_id: None,
            client_name: None,
        });

        // The API reports numeric client ids; keep them textual.
        let client_id = match client.client_id {
            Some(serde_json::Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        Ok(AuthorizationContext {
            ticket,
            client: ClientInfo {
                client_id,
                client_name: client.client_name,
            },
            prompts: self.prompts.unwrap_or_default(),
            acrs: self.acrs.unwrap_or_default(),
            max_age: self.max_age,
            scopes: self
                .scopes
                .unwrap_or_default()
                .into_iter()
                .map(|s| Scope {
                    name: s.name,
                    description: s.description,
                })
                .collect(),
            claims: self.claims.unwrap_or_default(),
            claims_locales: self.claims_locales.unwrap_or_default(),
        })
    }
}

/// Maps the engine's delivery action to a [`ResponseAction`].
fn response_action(api: &str, action: &str) -> Result<ResponseAction> {
    let action = match action {
        "OK" => ResponseAction::Ok,
        "NO_CONTENT" => ResponseAction::NoContent,
        "BAD_REQUEST" => ResponseAction::BadRequest,
        "INVALID_CLIENT" => ResponseAction::InvalidClient,
        "UNAUTHORIZED" => ResponseAction::Unauthorized,
        "FORBIDDEN" => ResponseAction::Forbidden,
        "LOCATION" => ResponseAction::Location,
        "FORM" => ResponseAction::Form,
        "INTERNAL_SERVER_ERROR" => ResponseAction::InternalServerError,
        other => {
            return Err(AuthflowError::UpstreamUnavailable(format!(
                "{api} answered with unknown action '{other}'"
            ))
            .into())
        }
    };
    Ok(action)
}

// ---------------------------------------------------------------------------
// HttpEngine
// ---------------------------------------------------------------------------

/// [`AuthorizationEngine`] backed by a remote JSON API.
#[derive(Debug, Clone)]
pub struct HttpEngine {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
    api_secret: String,
}

impl HttpEngine {
    /// Builds a client from the `upstream` configuration section.
    ///
    /// # Arguments
    ///
    /// * `config` - Base URL, credentials and timeout of the engine
    ///
    /// # Errors
    ///
    /// Returns `AuthflowError::Config` if the base URL does not parse, or
    /// `AuthflowError::Http` if the HTTP client cannot be built.
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url).map_err(|e| {
            AuthflowError::Config(format!(
                "Invalid upstream.base_url '{}': {}",
                config.base_url, e
            ))
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(AuthflowError::Http)?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|e| {
            AuthflowError::Config(format!("Invalid engine endpoint '{}': {}", path, e)).into()
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder, path: &str) -> Result<String> {
        let response = request
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                AuthflowError::UpstreamUnavailable(format!("{path} request failed: {e}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AuthflowError::UpstreamUnavailable(format!("{path} body unreadable: {e}"))
        })?;

        if !status.is_success() {
            tracing::warn!(api = path, status = status.as_u16(), "Engine call failed");
            return Err(AuthflowError::UpstreamUnavailable(format!(
                "{path} answered HTTP {}: {body}",
                status.as_u16()
            ))
            .into());
        }

        Ok(body)
    }

    async fn call<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        tracing::debug!(api = path, "Calling engine");
        let text = self.send(self.client.post(url).json(body), path).await?;
        serde_json::from_str(&text).map_err(|e| {
            AuthflowError::UpstreamUnavailable(format!("{path} answered malformed JSON: {e}"))
                .into()
        })
    }

    async fn call_response<B>(&self, path: &str, body: &B) -> Result<EngineResponse>
    where
        B: Serialize + Sync,
    {
        let response: ApiResponse = self.call(path, body).await?;
        log_result(path, &response);
        response.into_engine_response(path)
    }

    async fn document(&self, path: &str) -> Result<EngineResponse> {
        let url = self.endpoint(path)?;
        let text = self.send(self.client.get(url), path).await?;
        Ok(EngineResponse::new(ResponseAction::Ok, text))
    }
}

fn log_result(path: &str, response: &ApiResponse) {
    tracing::debug!(
        api = path,
        action = %response.action,
        message = response.result_message.as_deref().unwrap_or(""),
        "Engine answered"
    );
}

#[async_trait]
impl AuthorizationEngine for HttpEngine {
    async fn authorize(&self, parameters: &str) -> Result<EngineVerdict> {
        let response: ApiResponse = self
            .call(AUTHORIZATION_PATH, &ParametersRequest { parameters })
            .await?;
        log_result(AUTHORIZATION_PATH, &response);

        match response.action.as_str() {
            "INTERACTION" => Ok(EngineVerdict::Interaction(
                response.into_context(AUTHORIZATION_PATH)?,
            )),
            "NO_INTERACTION" => Ok(EngineVerdict::NoInteraction(
                response.into_context(AUTHORIZATION_PATH)?,
            )),
            _ => Ok(EngineVerdict::Error(
                response.into_engine_response(AUTHORIZATION_PATH)?,
            )),
        }
    }

    async fn issue(&self, ticket: &str, issuance: &Issuance) -> Result<EngineResponse> {
        let claims = if issuance.claims.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&issuance.claims)?)
        };

        self.call_response(
            AUTHORIZATION_ISSUE_PATH,
            &IssueRequest {
                ticket,
                subject: &issuance.subject,
                auth_time: issuance.auth_time,
                claims,
            },
        )
        .await
    }

    async fn fail(&self, ticket: &str, reason: FailReason) -> Result<EngineResponse> {
        self.call_response(AUTHORIZATION_FAIL_PATH, &FailRequest { ticket, reason })
            .await
    }

    async fn token(&self, request: &ClientRequest) -> Result<TokenOutcome> {
        let mut response: ApiResponse = self
            .call(
                TOKEN_PATH,
                &ClientParametersRequest {
                    parameters: &request.parameters,
                    client_id: request.client_id.as_deref(),
                    client_secret: request.client_secret.as_deref(),
                },
            )
            .await?;
        log_result(TOKEN_PATH, &response);

        if response.action == "PASSWORD" {
            let ticket = response.require_ticket(TOKEN_PATH)?;
            return Ok(TokenOutcome::Password {
                ticket,
                username: response.username.unwrap_or_default(),
                password: response.password.unwrap_or_default(),
            });
        }

        Ok(TokenOutcome::Response(
            response.into_engine_response(TOKEN_PATH)?,
        ))
    }

    async fn issue_token(&self, ticket: &str, subject: &str) -> Result<EngineResponse> {
        self.call_response(TOKEN_ISSUE_PATH, &TokenIssueRequest { ticket, subject })
            .await
    }

    async fn fail_token(&self, ticket: &str, reason: TokenFailReason) -> Result<EngineResponse> {
        self.call_response(TOKEN_FAIL_PATH, &FailRequest { ticket, reason })
            .await
    }

    async fn revocation(&self, request: &ClientRequest) -> Result<EngineResponse> {
        self.call_response(
            REVOCATION_PATH,
            &ClientParametersRequest {
                parameters: &request.parameters,
                client_id: request.client_id.as_deref(),
                client_secret: request.client_secret.as_deref(),
            },
        )
        .await
    }

    async fn introspection(&self, parameters: &str) -> Result<EngineResponse> {
        self.call_response(INTROSPECTION_PATH, &ParametersRequest { parameters })
            .await
    }

    async fn jwks(&self) -> Result<EngineResponse> {
        self.document(JWKS_PATH).await
    }

    async fn configuration(&self) -> Result<EngineResponse> {
        self.document(CONFIGURATION_PATH).await
    }
}
