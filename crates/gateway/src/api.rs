//! Chat, tool listing and provider listing endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::Json;
use parsec_agent::{AgentLoop, LoopStatus};
use parsec_config::{ConnectorsConfig, ProviderConfig};
use parsec_core::{Message, ToolCallRecord, ToolDefinition};
use parsec_tools::ToolDispatcher;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::SharedState;

// ── DTOs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// A single new operator message
    #[serde(default)]
    pub message: Option<String>,

    /// Full replay of earlier turns; takes precedence over `message`
    #[serde(default)]
    pub messages: Option<Vec<Message>>,

    #[serde(default)]
    pub config: Option<ProviderConfig>,

    #[serde(default)]
    pub connectors: Option<ConnectorsConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCallRecord>,
    /// `done` or `budget_exceeded`
    pub status: LoopStatus,
    pub iterations: u32,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct ToolListResponse {
    tools: Vec<ToolDefinition>,
    count: usize,
}

#[derive(Serialize)]
pub struct ProviderListResponse {
    providers: Vec<&'static str>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Body that did not parse as a chat request, in the same envelope as
/// every other failure.
fn rejected(rejection: JsonRejection) -> ApiError {
    (
        rejection.status(),
        Json(ErrorResponse {
            error: format!("Invalid request body: {}", rejection.body_text()),
        }),
    )
}

fn failure(e: parsec_core::Error) -> ApiError {
    let status = if e.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    error!(error = %e, status = status.as_u16(), "Chat request failed");
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

// ── Handlers ──────────────────────────────────────────────────────────────

pub async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(payload) = payload.map_err(rejected)?;
    let config = payload
        .config
        .ok_or_else(|| bad_request("Missing provider config"))?;
    if config.api_key.trim().is_empty() {
        return Err(bad_request("API key is required"));
    }
    if config.model.trim().is_empty() {
        return Err(bad_request("Model is required"));
    }

    let messages = match (payload.messages, payload.message) {
        (Some(messages), _) if !messages.is_empty() => messages,
        (_, Some(text)) if !text.trim().is_empty() => vec![Message::user(text)],
        _ => return Err(bad_request("Message is required")),
    };

    let connectors = payload
        .connectors
        .ok_or_else(|| bad_request("Connectors are required"))?;

    info!(
        provider = %config.provider,
        model = %config.model,
        messages = messages.len(),
        "Chat request received"
    );

    let provider = parsec_providers::create_provider(&config, &state.config).map_err(failure)?;

    let tools = Arc::new(ToolDispatcher::new(state.services.clone(), connectors));
    let agent = AgentLoop::new(tools).with_max_iterations(state.config.agent.max_iterations);

    let outcome = agent
        .run_provider(&provider, messages, config.system_prompt())
        .await
        .map_err(failure)?;

    info!(
        provider = %config.provider,
        iterations = outcome.iterations,
        tool_calls = outcome.tool_calls.len(),
        status = ?outcome.status,
        "Chat response sent"
    );

    Ok(Json(ChatResponse {
        content: outcome.content,
        tool_calls: outcome.tool_calls,
        status: outcome.status,
        iterations: outcome.iterations,
    }))
}

pub async fn list_tools_handler() -> Json<ToolListResponse> {
    let tools = parsec_tools::definitions();
    let count = tools.len();
    Json(ToolListResponse { tools, count })
}

pub async fn list_providers_handler() -> Json<ProviderListResponse> {
    Json(ProviderListResponse {
        providers: parsec_providers::implemented_providers(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GatewayState, build_router};
    use axum::Router;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use parsec_config::{AppConfig, ProviderEndpoint};
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app(config: AppConfig, cache: &std::path::Path) -> Router {
        let mut config = config;
        config.codebase.cache_dir = cache.to_path_buf();
        build_router(Arc::new(GatewayState::new(config).unwrap()))
    }

    async fn post_chat(app: Router, body: Value) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get_json(app: Router, uri: &str) -> Value {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn malformed_body_gets_error_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let req = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from("{\"message\": "))
            .unwrap();
        let response = app(AppConfig::default(), dir.path()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
    }

    #[tokio::test]
    async fn missing_content_type_gets_error_envelope() {
        let dir = tempfile::tempdir().unwrap();
        let req = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .body(Body::from(r#"{"message": "hi"}"#))
            .unwrap();
        let response = app(AppConfig::default(), dir.path()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn lists_tools() {
        let dir = tempfile::tempdir().unwrap();
        let body = get_json(app(AppConfig::default(), dir.path()), "/api/tools").await;
        assert_eq!(body["count"], 3);
        assert_eq!(body["tools"][0]["name"], "query_database");
        assert_eq!(body["tools"][2]["input_schema"]["properties"]["level"]["enum"][0], "error");
    }

    #[tokio::test]
    async fn lists_providers() {
        let dir = tempfile::tempdir().unwrap();
        let body = get_json(app(AppConfig::default(), dir.path()), "/api/providers").await;
        assert_eq!(body["providers"], json!(["anthropic", "openai", "mistral", "google"]));
    }

    #[tokio::test]
    async fn missing_api_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = post_chat(
            app(AppConfig::default(), dir.path()),
            json!({"message": "hi", "config": {"model": "gpt-4.1"}, "connectors": {}}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "API key is required");
    }

    #[tokio::test]
    async fn missing_message_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = post_chat(
            app(AppConfig::default(), dir.path()),
            json!({"config": {"apiKey": "k", "model": "gpt-4.1"}, "connectors": {}}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Message is required");
    }

    #[tokio::test]
    async fn missing_connectors_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (status, _) = post_chat(
            app(AppConfig::default(), dir.path()),
            json!({"message": "hi", "config": {"apiKey": "k", "model": "gpt-4.1"}}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_provider_is_a_client_error() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = post_chat(
            app(AppConfig::default(), dir.path()),
            json!({
                "message": "hi",
                "config": {"provider": "cohere", "apiKey": "k", "model": "command-r"},
                "connectors": {}
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .contains("Provider \"cohere\" is not yet implemented")
        );
    }

    #[tokio::test]
    async fn vendor_outage_is_a_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let mut config = AppConfig::default();
        config.providers.insert(
            "openai".into(),
            ProviderEndpoint {
                base_url: Some(server.uri()),
            },
        );

        let dir = tempfile::tempdir().unwrap();
        let (status, body) = post_chat(
            app(config, dir.path()),
            json!({
                "message": "hi",
                "config": {"provider": "openai", "apiKey": "k", "model": "gpt-4.1"},
                "connectors": {}
            }),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn chat_runs_the_loop_with_tool_errors_fed_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-ant-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_1",
                "model": "claude-sonnet-4-20250514",
                "content": [
                    {"type": "text", "text": "Let me check the database."},
                    {"type": "tool_use", "id": "toolu_1", "name": "query_database", "input": {"query": "SELECT 1"}}
                ],
                "stop_reason": "tool_use"
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_2",
                "model": "claude-sonnet-4-20250514",
                "content": [{"type": "text", "text": "No database is connected."}],
                "stop_reason": "end_turn"
            })))
            .mount(&server)
            .await;

        let mut config = AppConfig::default();
        config.providers.insert(
            "anthropic".into(),
            ProviderEndpoint {
                base_url: Some(server.uri()),
            },
        );

        let dir = tempfile::tempdir().unwrap();
        let (status, body) = post_chat(
            app(config, dir.path()),
            json!({
                "message": "How many users signed up today?",
                "config": {"provider": "anthropic", "apiKey": "sk-ant-test", "model": "claude-sonnet-4-20250514"},
                "connectors": {}
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["content"], "No database is connected.");
        assert_eq!(body["status"], "done");
        assert_eq!(body["iterations"], 2);
        assert_eq!(body["toolCalls"][0]["tool"], "query_database");
        assert!(
            body["toolCalls"][0]["result"]["error"]
                .as_str()
                .unwrap()
                .starts_with("No database connected")
        );
    }
}
