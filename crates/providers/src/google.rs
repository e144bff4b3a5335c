//! Google Gemini adapter (`generateContent`).
//!
//! Gemini differs from the others in three ways:
//! - the assistant role is `model`, and system text goes in `systemInstruction`
//! - function calls carry no id, so one is synthesized when the response is
//!   parsed and stays attached to it for the lifetime of the turn
//! - function responses are keyed by function name, recovered from the
//!   `tool_use` block with the matching id
//!
//! The whole history is sent on every call; no server-side session exists.

use async_trait::async_trait;
use parsec_core::error::ProviderError;
use parsec_core::message::{ContentBlock, Message, MessageContent, Role};
use parsec_core::provider::ProviderAdapter;
use parsec_core::tool::{ToolCall, ToolDefinition, ToolResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::http::{normalize_base_url, send_json};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Process-wide, so ids stay unique across adapters and requests.
static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

fn next_call_id() -> String {
    format!("gemini-call-{}", NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed))
}

pub struct GoogleAdapter {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GoogleAdapter {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(base_url);
        self
    }

    /// Attach synthesized call ids to a raw response.
    pub fn parse_response(raw: GenerateContentResponse) -> GoogleResponse {
        let call_ids = raw.function_calls().map(|_| next_call_id()).collect();
        GoogleResponse { raw, call_ids }
    }

    /// Rebuild Gemini `contents` and the system instruction from the
    /// canonical conversation.
    fn to_contents(
        messages: &[Message],
        system_prompt: Option<&str>,
    ) -> (Option<Content>, Vec<Content>) {
        let mut system_parts: Vec<String> = system_prompt.map(str::to_string).into_iter().collect();
        let mut contents = Vec::with_capacity(messages.len());
        let mut call_names: HashMap<String, String> = HashMap::new();

        for msg in messages {
            let role = match msg.role {
                Role::System => {
                    system_parts.push(msg.content.text());
                    continue;
                }
                Role::Assistant => "model",
                Role::User => "user",
            };

            let parts: Vec<Part> = match &msg.content {
                MessageContent::Text(text) => vec![Part::text(text.clone())],
                MessageContent::Blocks(blocks) => blocks
                    .iter()
                    .map(|block| match block {
                        ContentBlock::Text { text } => Part::text(text.clone()),
                        ContentBlock::ToolUse { id, name, input } => {
                            call_names.insert(id.clone(), name.clone());
                            Part::function_call(name.clone(), input.clone())
                        }
                        ContentBlock::ToolResult {
                            tool_use_id,
                            content,
                        } => {
                            let name = call_names
                                .get(tool_use_id)
                                .cloned()
                                .unwrap_or_else(|| "unknown".into());
                            Part::function_response(name, content)
                        }
                    })
                    .collect(),
            };

            if !parts.is_empty() {
                contents.push(Content {
                    role: Some(role.into()),
                    parts,
                });
            }
        }

        let system = (!system_parts.is_empty()).then(|| Content {
            role: None,
            parts: vec![Part::text(system_parts.join("\n\n"))],
        });

        (system, contents)
    }
}

#[async_trait]
impl ProviderAdapter for GoogleAdapter {
    type Response = GoogleResponse;
    type Tool = FunctionDeclaration;
    type ToolResults = Vec<Part>;

    fn name(&self) -> &str {
        "google"
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[FunctionDeclaration],
        system_prompt: Option<&str>,
    ) -> Result<GoogleResponse, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let (system, contents) = Self::to_contents(messages, system_prompt);

        let mut body = serde_json::json!({ "contents": contents });

        if let Some(system) = system {
            body["systemInstruction"] = serde_json::json!(system);
        }

        if !tools.is_empty() {
            body["tools"] = serde_json::json!([{ "functionDeclarations": tools }]);
        }

        debug!(provider = "google", model = %self.model, contents = contents.len(), "Sending chat request");

        let request = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .header("Content-Type", "application/json")
            .json(&body);

        let raw: GenerateContentResponse = send_json(request, "Google").await?;
        Ok(Self::parse_response(raw))
    }

    fn translate_tools(&self, definitions: &[ToolDefinition]) -> Vec<FunctionDeclaration> {
        definitions
            .iter()
            .map(|t| FunctionDeclaration {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.input_schema.clone(),
            })
            .collect()
    }

    fn extract_tool_calls(&self, response: &GoogleResponse) -> Vec<ToolCall> {
        response
            .raw
            .function_calls()
            .zip(&response.call_ids)
            .map(|(fc, id)| ToolCall {
                id: id.clone(),
                name: fc.name.clone(),
                input: fc.args.clone(),
            })
            .collect()
    }

    fn extract_text(&self, response: &GoogleResponse) -> String {
        response
            .raw
            .parts()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn requires_tool_execution(&self, response: &GoogleResponse) -> bool {
        response.raw.function_calls().next().is_some()
    }

    fn format_tool_results(&self, results: &[ToolResult]) -> Vec<Part> {
        results
            .iter()
            .map(|r| Part::function_response(r.name.clone(), &r.content))
            .collect()
    }

    fn append_to_conversation(
        &self,
        messages: &[Message],
        response: &GoogleResponse,
        results: &[ToolResult],
    ) -> Vec<Message> {
        let text = self.extract_text(response);
        let mut assistant = Vec::new();
        if !text.is_empty() {
            assistant.push(ContentBlock::Text { text });
        }
        assistant.extend(
            self.extract_tool_calls(response)
                .into_iter()
                .map(|call| ContentBlock::ToolUse {
                    id: call.id,
                    name: call.name,
                    input: call.input,
                }),
        );

        let mut next = messages.to_vec();
        next.push(Message::blocks(Role::Assistant, assistant));
        next.push(Message::blocks(
            Role::User,
            results
                .iter()
                .map(|r| ContentBlock::ToolResult {
                    tool_use_id: r.tool_call_id.clone(),
                    content: r.content.clone(),
                })
                .collect(),
        ));
        next
    }
}

/// A Gemini response with the call ids synthesized when it was parsed.
#[derive(Debug, Clone)]
pub struct GoogleResponse {
    pub raw: GenerateContentResponse,
    call_ids: Vec<String>,
}

// --- Gemini API types ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
}

impl Part {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            ..Self::default()
        }
    }

    fn function_call(name: String, args: serde_json::Value) -> Self {
        Self {
            function_call: Some(FunctionCall { name, args }),
            ..Self::default()
        }
    }

    /// `response` is the parsed result, or `{result: <raw>}` if it is not
    /// a JSON object.
    fn function_response(name: String, content: &str) -> Self {
        let response = match serde_json::from_str::<serde_json::Value>(content) {
            Ok(value @ serde_json::Value::Object(_)) => value,
            _ => serde_json::json!({ "result": content }),
        };
        Self {
            function_response: Some(FunctionResponse { name, response }),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Parts of the first candidate.
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or_default()
            .iter()
    }

    fn function_calls(&self) -> impl Iterator<Item = &FunctionCall> {
        self.parts().filter_map(|p| p.function_call.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter() -> GoogleAdapter {
        GoogleAdapter::new("g-key", "gemini-2.5-flash", reqwest::Client::new())
    }

    fn raw(json: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(json).unwrap()
    }

    fn two_call_response() -> GoogleResponse {
        GoogleAdapter::parse_response(raw(serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"functionCall": {"name": "fetch_logs", "args": {"timeframe": "1h"}}},
                    {"functionCall": {"name": "query_database", "args": {"query": "SELECT 1"}}}
                ]},
                "finishReason": "STOP"
            }]
        })))
    }

    #[test]
    fn ids_are_stable_per_response_and_unique_across_calls() {
        let adapter = adapter();
        let resp = two_call_response();

        let first = adapter.extract_tool_calls(&resp);
        let again = adapter.extract_tool_calls(&resp);
        assert_eq!(first, again);
        assert_eq!(first.len(), 2);
        assert_ne!(first[0].id, first[1].id);
        assert!(first[0].id.starts_with("gemini-call-"));

        let other = adapter.extract_tool_calls(&two_call_response());
        assert_ne!(first[0].id, other[0].id);
    }

    #[test]
    fn function_calls_signal_tool_use() {
        let adapter = adapter();
        let resp = two_call_response();
        assert!(adapter.requires_tool_execution(&resp));
        assert_eq!(adapter.extract_text(&resp), "");

        let text_only = GoogleAdapter::parse_response(raw(serde_json::json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "All good."}]}}]
        })));
        assert!(!adapter.requires_tool_execution(&text_only));
        assert_eq!(adapter.extract_text(&text_only), "All good.");
    }

    #[test]
    fn no_candidates_is_empty() {
        let adapter = adapter();
        let resp = GoogleAdapter::parse_response(GenerateContentResponse::default());
        assert!(!adapter.requires_tool_execution(&resp));
        assert_eq!(adapter.extract_text(&resp), "");
    }

    #[test]
    fn function_response_recovers_name_by_id() {
        let adapter = adapter();
        let resp = two_call_response();
        let calls = adapter.extract_tool_calls(&resp);
        let results: Vec<ToolResult> = calls
            .iter()
            .map(|c| ToolResult::from_outcome(c, &Ok(serde_json::json!({"ok": true}))))
            .collect();

        let conversation =
            adapter.append_to_conversation(&[Message::user("why 500s?")], &resp, &results);
        let (_, contents) = GoogleAdapter::to_contents(&conversation, None);

        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1].role.as_deref(), Some("model"));
        assert_eq!(contents[2].role.as_deref(), Some("user"));
        let responses: Vec<&FunctionResponse> = contents[2]
            .parts
            .iter()
            .filter_map(|p| p.function_response.as_ref())
            .collect();
        assert_eq!(responses[0].name, "fetch_logs");
        assert_eq!(responses[1].name, "query_database");
        assert_eq!(responses[0].response["ok"], true);
    }

    #[test]
    fn orphan_result_is_named_unknown() {
        let conversation = vec![Message::blocks(
            Role::User,
            vec![ContentBlock::ToolResult {
                tool_use_id: "gemini-call-999999".into(),
                content: "plain text".into(),
            }],
        )];
        let (_, contents) = GoogleAdapter::to_contents(&conversation, None);
        let response = contents[0].parts[0].function_response.as_ref().unwrap();
        assert_eq!(response.name, "unknown");
        assert_eq!(response.response, serde_json::json!({"result": "plain text"}));
    }

    #[test]
    fn system_prompt_goes_to_system_instruction() {
        let (system, contents) =
            GoogleAdapter::to_contents(&[Message::user("hi")], Some("You are Parsec"));
        let system = system.unwrap();
        assert!(system.role.is_none());
        assert_eq!(system.parts[0].text.as_deref(), Some("You are Parsec"));
        assert_eq!(contents.len(), 1);
    }

    #[tokio::test]
    async fn chat_posts_generate_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .and(query_param("key", "g-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"role": "model", "parts": [{"text": "Hello from Parsec!"}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = adapter().with_base_url(server.uri());
        let tools = adapter.translate_tools(&[ToolDefinition {
            name: "fetch_logs".into(),
            description: "Retrieve server logs".into(),
            input_schema: serde_json::json!({"type": "object"}),
        }]);
        let resp = adapter
            .chat(&[Message::user("hi")], &tools, None)
            .await
            .unwrap();
        assert_eq!(adapter.extract_text(&resp), "Hello from Parsec!");

        let received = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["tools"][0]["functionDeclarations"][0]["name"], "fetch_logs");
        assert!(body.get("systemInstruction").is_none());
    }
}
