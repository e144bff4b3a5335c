//! Chat-completions wire format shared by the OpenAI and Mistral adapters.
//!
//! Both vendors expose a `/v1/chat/completions` endpoint with flat
//! messages, a `{type: "function", function: {...}}` tool envelope and
//! `role: "tool"` result messages. Mistral's SDKs speak camelCase, so every
//! response field that differs accepts both spellings.

use parsec_core::error::ProviderError;
use parsec_core::message::{ContentBlock, Message, MessageContent, Role};
use parsec_core::tool::{ToolCall, ToolDefinition, ToolResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http::{normalize_base_url, send_json};

/// Connection settings and request logic for one chat-completions vendor.
pub struct ChatCompletionsClient {
    vendor: &'static str,
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl ChatCompletionsClient {
    pub fn new(
        vendor: &'static str,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            vendor,
            base_url: normalize_base_url(base_url),
            api_key: api_key.into(),
            model: model.into(),
            client,
        }
    }

    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = normalize_base_url(base_url);
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// POST one chat-completions request.
    pub async fn complete(
        &self,
        messages: &[Message],
        tools: &[FunctionTool],
        system_prompt: Option<&str>,
    ) -> Result<ChatCompletion, ProviderError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": to_chat_messages(messages, system_prompt),
        });

        if !tools.is_empty() {
            body["tools"] = serde_json::json!(tools);
            body["tool_choice"] = serde_json::json!("auto");
        }

        debug!(provider = self.vendor, model = %self.model, messages = messages.len(), "Sending chat request");

        let request = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body);

        send_json(request, self.vendor).await
    }
}

/// Convert canonical messages to flat chat-completion messages.
///
/// The system prompt, if any, becomes the first message. A canonical
/// `tool_result` block becomes its own `role: "tool"` message.
pub fn to_chat_messages(messages: &[Message], system_prompt: Option<&str>) -> Vec<ChatMessage> {
    let mut result = Vec::with_capacity(messages.len() + 1);

    if let Some(prompt) = system_prompt {
        result.push(ChatMessage::text("system", prompt));
    }

    for msg in messages {
        match (&msg.role, &msg.content) {
            (Role::System, content) => result.push(ChatMessage::text("system", content.text())),
            (Role::User, MessageContent::Text(text)) => {
                result.push(ChatMessage::text("user", text.clone()))
            }
            (Role::Assistant, MessageContent::Text(text)) => {
                result.push(ChatMessage::text("assistant", text.clone()))
            }
            (Role::User, MessageContent::Blocks(blocks)) => {
                let text = msg.content.text();
                if !text.is_empty() {
                    result.push(ChatMessage::text("user", text));
                }
                for block in blocks {
                    if let ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                    } = block
                    {
                        result.push(ChatMessage::tool(tool_use_id.clone(), content.clone()));
                    }
                }
            }
            (Role::Assistant, MessageContent::Blocks(_)) => {
                let text = msg.content.text();
                let tool_calls: Vec<WireToolCall> = msg
                    .tool_uses()
                    .into_iter()
                    .map(|(id, name, input)| WireToolCall {
                        id: id.to_string(),
                        kind: "function".into(),
                        function: WireFunction {
                            name: name.to_string(),
                            arguments: serde_json::Value::String(input.to_string()),
                        },
                    })
                    .collect();

                result.push(ChatMessage {
                    role: "assistant".into(),
                    content: (!text.is_empty()).then_some(text),
                    tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                    tool_call_id: None,
                });
            }
        }
    }

    result
}

/// Wrap canonical definitions in the `function` envelope.
pub fn translate_tools(definitions: &[ToolDefinition]) -> Vec<FunctionTool> {
    definitions
        .iter()
        .map(|t| FunctionTool {
            kind: "function".into(),
            function: FunctionSpec {
                name: t.name.clone(),
                description: t.description.clone(),
                parameters: t.input_schema.clone(),
            },
        })
        .collect()
}

/// One `role: "tool"` message per result.
pub fn tool_messages(results: &[ToolResult]) -> Vec<ChatMessage> {
    results
        .iter()
        .map(|r| ChatMessage::tool(r.tool_call_id.clone(), r.content.clone()))
        .collect()
}

fn first_choice(completion: &ChatCompletion) -> Option<&Choice> {
    completion.choices.first()
}

pub fn extract_tool_calls(completion: &ChatCompletion) -> Vec<ToolCall> {
    first_choice(completion)
        .and_then(|c| c.message.tool_calls.as_ref())
        .map(|calls| {
            calls
                .iter()
                .map(|tc| ToolCall {
                    id: tc.id.clone(),
                    name: tc.function.name.clone(),
                    input: parse_arguments(&tc.function.arguments),
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn extract_text(completion: &ChatCompletion) -> String {
    first_choice(completion)
        .and_then(|c| c.message.content.clone())
        .unwrap_or_default()
}

pub fn requires_tool_execution(completion: &ChatCompletion) -> bool {
    first_choice(completion).and_then(|c| c.finish_reason.as_deref()) == Some("tool_calls")
}

/// The assistant turn of a completion as canonical blocks.
pub fn assistant_blocks(completion: &ChatCompletion) -> Vec<ContentBlock> {
    let text = extract_text(completion);
    let mut blocks = Vec::new();
    if !text.is_empty() {
        blocks.push(ContentBlock::Text { text });
    }
    blocks.extend(
        extract_tool_calls(completion)
            .into_iter()
            .map(|call| ContentBlock::ToolUse {
                id: call.id,
                name: call.name,
                input: call.input,
            }),
    );
    blocks
}

/// Canonical assistant turn plus a user turn of `tool_result` blocks.
/// `to_chat_messages` expands the latter back into `role: "tool"` messages.
pub fn append_to_conversation(
    messages: &[Message],
    completion: &ChatCompletion,
    results: &[ToolResult],
) -> Vec<Message> {
    let mut next = messages.to_vec();
    next.push(Message::blocks(Role::Assistant, assistant_blocks(completion)));
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

/// Tool-call arguments arrive as a JSON string; some SDKs send an object.
/// Anything unparsable becomes `{}`.
fn parse_arguments(arguments: &serde_json::Value) -> serde_json::Value {
    match arguments {
        serde_json::Value::String(s) => {
            serde_json::from_str(s).unwrap_or_else(|_| serde_json::json!({}))
        }
        serde_json::Value::Object(_) => arguments.clone(),
        _ => serde_json::json!({}),
    }
}

// --- Chat-completions API types ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(
        default,
        alias = "toolCalls",
        skip_serializing_if = "Option::is_none"
    )]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(
        default,
        alias = "toolCallId",
        skip_serializing_if = "Option::is_none"
    )]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    fn tool(tool_call_id: String, content: String) -> Self {
        Self {
            role: "tool".into(),
            content: Some(content),
            tool_calls: None,
            tool_call_id: Some(tool_call_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: WireFunction,
}

fn function_kind() -> String {
    "function".into()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionTool {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Raw chat-completions response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ChatMessage,
    #[serde(default, alias = "finishReason")]
    pub finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(json: serde_json::Value) -> ChatCompletion {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn system_prompt_becomes_first_message() {
        let msgs = to_chat_messages(&[Message::user("Hello")], Some("You are Parsec"));
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, "system");
        assert_eq!(msgs[0].content.as_deref(), Some("You are Parsec"));
        assert_eq!(msgs[1].role, "user");
    }

    #[test]
    fn tool_definitions_use_function_envelope() {
        let tools = translate_tools(&[ToolDefinition {
            name: "search_codebase".into(),
            description: "Search".into(),
            input_schema: serde_json::json!({"type": "object"}),
        }]);
        let json = serde_json::to_value(&tools).unwrap();
        assert_eq!(json[0]["type"], "function");
        assert_eq!(json[0]["function"]["name"], "search_codebase");
        assert_eq!(json[0]["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn snake_case_completion() {
        let c = completion(serde_json::json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "fetch_logs", "arguments": "{\"timeframe\":\"1h\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }));
        let calls = extract_tool_calls(&c);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].input["timeframe"], "1h");
        assert!(requires_tool_execution(&c));
        assert_eq!(extract_text(&c), "");
    }

    #[test]
    fn camel_case_completion() {
        let c = completion(serde_json::json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "",
                    "toolCalls": [{
                        "id": "abc123",
                        "function": {"name": "query_database", "arguments": {"query": "SELECT 1"}}
                    }]
                },
                "finishReason": "tool_calls"
            }]
        }));
        let calls = extract_tool_calls(&c);
        assert_eq!(calls[0].name, "query_database");
        assert_eq!(calls[0].input["query"], "SELECT 1");
        assert!(requires_tool_execution(&c));
    }

    #[test]
    fn unparsable_arguments_become_empty_object() {
        let c = completion(serde_json::json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "tool_calls": [{"id": "c", "type": "function", "function": {"name": "x", "arguments": "{not json"}}]
                },
                "finish_reason": "tool_calls"
            }]
        }));
        assert_eq!(extract_tool_calls(&c)[0].input, serde_json::json!({}));
    }

    #[test]
    fn empty_choices_do_not_panic() {
        let c = completion(serde_json::json!({"choices": []}));
        assert!(extract_tool_calls(&c).is_empty());
        assert_eq!(extract_text(&c), "");
        assert!(!requires_tool_execution(&c));
    }

    #[test]
    fn appended_turns_expand_to_tool_messages() {
        let c = completion(serde_json::json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "Looking",
                    "tool_calls": [{"id": "call_9", "type": "function", "function": {"name": "fetch_logs", "arguments": "{}"}}]
                },
                "finish_reason": "tool_calls"
            }]
        }));
        let call = &extract_tool_calls(&c)[0];
        let results = vec![ToolResult::from_outcome(call, &Ok(serde_json::json!({"count": 0})))];

        let next = append_to_conversation(&[Message::user("any errors?")], &c, &results);
        let wire = to_chat_messages(&next, None);

        assert_eq!(wire.len(), 3);
        assert_eq!(wire[1].role, "assistant");
        assert_eq!(wire[1].content.as_deref(), Some("Looking"));
        assert_eq!(wire[1].tool_calls.as_ref().unwrap()[0].id, "call_9");
        assert_eq!(wire[2].role, "tool");
        assert_eq!(wire[2].tool_call_id.as_deref(), Some("call_9"));
        assert_eq!(wire[2].content.as_deref(), Some(r#"{"count":0}"#));

        let json = serde_json::to_value(&wire[1]).unwrap();
        assert_eq!(json["tool_calls"][0]["function"]["arguments"], "{}");
    }
}
