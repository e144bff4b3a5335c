//! Anthropic Messages API adapter.
//!
//! Anthropic's wire shape is the canonical one: block-form messages with
//! `tool_use` / `tool_result` content blocks, so conversion is mostly a
//! matter of lifting system messages into the top-level `system` field.
//!
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - tool use signalled by `stop_reason == "tool_use"`

use async_trait::async_trait;
use parsec_core::error::ProviderError;
use parsec_core::message::{ContentBlock, Message, MessageContent, Role};
use parsec_core::provider::ProviderAdapter;
use parsec_core::tool::{ToolCall, ToolDefinition, ToolResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http::{normalize_base_url, send_json};

const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic native Messages API adapter.
pub struct AnthropicAdapter {
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl AnthropicAdapter {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            client,
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(base_url);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Split system messages out of the conversation.
    /// Anthropic puts the system prompt in a top-level field, not in messages.
    fn extract_system<'a>(
        messages: &'a [Message],
        system_prompt: Option<&str>,
    ) -> (Option<String>, Vec<&'a Message>) {
        let mut system_parts: Vec<String> = system_prompt.map(str::to_string).into_iter().collect();
        let mut non_system = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => system_parts.push(msg.content.text()),
                _ => non_system.push(msg),
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };

        (system, non_system)
    }

    /// The assistant turn as canonical blocks, in response order.
    fn assistant_blocks(response: &AnthropicResponse) -> Vec<ContentBlock> {
        response
            .content
            .iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(ContentBlock::Text { text: text.clone() }),
                ResponseBlock::ToolUse { id, name, input } => Some(ContentBlock::ToolUse {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                }),
                ResponseBlock::Other => None,
            })
            .collect()
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    type Response = AnthropicResponse;
    type Tool = AnthropicTool;
    type ToolResults = Vec<ContentBlock>;

    fn name(&self) -> &str {
        "anthropic"
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[AnthropicTool],
        system_prompt: Option<&str>,
    ) -> Result<AnthropicResponse, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let (system, messages) = Self::extract_system(messages, system_prompt);

        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": messages,
        });

        if let Some(sys) = system {
            body["system"] = serde_json::json!(sys);
        }

        if !tools.is_empty() {
            body["tools"] = serde_json::json!(tools);
        }

        debug!(provider = "anthropic", model = %self.model, messages = messages.len(), "Sending chat request");

        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body);

        send_json(request, "Anthropic").await
    }

    fn translate_tools(&self, definitions: &[ToolDefinition]) -> Vec<AnthropicTool> {
        definitions
            .iter()
            .map(|t| AnthropicTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.input_schema.clone(),
            })
            .collect()
    }

    fn extract_tool_calls(&self, response: &AnthropicResponse) -> Vec<ToolCall> {
        response
            .content
            .iter()
            .filter_map(|block| match block {
                ResponseBlock::ToolUse { id, name, input } => Some(ToolCall {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    fn extract_text(&self, response: &AnthropicResponse) -> String {
        response
            .content
            .iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn requires_tool_execution(&self, response: &AnthropicResponse) -> bool {
        response.stop_reason.as_deref() == Some("tool_use")
    }

    fn format_tool_results(&self, results: &[ToolResult]) -> Vec<ContentBlock> {
        results
            .iter()
            .map(|r| ContentBlock::ToolResult {
                tool_use_id: r.tool_call_id.clone(),
                content: r.content.clone(),
            })
            .collect()
    }

    fn append_to_conversation(
        &self,
        messages: &[Message],
        response: &AnthropicResponse,
        results: &[ToolResult],
    ) -> Vec<Message> {
        let mut next = messages.to_vec();
        next.push(Message {
            role: Role::Assistant,
            content: MessageContent::Blocks(Self::assistant_blocks(response)),
        });
        next.push(Message::blocks(Role::User, self.format_tool_results(results)));
        next
    }
}

// --- Anthropic API types ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnthropicTool {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Raw Messages API response.
#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub content: Vec<ResponseBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    /// Thinking and other block types the loop has no use for
    #[serde(other)]
    Other,
}
