//! OpenAI chat-completions adapter.

use async_trait::async_trait;
use parsec_core::error::ProviderError;
use parsec_core::message::Message;
use parsec_core::provider::ProviderAdapter;
use parsec_core::tool::{ToolCall, ToolDefinition, ToolResult};

use crate::openai_compat::{self, ChatCompletion, ChatCompletionsClient, ChatMessage, FunctionTool};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

pub struct OpenAiAdapter {
    inner: ChatCompletionsClient,
}

impl OpenAiAdapter {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            inner: ChatCompletionsClient::new("openai", DEFAULT_BASE_URL, api_key, model, client),
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.inner.set_base_url(base_url);
        self
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    type Response = ChatCompletion;
    type Tool = FunctionTool;
    type ToolResults = Vec<ChatMessage>;

    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[FunctionTool],
        system_prompt: Option<&str>,
    ) -> Result<ChatCompletion, ProviderError> {
        self.inner.complete(messages, tools, system_prompt).await
    }

    fn translate_tools(&self, definitions: &[ToolDefinition]) -> Vec<FunctionTool> {
        openai_compat::translate_tools(definitions)
    }

    fn extract_tool_calls(&self, response: &ChatCompletion) -> Vec<ToolCall> {
        openai_compat::extract_tool_calls(response)
    }

    fn extract_text(&self, response: &ChatCompletion) -> String {
        openai_compat::extract_text(response)
    }

    fn requires_tool_execution(&self, response: &ChatCompletion) -> bool {
        openai_compat::requires_tool_execution(response)
    }

    fn format_tool_results(&self, results: &[ToolResult]) -> Vec<ChatMessage> {
        openai_compat::tool_messages(results)
    }

    fn append_to_conversation(
        &self,
        messages: &[Message],
        response: &ChatCompletion,
        results: &[ToolResult],
    ) -> Vec<Message> {
        openai_compat::append_to_conversation(messages, response, results)
    }
}
