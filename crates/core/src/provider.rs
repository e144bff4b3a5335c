//! Provider adapter contract: the abstraction over LLM vendors.
//!
//! An adapter converts between the canonical conversation/tool model and one
//! vendor's wire shape. The contract is total: every method is required and
//! none has a default, so a partially-implemented adapter does not compile.
//!
//! Implementations: Anthropic (canonical), OpenAI, Mistral, Google Gemini.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::message::Message;
use crate::tool::{ToolCall, ToolDefinition, ToolResult};

/// The seven-operation adapter contract.
///
/// `Response` is the vendor's raw response for one turn. The agent loop only
/// ever inspects it through the extraction methods below.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Raw vendor response for one turn.
    type Response: Send + Sync;

    /// Vendor tool-declaration shape.
    type Tool: Send + Sync;

    /// Vendor representation of tool results embedded in a conversation.
    type ToolResults: Send;

    /// Provider identifier (e.g. "anthropic").
    fn name(&self) -> &str;

    /// Send one turn to the vendor and wait for the full response.
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[Self::Tool],
        system_prompt: Option<&str>,
    ) -> Result<Self::Response, ProviderError>;

    /// Convert canonical tool definitions into the vendor's declaration shape.
    fn translate_tools(&self, definitions: &[ToolDefinition]) -> Vec<Self::Tool>;

    /// Every pending tool invocation in the response; empty if none.
    fn extract_tool_calls(&self, response: &Self::Response) -> Vec<ToolCall>;

    /// All textual segments in response order, joined by newline.
    /// Empty for a tool-calls-only response.
    fn extract_text(&self, response: &Self::Response) -> String;

    /// True iff the vendor is waiting on tool results.
    fn requires_tool_execution(&self, response: &Self::Response) -> bool;

    /// Convert canonical results into the vendor's embedded-result shape.
    fn format_tool_results(&self, results: &[ToolResult]) -> Self::ToolResults;

    /// Append the assistant turn reconstructed from `response` and a
    /// user-role turn carrying `results` to a copy of `messages`.
    fn append_to_conversation(
        &self,
        messages: &[Message],
        response: &Self::Response,
        results: &[ToolResult],
    ) -> Vec<Message>;
}
