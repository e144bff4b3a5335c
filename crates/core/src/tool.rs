//! Tool types: the canonical description of what the model may invoke,
//! what it asked for, and what it got back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// A tool definition sent to the model so it knows what tools it can call.
///
/// This is the canonical (Anthropic-style) shape; adapters translate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's arguments
    pub input_schema: serde_json::Value,
}

/// A tool invocation extracted from a model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Vendor- or locally-generated call ID; must round-trip to the result
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub input: serde_json::Value,
}

/// The result of a tool execution, ready to be embedded back into the
/// conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    /// The call ID this result answers
    pub tool_call_id: String,

    /// Tool name (some vendors key results by name rather than id)
    pub name: String,

    /// Serialized JSON payload
    pub content: String,
}

impl ToolResult {
    /// Build a result from an execution outcome.
    ///
    /// Failures become `{"error": "<message>"}` so they reach the model
    /// exactly like a successful payload.
    pub fn from_outcome(call: &ToolCall, outcome: &Result<serde_json::Value, ToolError>) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            name: call.name.clone(),
            content: outcome_payload(outcome).to_string(),
        }
    }
}

/// The JSON payload for an execution outcome.
pub fn outcome_payload(outcome: &Result<serde_json::Value, ToolError>) -> serde_json::Value {
    match outcome {
        Ok(value) => value.clone(),
        Err(e) => serde_json::json!({ "error": e.to_string() }),
    }
}

/// Audit record of one tool invocation, returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool: String,
    pub input: serde_json::Value,
    pub result: serde_json::Value,
}

/// Executes tool calls on behalf of the agent loop.
///
/// The tools crate's dispatcher implements this; tests substitute their own.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Definitions of every tool this handler can execute.
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Execute a single call.
    async fn execute(&self, call: &ToolCall) -> Result<serde_json::Value, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call() -> ToolCall {
        ToolCall {
            id: "call_1".into(),
            name: "fetch_logs".into(),
            input: serde_json::json!({"timeframe": "1h"}),
        }
    }

    #[test]
    fn success_payload_is_serialized_json() {
        let outcome = Ok(serde_json::json!({"count": 0}));
        let result = ToolResult::from_outcome(&call(), &outcome);
        assert_eq!(result.tool_call_id, "call_1");
        assert_eq!(result.name, "fetch_logs");
        assert_eq!(result.content, r#"{"count":0}"#);
    }

    #[test]
    fn failure_payload_carries_error_message() {
        let outcome = Err(ToolError::Validation("Timeframe too large. Maximum is 30d".into()));
        let result = ToolResult::from_outcome(&call(), &outcome);
        let parsed: serde_json::Value = serde_json::from_str(&result.content).unwrap();
        assert_eq!(parsed["error"], "Timeframe too large. Maximum is 30d");
    }

    #[test]
    fn tool_result_uses_camel_case_on_the_wire() {
        let outcome = Ok(serde_json::json!(null));
        let json = serde_json::to_value(ToolResult::from_outcome(&call(), &outcome)).unwrap();
        assert_eq!(json["toolCallId"], "call_1");
    }
}
