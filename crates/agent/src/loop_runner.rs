//! The agentic loop implementation.

use std::sync::Arc;

use parsec_core::{
    Error, Message, ProviderAdapter, ToolCallRecord, ToolHandler, ToolResult,
    tool::outcome_payload,
};
use parsec_providers::Provider;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Default iteration ceiling for one run.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopStatus {
    /// The model delivered a final answer.
    Done,
    /// The iteration ceiling was reached while the model still wanted tools.
    BudgetExceeded,
}

/// Result of one loop run.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub status: LoopStatus,

    /// Text of the last model response (possibly empty)
    pub content: String,

    /// Every tool invocation, in execution order
    pub tool_calls: Vec<ToolCallRecord>,

    /// Model calls made
    pub iterations: u32,

    /// The conversation as it stood after the last tool results were folded in
    pub messages: Vec<Message>,
}

/// Drives a provider adapter and a tool handler until the model answers or
/// the iteration budget runs out.
///
/// Tool failures are fed back to the model as `{"error": ...}` results and
/// never end the run. Model-call failures do.
pub struct AgentLoop {
    tools: Arc<dyn ToolHandler>,
    max_iterations: u32,
}

impl AgentLoop {
    pub fn new(tools: Arc<dyn ToolHandler>) -> Self {
        Self {
            tools,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Set the iteration ceiling. Values below 1 are raised to 1.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Run against whichever adapter `provider` holds.
    pub async fn run_provider(
        &self,
        provider: &Provider,
        messages: Vec<Message>,
        system_prompt: Option<&str>,
    ) -> Result<LoopOutcome, Error> {
        match provider {
            Provider::Anthropic(adapter) => self.run(adapter, messages, system_prompt).await,
            Provider::OpenAi(adapter) => self.run(adapter, messages, system_prompt).await,
            Provider::Mistral(adapter) => self.run(adapter, messages, system_prompt).await,
            Provider::Google(adapter) => self.run(adapter, messages, system_prompt).await,
        }
    }

    /// Run the loop starting from `messages`.
    ///
    /// `messages` is either a single new user message or a full replay of
    /// earlier turns.
    pub async fn run<A: ProviderAdapter>(
        &self,
        adapter: &A,
        mut messages: Vec<Message>,
        system_prompt: Option<&str>,
    ) -> Result<LoopOutcome, Error> {
        info!(
            provider = adapter.name(),
            messages = messages.len(),
            "Processing conversation"
        );

        let tools = adapter.translate_tools(&self.tools.definitions());
        let mut records = Vec::new();
        let mut iteration = 0;

        loop {
            iteration += 1;
            debug!(provider = adapter.name(), iteration, "Agent loop iteration");

            let response = adapter.chat(&messages, &tools, system_prompt).await?;

            if !adapter.requires_tool_execution(&response) {
                info!(iterations = iteration, tool_calls = records.len(), "Conversation complete");
                return Ok(LoopOutcome {
                    status: LoopStatus::Done,
                    content: adapter.extract_text(&response),
                    tool_calls: records,
                    iterations: iteration,
                    messages,
                });
            }

            let calls = adapter.extract_tool_calls(&response);
            debug!(tool_count = calls.len(), "Executing tool calls");

            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                let outcome = self.tools.execute(call).await;
                if let Err(e) = &outcome {
                    warn!(tool = %call.name, error = %e, "Tool execution failed");
                }

                results.push(ToolResult::from_outcome(call, &outcome));
                records.push(ToolCallRecord {
                    tool: call.name.clone(),
                    input: call.input.clone(),
                    result: outcome_payload(&outcome),
                });
            }

            messages = adapter.append_to_conversation(&messages, &response, &results);

            if iteration >= self.max_iterations {
                warn!(
                    iterations = iteration,
                    tool_calls = records.len(),
                    "Max tool iterations reached"
                );
                return Ok(LoopOutcome {
                    status: LoopStatus::BudgetExceeded,
                    content: adapter.extract_text(&response),
                    tool_calls: records,
                    iterations: iteration,
                    messages,
                });
            }
        }
    }
}
