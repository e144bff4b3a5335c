//! The agentic loop: the heart of Parsec.
//!
//! Each run follows a **Call → Act → Fold** cycle:
//!
//! 1. **Send** the conversation and the tool definitions to the provider
//! 2. **If the model wants tools**: execute each call in order through the
//!    tool handler, recording input and result
//! 3. **Fold** the assistant turn and the tool results into the conversation
//!    and go back to step 1
//! 4. **If the model answered**: return its text
//!
//! The loop continues until the model stops asking for tools or the
//! iteration ceiling is reached, in which case the run still succeeds with
//! [`LoopStatus::BudgetExceeded`] and whatever text the last response carried.

pub mod loop_runner;

pub use loop_runner::{AgentLoop, DEFAULT_MAX_ITERATIONS, LoopOutcome, LoopStatus};
