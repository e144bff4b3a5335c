//! # Parsec Core
//!
//! The provider-neutral conversation model, the adapter contract every LLM
//! vendor implements, and the error taxonomy shared by the whole workspace.
//! This crate performs **no I/O**: it defines the types that the providers,
//! tools and agent crates implement against.
//!
//! ## Canonical model
//!
//! Conversations are always stored in the block-based shape (text,
//! `tool_use`, `tool_result` blocks). Adapters convert to and from their
//! vendor's wire format at the edge; nothing above the adapter layer ever
//! sees a vendor type.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{ConfigError, Error, ErrorKind, ProviderError, Result, ToolError};
pub use message::{ContentBlock, Message, MessageContent, Role};
pub use provider::ProviderAdapter;
pub use tool::{ToolCall, ToolCallRecord, ToolDefinition, ToolHandler, ToolResult};
