//! LLM provider adapters for Parsec.
//!
//! Every adapter implements `parsec_core::ProviderAdapter`. The registry
//! turns a request's provider settings into one [`Provider`] variant.

pub mod anthropic;
pub mod google;
pub mod http;
pub mod mistral;
pub mod openai;
pub mod openai_compat;
pub mod registry;

pub use anthropic::AnthropicAdapter;
pub use google::GoogleAdapter;
pub use mistral::MistralAdapter;
pub use openai::OpenAiAdapter;
pub use registry::{Provider, ProviderKind, create_provider, implemented_providers};
