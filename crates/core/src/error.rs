//! Error types for the Parsec domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] is the umbrella
//! returned across crate boundaries.

use thiserror::Error;

/// The top-level error type for all Parsec operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of a failure, used by callers to pick a response
/// status. Budget exhaustion is not an error and has no kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid provider, API key, model or connector settings.
    Configuration,
    /// Malformed input.
    Validation,
    /// Vendor API or connector I/O failure.
    Transport,
    /// Anything else.
    Internal,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::Configuration,
            Error::Provider(ProviderError::AuthenticationFailed(_)) => ErrorKind::Configuration,
            Error::Provider(_) => ErrorKind::Transport,
            Error::Tool(e) => e.kind(),
            Error::Serialization(_) => ErrorKind::Validation,
            Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the caller is at fault (4xx-equivalent).
    pub fn is_client_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::Configuration | ErrorKind::Validation)
    }
}

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotConfigured(String),

    #[error("{tool_name} failed: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("{0}")]
    Transport(String),
}

impl ToolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::UnknownTool(_) | ToolError::InvalidArguments(_) | ToolError::Validation(_) => {
                ErrorKind::Validation
            }
            ToolError::NotConfigured(_) => ErrorKind::Configuration,
            ToolError::ExecutionFailed { .. } | ToolError::Transport(_) => ErrorKind::Transport,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Provider \"{provider}\" is not yet implemented. Currently supported: {supported}")]
    UnsupportedProvider { provider: String, supported: String },

    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: String, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: String, reason: String },

    #[error("Configuration validation failed: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 529,
            message: "Overloaded".into(),
        });
        assert!(err.to_string().contains("529"));
        assert!(err.to_string().contains("Overloaded"));
    }

    #[test]
    fn config_errors_are_client_errors() {
        let err = Error::Config(ConfigError::UnsupportedProvider {
            provider: "cohere".into(),
            supported: "anthropic, openai".into(),
        });
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.is_client_error());
        assert!(err.to_string().contains("cohere"));
    }

    #[test]
    fn network_failures_are_transport() {
        let err = Error::Provider(ProviderError::Network("connection reset".into()));
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(!err.is_client_error());
    }

    #[test]
    fn tool_error_kinds() {
        assert_eq!(ToolError::Validation("bad".into()).kind(), ErrorKind::Validation);
        assert_eq!(ToolError::NotConfigured("x".into()).kind(), ErrorKind::Configuration);
        assert_eq!(ToolError::Transport("down".into()).kind(), ErrorKind::Transport);
    }
}
