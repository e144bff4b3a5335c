//! Configuration loading, validation, and management for Parsec.
//!
//! Process-wide settings load from `~/.parsec/config.toml` with environment
//! variable overrides. Per-request settings (provider credentials and
//! connector descriptions) live in [`request`] and are never persisted.

pub mod request;

use parsec_core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub use request::{
    CodebaseConnector, CodebaseSource, ConnectorsConfig, DatabaseConnector, LogsConnector,
    LogsTarget, ProviderConfig,
};

/// The root configuration structure.
///
/// Maps directly to `~/.parsec/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Agentic loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Database connector limits
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Codebase connector limits and repository cache location
    #[serde(default)]
    pub codebase: CodebaseConfig,

    /// Logs connector limits
    #[serde(default)]
    pub logs: LogsConfig,

    /// Per-provider endpoint overrides, keyed by provider identifier
    #[serde(default)]
    pub providers: HashMap<String, ProviderEndpoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Iteration ceiling for one loop run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Max tokens per model response (vendors that require it)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// HTTP timeout for one vendor call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_max_iterations() -> u32 {
    10
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Row cap appended as `LIMIT n` when a query has none
    #[serde(default = "default_row_limit")]
    pub default_row_limit: u32,

    #[serde(default = "default_statement_timeout_ms")]
    pub statement_timeout_ms: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_row_limit() -> u32 {
    500
}
fn default_statement_timeout_ms() -> u64 {
    15_000
}
fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            default_row_limit: default_row_limit(),
            statement_timeout_ms: default_statement_timeout_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodebaseConfig {
    /// Where remote repositories are cloned
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// How many matched files a content search scans
    #[serde(default = "default_max_content_files")]
    pub max_content_files: usize,

    #[serde(default = "default_max_matches_per_file")]
    pub max_matches_per_file: usize,

    /// Matched lines longer than this are cut
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
}

fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("parsec-repos")
}
fn default_max_files() -> usize {
    200
}
fn default_max_content_files() -> usize {
    50
}
fn default_max_matches_per_file() -> usize {
    10
}
fn default_max_line_length() -> usize {
    300
}

impl Default for CodebaseConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            max_files: default_max_files(),
            max_content_files: default_max_content_files(),
            max_matches_per_file: default_max_matches_per_file(),
            max_line_length: default_max_line_length(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Per-entry message cap, in characters
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,

    #[serde(default = "default_max_timeframe_days")]
    pub max_timeframe_days: u64,

    /// Timeframe used when the model omits one
    #[serde(default = "default_timeframe")]
    pub default_timeframe: String,
}

fn default_max_entries() -> usize {
    200
}
fn default_max_message_length() -> usize {
    2000
}
fn default_max_timeframe_days() -> u64 {
    30
}
fn default_timeframe() -> String {
    "1h".into()
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            max_message_length: default_max_message_length(),
            max_timeframe_days: default_max_timeframe_days(),
            default_timeframe: default_timeframe(),
        }
    }
}

/// Endpoint override for one provider (proxies, self-hosted gateways, tests).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderEndpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default location, with env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        // Environment variable overrides (highest priority)
        if let Ok(host) = std::env::var("PARSEC_HOST") {
            config.server.host = host;
        }

        if let Ok(port) = std::env::var("PARSEC_PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PARSEC_PORT is not a port: {port}")))?;
        }

        if let Ok(dir) = std::env::var("PARSEC_CACHE_DIR") {
            config.codebase.cache_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".parsec")
    }

    /// Base URL override for a provider, if configured.
    pub fn provider_base_url(&self, provider: &str) -> Option<&str> {
        self.providers
            .get(provider)
            .and_then(|p| p.base_url.as_deref())
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        if self.database.default_row_limit == 0 {
            return Err(ConfigError::Invalid(
                "database.default_row_limit must be at least 1".into(),
            ));
        }

        if self.codebase.max_files == 0 {
            return Err(ConfigError::Invalid(
                "codebase.max_files must be at least 1".into(),
            ));
        }

        if self.logs.max_timeframe_days == 0 {
            return Err(ConfigError::Invalid(
                "logs.max_timeframe_days must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}
