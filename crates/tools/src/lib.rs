//! Read-only tools for Parsec.
//!
//! Three tools give the agent visibility into the operator's system:
//! SQL against their database, file and content search over their codebase,
//! and recent runtime logs from their hosting provider. The
//! [`ToolDispatcher`] routes a canonical tool call to the right connector
//! along with that connector's per-request settings.

pub mod codebase;
pub mod database;
pub mod dispatcher;
pub mod logs;
pub mod repo_cache;

use std::fmt;
use std::str::FromStr;

use parsec_core::ToolDefinition;
use serde_json::json;

pub use codebase::CodebaseTool;
pub use database::DatabaseTool;
pub use dispatcher::{ToolDispatcher, ToolServices};
pub use logs::{LogFetcher, LogsTool, VercelFetcher};
pub use repo_cache::RepoCache;

/// The fixed set of tools exposed to every provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    QueryDatabase,
    SearchCodebase,
    FetchLogs,
}

impl ToolKind {
    pub const ALL: [ToolKind; 3] = [
        ToolKind::QueryDatabase,
        ToolKind::SearchCodebase,
        ToolKind::FetchLogs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::QueryDatabase => "query_database",
            ToolKind::SearchCodebase => "search_codebase",
            ToolKind::FetchLogs => "fetch_logs",
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        match self {
            ToolKind::QueryDatabase => ToolDefinition {
                name: self.as_str().into(),
                description: "Execute a read-only SQL query against the connected database".into(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "SQL SELECT query" }
                    },
                    "required": ["query"]
                }),
            },
            ToolKind::SearchCodebase => ToolDefinition {
                name: self.as_str().into(),
                description: "Search for files or code patterns in the connected codebase".into(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "pattern": { "type": "string", "description": "Search pattern (glob or regex)" },
                        "content_search": { "type": "string", "description": "Search within file contents" }
                    }
                }),
            },
            ToolKind::FetchLogs => ToolDefinition {
                name: self.as_str().into(),
                description: "Retrieve server logs from the connected logging provider".into(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "timeframe": { "type": "string", "description": "Time range to fetch, e.g. '1h', '24h', '7d'" },
                        "level": { "type": "string", "enum": ["error", "warn", "info", "debug"] },
                        "search": { "type": "string", "description": "Filter logs containing this text" }
                    }
                }),
            },
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolKind {
    type Err = parsec_core::ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| parsec_core::ToolError::UnknownTool(s.to_string()))
    }
}

/// Definitions of every built-in tool, in a fixed order.
pub fn definitions() -> Vec<ToolDefinition> {
    ToolKind::ALL.iter().map(ToolKind::definition).collect()
}
