//! Routes canonical tool calls to connectors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parsec_config::{AppConfig, ConnectorsConfig};
use parsec_core::error::ToolError;
use parsec_core::{ToolCall, ToolDefinition, ToolHandler};
use tracing::{info, warn};

use crate::codebase::{CodebaseTool, SearchLimits};
use crate::database::DatabaseTool;
use crate::logs::{LogsTool, VercelFetcher};
use crate::repo_cache::RepoCache;
use crate::{ToolKind, definitions};

/// Connector executors shared by every request.
///
/// Built once at startup; owns the repository cache.
pub struct ToolServices {
    pub database: DatabaseTool,
    pub codebase: CodebaseTool,
    pub logs: LogsTool,
}

impl ToolServices {
    pub fn new(config: &AppConfig) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.agent.request_timeout_secs))
            .build()
            .map_err(|e| ToolError::Transport(format!("Failed to build HTTP client: {e}")))?;

        let mut vercel = VercelFetcher::new(client);
        if let Some(url) = config.provider_base_url("vercel") {
            vercel = vercel.with_base_url(url);
        }

        let cache = Arc::new(RepoCache::new(&config.codebase.cache_dir));

        Ok(Self {
            database: DatabaseTool::new(&config.database),
            codebase: CodebaseTool::new(cache, SearchLimits::from(&config.codebase)),
            logs: LogsTool::new(config.logs.clone(), vercel),
        })
    }
}

/// The tool handler for one request: shared executors plus that request's
/// connector settings.
pub struct ToolDispatcher {
    services: Arc<ToolServices>,
    connectors: ConnectorsConfig,
}

impl ToolDispatcher {
    pub fn new(services: Arc<ToolServices>, connectors: ConnectorsConfig) -> Self {
        Self {
            services,
            connectors,
        }
    }

    async fn dispatch(
        &self,
        kind: ToolKind,
        input: &serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        match kind {
            ToolKind::QueryDatabase => {
                self.services
                    .database
                    .execute(input, self.connectors.database.as_ref())
                    .await
            }
            ToolKind::SearchCodebase => {
                let source = self.connectors.codebase.as_ref().and_then(|c| c.resolve());
                self.services.codebase.execute(input, source).await
            }
            ToolKind::FetchLogs => {
                let target = self.connectors.logs.as_ref().and_then(|l| l.resolve());
                self.services.logs.execute(input, target).await
            }
        }
    }
}

#[async_trait]
impl ToolHandler for ToolDispatcher {
    fn definitions(&self) -> Vec<ToolDefinition> {
        definitions()
    }

    async fn execute(&self, call: &ToolCall) -> Result<serde_json::Value, ToolError> {
        let kind: ToolKind = call.name.parse()?;

        let start = Instant::now();
        let result = self.dispatch(kind, &call.input).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => info!(tool = %kind, duration_ms, "Tool executed"),
            Err(e) => warn!(tool = %kind, duration_ms, error = %e, "Tool failed"),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parsec_config::{CodebaseConnector, LogsConnector, request::ProviderLogs};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn services(cache_dir: &std::path::Path) -> Arc<ToolServices> {
        let mut config = AppConfig::default();
        config.codebase.cache_dir = cache_dir.to_path_buf();
        Arc::new(ToolServices::new(&config).unwrap())
    }

    fn call(name: &str, input: serde_json::Value) -> ToolCall {
        ToolCall {
            id: "call_1".into(),
            name: name.into(),
            input,
        }
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = ToolDispatcher::new(services(dir.path()), ConnectorsConfig::default());
        let err = dispatcher.execute(&call("drop_everything", json!({}))).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(name) if name == "drop_everything"));
    }

    #[tokio::test]
    async fn unsupported_codebase_source_is_not_configured() {
        let dir = tempfile::tempdir().unwrap();
        let connectors = ConnectorsConfig {
            codebase: Some(CodebaseConnector {
                source: "github-token".into(),
                url: Some("https://github.com/acme/api".into()),
                path: None,
            }),
            ..Default::default()
        };
        let dispatcher = ToolDispatcher::new(services(dir.path()), connectors);
        let err = dispatcher
            .execute(&call("search_codebase", json!({"pattern": "*.rs"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn local_codebase_is_searched() {
        let cache = tempfile::tempdir().unwrap();
        let repo = tempfile::tempdir().unwrap();
        std::fs::write(repo.path().join("README.md"), "hello").unwrap();

        let connectors = ConnectorsConfig {
            codebase: Some(CodebaseConnector {
                source: "local".into(),
                url: None,
                path: Some(repo.path().to_string_lossy().to_string()),
            }),
            ..Default::default()
        };
        let dispatcher = ToolDispatcher::new(services(cache.path()), connectors);
        let out = dispatcher
            .execute(&call("search_codebase", json!({})))
            .await
            .unwrap();
        assert_eq!(out["files"], json!(["README.md"]));
    }

    #[tokio::test]
    async fn disabled_log_providers_are_not_configured() {
        let dir = tempfile::tempdir().unwrap();
        let mut providers = BTreeMap::new();
        providers.insert(
            "vercel".to_string(),
            ProviderLogs {
                enabled: false,
                api_key: Some("tok".into()),
                project_id: Some("prj".into()),
            },
        );
        let connectors = ConnectorsConfig {
            logs: Some(LogsConnector::PerProvider(providers)),
            ..Default::default()
        };
        let dispatcher = ToolDispatcher::new(services(dir.path()), connectors);
        let err = dispatcher
            .execute(&call("fetch_logs", json!({"timeframe": "1h"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotConfigured(_)));
    }

    #[test]
    fn exposes_all_definitions() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = ToolDispatcher::new(services(dir.path()), ConnectorsConfig::default());
        assert_eq!(dispatcher.definitions().len(), 3);
    }
}
