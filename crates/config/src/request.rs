//! Per-request settings supplied by the operator's client.
//!
//! Field names are camelCase on the wire. Nothing here is persisted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Model provider credentials for one request.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Provider identifier ("anthropic", "openai", "mistral", "google")
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn default_provider() -> String {
    "anthropic".into()
}

impl ProviderConfig {
    pub fn new(
        provider: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            api_key: api_key.into(),
            model: model.into(),
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// The system prompt, treating an empty string as absent.
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref().filter(|s| !s.trim().is_empty())
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("system_prompt", &self.system_prompt)
            .finish()
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &str) -> &'static str {
    if s.is_empty() { "None" } else { "[REDACTED]" }
}

/// The connectors the operator attached to a request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectorsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<DatabaseConnector>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codebase: Option<CodebaseConnector>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<LogsConnector>,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConnector {
    /// Database flavor as selected in the client ("postgres")
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default)]
    pub connection_string: String,
}

impl std::fmt::Debug for DatabaseConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConnector")
            .field("kind", &self.kind)
            .field("connection_string", &redact(&self.connection_string))
            .finish()
    }
}

/// Codebase connector as sent by the client: `{source, url?, path?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodebaseConnector {
    #[serde(default)]
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Where the codebase tool reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodebaseSource {
    /// A remote repository URL, cloned into the repository cache
    Remote { url: String },
    /// A directory on the local filesystem
    Local { path: String },
}

impl CodebaseConnector {
    /// Resolve to a usable source.
    ///
    /// Sources other than `github-url` and `local` (e.g. `github-token`,
    /// `trajan`) are not wired up yet and resolve to `None`.
    pub fn resolve(&self) -> Option<CodebaseSource> {
        match self.source.as_str() {
            "github-url" => self
                .url
                .as_ref()
                .filter(|u| !u.trim().is_empty())
                .map(|url| CodebaseSource::Remote { url: url.clone() }),
            "local" => self
                .path
                .as_ref()
                .filter(|p| !p.trim().is_empty())
                .map(|path| CodebaseSource::Local { path: path.clone() }),
            _ => None,
        }
    }
}

/// Logs connector, in either of the two shapes clients send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogsConnector {
    /// `{provider, apiKey, projectId}`
    Single(LogsTarget),
    /// `{<provider>: {enabled, apiKey, projectId}, ...}`
    PerProvider(BTreeMap<String, ProviderLogs>),
}

/// One provider entry of the per-provider logs shape.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderLogs {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl std::fmt::Debug for ProviderLogs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderLogs")
            .field("enabled", &self.enabled)
            .field("api_key", &redact(self.api_key.as_deref().unwrap_or("")))
            .field("project_id", &self.project_id)
            .finish()
    }
}

/// The single logs provider the logs tool talks to.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsTarget {
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl std::fmt::Debug for LogsTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogsTarget")
            .field("provider", &self.provider)
            .field("api_key", &redact(self.api_key.as_deref().unwrap_or("")))
            .field("project_id", &self.project_id)
            .finish()
    }
}

impl LogsConnector {
    /// Resolve to one target: the flat shape as-is, or the first enabled
    /// provider (in provider-name order) of the per-provider shape.
    pub fn resolve(&self) -> Option<LogsTarget> {
        match self {
            LogsConnector::Single(target) => Some(target.clone()),
            LogsConnector::PerProvider(providers) => providers
                .iter()
                .find(|(_, settings)| settings.enabled)
                .map(|(name, settings)| LogsTarget {
                    provider: name.clone(),
                    api_key: settings.api_key.clone(),
                    project_id: settings.project_id.clone(),
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_config_defaults_to_anthropic() {
        let config: ProviderConfig =
            serde_json::from_str(r#"{"apiKey":"sk-ant","model":"claude-sonnet-4-20250514"}"#)
                .unwrap();
        assert_eq!(config.provider, "anthropic");
        assert_eq!(config.api_key, "sk-ant");
        assert!(config.system_prompt().is_none());
    }

    #[test]
    fn blank_system_prompt_is_absent() {
        let config = ProviderConfig::new("openai", "sk", "gpt-4.1").with_system_prompt("  ");
        assert!(config.system_prompt().is_none());
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = ProviderConfig::new("openai", "sk-secret-123", "gpt-4.1");
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret-123"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn codebase_github_url_resolves_to_remote() {
        let connector: CodebaseConnector =
            serde_json::from_str(r#"{"source":"github-url","url":"https://github.com/a/b"}"#)
                .unwrap();
        assert_eq!(
            connector.resolve(),
            Some(CodebaseSource::Remote {
                url: "https://github.com/a/b".into()
            })
        );
    }

    #[test]
    fn codebase_unwired_sources_resolve_to_none() {
        for source in ["github-token", "trajan", ""] {
            let connector = CodebaseConnector {
                source: source.into(),
                url: Some("https://github.com/a/b".into()),
                path: None,
            };
            assert!(connector.resolve().is_none(), "source {source}");
        }
    }

    #[test]
    fn logs_flat_shape() {
        let connectors: ConnectorsConfig = serde_json::from_str(
            r#"{"logs":{"provider":"vercel","apiKey":"tok","projectId":"prj_1"}}"#,
        )
        .unwrap();
        let target = connectors.logs.unwrap().resolve().unwrap();
        assert_eq!(target.provider, "vercel");
        assert_eq!(target.project_id.as_deref(), Some("prj_1"));
    }

    #[test]
    fn logs_per_provider_shape_picks_first_enabled() {
        let connectors: ConnectorsConfig = serde_json::from_str(
            r#"{"logs":{
                "datadog":{"enabled":false,"apiKey":"dd"},
                "vercel":{"enabled":true,"apiKey":"tok","projectId":"prj_2"}
            }}"#,
        )
        .unwrap();
        let target = connectors.logs.unwrap().resolve().unwrap();
        assert_eq!(target.provider, "vercel");
        assert_eq!(target.api_key.as_deref(), Some("tok"));
    }

    #[test]
    fn logs_per_provider_none_enabled() {
        let connector: LogsConnector =
            serde_json::from_str(r#"{"vercel":{"enabled":false}}"#).unwrap();
        assert!(connector.resolve().is_none());
    }
}
