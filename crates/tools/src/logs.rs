//! Logs tool: recent runtime logs from the operator's logging provider.
//!
//! One fetcher per provider; the response is normalized, filtered, sorted
//! newest first and truncated before it reaches the model.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parsec_config::{LogsConfig, LogsTarget};
use parsec_core::error::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

pub const VERCEL_BASE_URL: &str = "https://api.vercel.com";

const MS_PER_MINUTE: u64 = 60_000;
const MS_PER_HOUR: u64 = 3_600_000;
const MS_PER_DAY: u64 = 86_400_000;

/// Absolute `[start, end]` range in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

/// Fetches raw log entries from one provider.
#[async_trait]
pub trait LogFetcher: Send + Sync {
    /// Provider identifier, as used in the logs connector.
    fn name(&self) -> &str;

    async fn fetch(&self, target: &ResolvedTarget, window: TimeWindow) -> Result<Value, ToolError>;
}

/// A logs target with every required field present.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub provider: String,
    pub api_key: String,
    pub project_id: String,
}

/// Vercel runtime logs.
pub struct VercelFetcher {
    base_url: String,
    client: reqwest::Client,
}

impl VercelFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            base_url: VERCEL_BASE_URL.into(),
            client,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl LogFetcher for VercelFetcher {
    fn name(&self) -> &str {
        "vercel"
    }

    async fn fetch(&self, target: &ResolvedTarget, window: TimeWindow) -> Result<Value, ToolError> {
        let url = format!("{}/v3/runtime/logs", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("projectId", target.project_id.clone()),
                ("startDate", window.start_ms.to_string()),
                ("endDate", window.end_ms.to_string()),
            ])
            .bearer_auth(&target.api_key)
            .send()
            .await
            .map_err(|e| ToolError::Transport(format!("Vercel request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Vercel API error");
            return Err(ToolError::Transport(format!(
                "Vercel API error ({}): {body}",
                status.as_u16()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ToolError::Transport(format!("Failed to parse Vercel response: {e}")))
    }
}

#[derive(Debug, Default, Deserialize)]
struct LogsInput {
    #[serde(default)]
    timeframe: Option<String>,
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: Option<String>,
    pub level: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogsOutput {
    pub logs: Vec<LogEntry>,
    pub count: usize,
    pub total: usize,
    pub truncated: bool,
    pub provider: String,
}

/// Executes `fetch_logs` calls.
pub struct LogsTool {
    fetchers: BTreeMap<String, Arc<dyn LogFetcher>>,
    limits: LogsConfig,
}

impl LogsTool {
    /// A logs tool with no fetchers registered.
    pub fn empty(limits: LogsConfig) -> Self {
        Self {
            fetchers: BTreeMap::new(),
            limits,
        }
    }

    /// A logs tool with every built-in fetcher.
    pub fn new(limits: LogsConfig, vercel: VercelFetcher) -> Self {
        Self::empty(limits).with_fetcher(Arc::new(vercel))
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn LogFetcher>) -> Self {
        self.fetchers.insert(fetcher.name().to_string(), fetcher);
        self
    }

    pub fn supported_providers(&self) -> Vec<&str> {
        self.fetchers.keys().map(String::as_str).collect()
    }

    pub async fn execute(
        &self,
        input: &Value,
        target: Option<LogsTarget>,
    ) -> Result<Value, ToolError> {
        let input: LogsInput = serde_json::from_value(input.clone())
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let target = validate_target(target)?;

        let fetcher = self.fetchers.get(&target.provider).ok_or_else(|| {
            ToolError::NotConfigured(format!(
                "Unsupported log provider: \"{}\". Supported: {}",
                target.provider,
                self.supported_providers().join(", ")
            ))
        })?;

        let timeframe = input
            .timeframe
            .as_deref()
            .unwrap_or(self.limits.default_timeframe.as_str());
        let window = resolve_window(
            timeframe,
            self.limits.max_timeframe_days,
            Utc::now().timestamp_millis(),
        )?;

        debug!(provider = %target.provider, timeframe, "Fetching logs");
        let raw = fetcher.fetch(&target, window).await?;

        let output = process_entries(
            raw,
            input.level.as_deref(),
            input.search.as_deref(),
            &self.limits,
            &target.provider,
        );

        serde_json::to_value(output).map_err(|e| ToolError::ExecutionFailed {
            tool_name: "fetch_logs".into(),
            reason: e.to_string(),
        })
    }
}

/// Require provider, API key and project id, in that order.
fn validate_target(target: Option<LogsTarget>) -> Result<ResolvedTarget, ToolError> {
    let target = target
        .filter(|t| !t.provider.trim().is_empty())
        .ok_or_else(|| {
            ToolError::NotConfigured(
                "No log provider configured. Set it in the Connectors view".into(),
            )
        })?;

    let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

    let api_key = non_empty(target.api_key).ok_or_else(|| {
        ToolError::NotConfigured(format!(
            "Missing {} API key. Configure it in the Connectors view",
            target.provider
        ))
    })?;
    let project_id = non_empty(target.project_id).ok_or_else(|| {
        ToolError::NotConfigured(format!(
            "Missing {} project ID. Configure it in the Connectors view",
            target.provider
        ))
    })?;

    Ok(ResolvedTarget {
        provider: target.provider,
        api_key,
        project_id,
    })
}

/// Parse `<integer><m|h|d>` into milliseconds.
pub fn parse_timeframe(timeframe: &str, max_days: u64) -> Result<u64, ToolError> {
    let invalid = || {
        ToolError::Validation(format!(
            "Invalid timeframe: \"{timeframe}\". Use format like \"1h\", \"24h\", \"7d\""
        ))
    };

    let split = timeframe.char_indices().last().map_or(0, |(i, _)| i);
    let (amount, unit) = timeframe.split_at(split);
    if amount.is_empty() || !amount.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let multiplier = match unit {
        "m" => MS_PER_MINUTE,
        "h" => MS_PER_HOUR,
        "d" => MS_PER_DAY,
        _ => return Err(invalid()),
    };

    let too_large =
        || ToolError::Validation(format!("Timeframe too large. Maximum is {max_days}d"));

    let amount: u64 = amount.parse().map_err(|_| too_large())?;
    let duration_ms = amount.checked_mul(multiplier).ok_or_else(too_large)?;

    if duration_ms == 0 {
        return Err(ToolError::Validation(
            "Timeframe must be greater than zero".into(),
        ));
    }
    if duration_ms > max_days.saturating_mul(MS_PER_DAY) {
        return Err(too_large());
    }

    Ok(duration_ms)
}

/// The window of length `timeframe` ending at `now_ms`.
pub fn resolve_window(timeframe: &str, max_days: u64, now_ms: i64) -> Result<TimeWindow, ToolError> {
    let duration_ms = parse_timeframe(timeframe, max_days)?;
    Ok(TimeWindow {
        start_ms: now_ms - duration_ms as i64,
        end_ms: now_ms,
    })
}

/// Normalize, filter, sort and truncate a raw provider response.
pub fn process_entries(
    raw: Value,
    level: Option<&str>,
    search: Option<&str>,
    limits: &LogsConfig,
    provider: &str,
) -> LogsOutput {
    let mut entries = match raw {
        Value::Array(items) => items,
        Value::Object(mut obj) => match (obj.remove("logs"), obj.remove("data")) {
            (Some(Value::Array(items)), _) | (_, Some(Value::Array(items))) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    if let Some(level) = level.filter(|l| !l.is_empty()) {
        entries.retain(|e| e.get("level").and_then(Value::as_str) == Some(level));
    }

    if let Some(search) = search.filter(|s| !s.is_empty()) {
        let needle = search.to_lowercase();
        entries.retain(|e| message_of(e).to_lowercase().contains(&needle));
    }

    entries.sort_by_key(|e| std::cmp::Reverse(timestamp_ms(e.get("timestamp")).unwrap_or(0)));

    let total = entries.len();
    let logs: Vec<LogEntry> = entries
        .into_iter()
        .take(limits.max_entries)
        .map(|e| format_entry(e, limits.max_message_length))
        .collect();

    LogsOutput {
        count: logs.len(),
        total,
        truncated: total > limits.max_entries,
        provider: provider.to_string(),
        logs,
    }
}

fn message_of(entry: &Value) -> &str {
    entry.get("message").and_then(Value::as_str).unwrap_or("")
}

fn format_entry(mut entry: Value, max_message_length: usize) -> LogEntry {
    let timestamp = timestamp_ms(entry.get("timestamp"))
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true));

    let level = entry
        .get("level")
        .and_then(Value::as_str)
        .filter(|l| !l.is_empty())
        .unwrap_or("info")
        .to_string();

    let message = message_of(&entry).chars().take(max_message_length).collect();

    let mut take = |key: &str| {
        entry
            .as_object_mut()
            .and_then(|obj| obj.remove(key))
            .filter(|v| !v.is_null())
    };

    LogEntry {
        timestamp,
        level,
        message,
        source: take("source"),
        status_code: take("statusCode"),
        request_id: take("requestId"),
    }
}

/// Epoch milliseconds from a numeric or RFC 3339 timestamp.
fn timestamp_ms(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.timestamp_millis())
            .or_else(|| s.parse::<i64>().ok()),
        _ => None,
    }
}
