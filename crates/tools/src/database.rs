//! Database tool: read-only SQL against the operator's Postgres database.
//!
//! Statements are validated before any connection is opened. Each call
//! opens its own connection, runs inside a `READ ONLY` transaction with a
//! statement timeout, rolls back, and closes the connection on every path.

use std::str::FromStr;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use parsec_config::{DatabaseConfig, DatabaseConnector};
use parsec_core::error::ToolError;
use regex_lite::Regex;
use serde::Deserialize;
use sqlx::postgres::{PgColumn, PgConnectOptions, PgConnection, PgRow};
use sqlx::{Column, Connection, Row, TypeInfo};
use tracing::{debug, warn};

const TOOL_NAME: &str = "query_database";

const ALLOWED_PREFIXES: [&str; 4] = ["SELECT", "WITH", "EXPLAIN", "SHOW"];

static LIMIT_CLAUSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\blimit\b").expect("Invalid LIMIT regex"));

#[derive(Debug, Deserialize)]
struct QueryInput {
    #[serde(default)]
    query: Option<String>,
}

/// Executes `query_database` calls.
#[derive(Debug, Clone)]
pub struct DatabaseTool {
    row_limit: u32,
    statement_timeout: Duration,
    connect_timeout: Duration,
}

impl DatabaseTool {
    pub fn new(config: &DatabaseConfig) -> Self {
        Self {
            row_limit: config.default_row_limit,
            statement_timeout: Duration::from_millis(config.statement_timeout_ms),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        }
    }

    pub async fn execute(
        &self,
        input: &serde_json::Value,
        connector: Option<&DatabaseConnector>,
    ) -> Result<serde_json::Value, ToolError> {
        let input: QueryInput = serde_json::from_value(input.clone())
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        let query = input
            .query
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        let sql = prepare_query(&query, self.row_limit)?;

        let connector = connector
            .filter(|c| !c.connection_string.trim().is_empty())
            .ok_or_else(|| {
                ToolError::NotConfigured(
                    "No database connected. Add a connection string in the Connectors view".into(),
                )
            })?;

        if let Some(kind) = connector.kind.as_deref() {
            if !matches!(kind, "postgres" | "postgresql") {
                return Err(ToolError::NotConfigured(format!(
                    "Unsupported database type: \"{kind}\". Supported: postgres"
                )));
            }
        }

        let options = PgConnectOptions::from_str(&connector.connection_string)
            .map_err(|e| ToolError::NotConfigured(format!("Invalid connection string: {e}")))?;

        let start = Instant::now();
        let mut conn = tokio::time::timeout(self.connect_timeout, PgConnection::connect_with(&options))
            .await
            .map_err(|_| failed("Timed out connecting to database"))?
            .map_err(|e| failed(format!("Failed to connect to database: {e}")))?;

        let result = self.run_read_only(&mut conn, &sql).await;

        if let Err(e) = conn.close().await {
            warn!(error = %e, "Failed to close database connection");
        }

        let rows = result.map_err(|e| failed(format!("Query failed: {e}")))?;
        debug!(
            rows = rows.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Query complete"
        );

        let row_count = rows.len();
        Ok(serde_json::json!({
            "rows": rows,
            "rowCount": row_count,
        }))
    }

    async fn run_read_only(
        &self,
        conn: &mut PgConnection,
        sql: &str,
    ) -> Result<Vec<serde_json::Value>, sqlx::Error> {
        let mut tx = conn.begin().await?;

        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await?;

        let timeout = format!(
            "SET LOCAL statement_timeout = {}",
            self.statement_timeout.as_millis()
        );
        sqlx::query(&timeout).execute(&mut *tx).await?;

        let rows = sqlx::query(sql).fetch_all(&mut *tx).await?;
        tx.rollback().await?;

        Ok(rows.iter().map(row_to_json).collect())
    }
}

fn failed(reason: impl Into<String>) -> ToolError {
    ToolError::ExecutionFailed {
        tool_name: TOOL_NAME.into(),
        reason: reason.into(),
    }
}

/// Validate a statement and return the SQL to run.
///
/// The statement is trimmed and stripped of trailing semicolons. It must
/// start with `SELECT`, `WITH`, `EXPLAIN` or `SHOW` and contain no further
/// `;`. A `LIMIT {row_limit}` is appended when none is present, except for
/// `SHOW`.
pub fn prepare_query(query: &str, row_limit: u32) -> Result<String, ToolError> {
    let sql = query.trim().trim_end_matches(';').trim_end();
    let upper = sql.to_uppercase();

    let verb = ALLOWED_PREFIXES
        .iter()
        .find(|prefix| {
            upper.starts_with(*prefix)
                && upper[prefix.len()..]
                    .chars()
                    .next()
                    .is_none_or(|c| !c.is_ascii_alphanumeric() && c != '_')
        })
        .ok_or_else(|| {
            ToolError::Validation(format!(
                "Only read-only queries are allowed ({})",
                ALLOWED_PREFIXES.join(", ")
            ))
        })?;

    if sql.contains(';') {
        return Err(ToolError::Validation(
            "Multiple statements are not allowed".into(),
        ));
    }

    if *verb == "SHOW" || LIMIT_CLAUSE.is_match(sql) {
        Ok(sql.to_string())
    } else {
        Ok(format!("{sql} LIMIT {row_limit}"))
    }
}

/// Convert one row to a JSON object keyed by column name.
fn row_to_json(row: &PgRow) -> serde_json::Value {
    let object = row
        .columns()
        .iter()
        .map(|col| (col.name().to_string(), column_value(row, col)))
        .collect::<serde_json::Map<_, _>>();
    serde_json::Value::Object(object)
}

fn column_value(row: &PgRow, col: &PgColumn) -> serde_json::Value {
    use serde_json::Value;

    let idx = col.ordinal();
    let type_name = col.type_info().name();

    fn get<'r, T>(row: &'r PgRow, idx: usize) -> Option<Option<T>>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    {
        row.try_get::<Option<T>, _>(idx).ok()
    }

    let value = match type_name {
        "BOOL" => get::<bool>(row, idx).map(|v| v.map(Value::from)),
        "INT2" => get::<i16>(row, idx).map(|v| v.map(Value::from)),
        "INT4" => get::<i32>(row, idx).map(|v| v.map(Value::from)),
        "INT8" => get::<i64>(row, idx).map(|v| v.map(Value::from)),
        "OID" => get::<sqlx::postgres::types::Oid>(row, idx).map(|v| v.map(|o| Value::from(o.0))),
        "FLOAT4" => get::<f32>(row, idx).map(|v| v.map(|f| Value::from(f64::from(f)))),
        "FLOAT8" => get::<f64>(row, idx).map(|v| v.map(Value::from)),
        "NUMERIC" => get::<rust_decimal::Decimal>(row, idx).map(|v| v.map(|d| Value::from(d.to_string()))),
        "JSON" | "JSONB" => get::<serde_json::Value>(row, idx),
        "UUID" => get::<uuid::Uuid>(row, idx).map(|v| v.map(|u| Value::from(u.to_string()))),
        "TIMESTAMPTZ" => get::<chrono::DateTime<chrono::Utc>>(row, idx)
            .map(|v| v.map(|t| Value::from(t.to_rfc3339()))),
        "TIMESTAMP" => get::<chrono::NaiveDateTime>(row, idx)
            .map(|v| v.map(|t| Value::from(t.and_utc().to_rfc3339()))),
        "DATE" => get::<chrono::NaiveDate>(row, idx).map(|v| v.map(|d| Value::from(d.to_string()))),
        "TIME" => get::<chrono::NaiveTime>(row, idx).map(|v| v.map(|t| Value::from(t.to_string()))),
        "TEXT[]" | "VARCHAR[]" => get::<Vec<String>>(row, idx).map(|v| v.map(Value::from)),
        "INT4[]" => get::<Vec<i32>>(row, idx).map(|v| v.map(Value::from)),
        "INT8[]" => get::<Vec<i64>>(row, idx).map(|v| v.map(Value::from)),
        _ => get::<String>(row, idx).map(|v| v.map(Value::from)),
    };

    match value {
        Some(Some(v)) => v,
        Some(None) => Value::Null,
        None => Value::from(format!("<{}>", type_name.to_lowercase())),
    }
}
