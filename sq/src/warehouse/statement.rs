//! SQL statement execution over HTTP
//!
//! Submits a statement with inline JSON-array results, polls until it reaches
//! a terminal state, then follows result chunk links until every row is in.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{QueryError, QueryExecutor, TabularResult};
use crate::config::QueryConfig;
use crate::workspace::WorkspaceConfig;

/// Longest server-side wait the API accepts for the initial request
const MAX_WAIT_SECONDS: u64 = 50;

/// Shortest server-side wait the API accepts
const MIN_WAIT_SECONDS: u64 = 5;

#[derive(Debug, Deserialize)]
struct StatementResponse {
    statement_id: String,
    status: StatementStatus,
    #[serde(default)]
    manifest: Option<Manifest>,
    #[serde(default)]
    result: Option<ResultChunk>,
}

#[derive(Debug, Deserialize)]
struct StatementStatus {
    state: String,
    #[serde(default)]
    error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    schema: Schema,
}

#[derive(Debug, Deserialize)]
struct Schema {
    #[serde(default)]
    columns: Vec<ColumnInfo>,
}

#[derive(Debug, Deserialize)]
struct ColumnInfo {
    name: String,
    #[serde(default)]
    type_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultChunk {
    #[serde(default)]
    data_array: Vec<Vec<Value>>,
    #[serde(default)]
    next_chunk_internal_link: Option<String>,
}

/// Executor for the warehouse statement execution API
pub struct StatementExecutor {
    http: Client,
    timeout: Duration,
    poll_interval: Duration,
}

impl StatementExecutor {
    pub fn new(config: &QueryConfig) -> Result<Self, QueryError> {
        debug!(?config, "StatementExecutor::new: called");
        let timeout = config.timeout();
        let http = Client::builder().timeout(timeout).build().map_err(QueryError::Http)?;
        Ok(Self {
            http,
            timeout,
            poll_interval: config.poll_interval(),
        })
    }

    fn wait_timeout(&self) -> String {
        let seconds = self.timeout.as_secs().clamp(MIN_WAIT_SECONDS, MAX_WAIT_SECONDS);
        format!("{}s", seconds)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, token: &str) -> Result<T, QueryError> {
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            debug!(status = status.as_u16(), "StatementExecutor::send: error status");
            return Err(QueryError::Api {
                status: status.as_u16(),
                message: api_message(&text),
            });
        }

        serde_json::from_str(&text).map_err(|e| QueryError::InvalidResponse(e.to_string()))
    }

    async fn submit(&self, base: &str, token: &str, sql: &str, warehouse_id: &str) -> Result<StatementResponse, QueryError> {
        debug!(%base, %warehouse_id, "StatementExecutor::submit: called");
        let body = json!({
            "statement": sql,
            "warehouse_id": warehouse_id,
            "wait_timeout": self.wait_timeout(),
            "on_wait_timeout": "CONTINUE",
            "disposition": "INLINE",
            "format": "JSON_ARRAY",
        });
        let request = self.http.post(format!("{}/api/2.0/sql/statements", base)).json(&body);
        self.send(request, token).await
    }

    async fn poll(&self, base: &str, token: &str, statement_id: &str) -> Result<StatementResponse, QueryError> {
        debug!(%statement_id, "StatementExecutor::poll: called");
        let request = self.http.get(format!("{}/api/2.0/sql/statements/{}", base, statement_id));
        self.send(request, token).await
    }

    async fn fetch_chunk(&self, base: &str, token: &str, link: &str) -> Result<ResultChunk, QueryError> {
        debug!(%link, "StatementExecutor::fetch_chunk: called");
        let request = self.http.get(format!("{}{}", base, link));
        self.send(request, token).await
    }

    async fn cancel(&self, base: &str, token: &str, statement_id: &str) {
        debug!(%statement_id, "StatementExecutor::cancel: called");
        let url = format!("{}/api/2.0/sql/statements/{}/cancel", base, statement_id);
        if let Err(e) = self.http.post(url).bearer_auth(token).send().await {
            warn!(%statement_id, error = %e, "Failed to cancel timed out statement");
        }
    }
}

#[async_trait]
impl QueryExecutor for StatementExecutor {
    async fn execute(&self, sql: &str, workspace: &WorkspaceConfig) -> Result<TabularResult, QueryError> {
        debug!(workspace = %workspace.name, "StatementExecutor::execute: called");
        let token = workspace.token().ok_or_else(|| QueryError::MissingToken {
            env: workspace.token_env.clone(),
        })?;
        let base = workspace.host.trim_end_matches('/');
        let started = Instant::now();

        let mut response = self.submit(base, &token, sql, &workspace.warehouse_id).await?;
        loop {
            match response.status.state.as_str() {
                "SUCCEEDED" => break,
                "PENDING" | "RUNNING" => {
                    if started.elapsed() >= self.timeout {
                        self.cancel(base, &token, &response.statement_id).await;
                        return Err(QueryError::Timeout(self.timeout));
                    }
                    tokio::time::sleep(self.poll_interval).await;
                    response = self.poll(base, &token, &response.statement_id).await?;
                }
                state => {
                    let message = response
                        .status
                        .error
                        .as_ref()
                        .map(describe_error)
                        .unwrap_or_else(|| "no error message".to_string());
                    return Err(QueryError::Statement {
                        statement_id: response.statement_id.clone(),
                        state: state.to_string(),
                        message,
                    });
                }
            }
        }

        let columns = response
            .manifest
            .ok_or_else(|| QueryError::InvalidResponse("Succeeded statement has no manifest".to_string()))?
            .schema
            .columns;
        let types: Vec<Option<String>> = columns.iter().map(|c| c.type_name.clone()).collect();

        let mut rows = Vec::new();
        let mut chunk = response.result;
        while let Some(ResultChunk {
            data_array,
            next_chunk_internal_link,
        }) = chunk
        {
            rows.extend(data_array.into_iter().map(|row| convert_row(row, &types)));
            chunk = match next_chunk_internal_link {
                Some(link) => Some(self.fetch_chunk(base, &token, &link).await?),
                None => None,
            };
        }

        debug!(rows = rows.len(), elapsed_ms = started.elapsed().as_millis() as u64, "StatementExecutor::execute: done");
        Ok(TabularResult::new(columns.into_iter().map(|c| c.name).collect(), rows))
    }
}

fn describe_error(error: &ServiceError) -> String {
    match (&error.error_code, &error.message) {
        (Some(code), Some(message)) => format!("[{}] {}", code, message),
        (None, Some(message)) => message.clone(),
        (Some(code), None) => code.clone(),
        (None, None) => "no error message".to_string(),
    }
}

/// Pull `message` out of an API error body, or keep the raw text
fn api_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

fn convert_row(row: Vec<Value>, types: &[Option<String>]) -> Vec<Value> {
    row.into_iter()
        .enumerate()
        .map(|(i, cell)| convert_cell(cell, types.get(i).and_then(|t| t.as_deref())))
        .collect()
}

/// JSON_ARRAY results carry every value as a string; restore numbers and booleans
fn convert_cell(cell: Value, type_name: Option<&str>) -> Value {
    let converted = match (&cell, type_name) {
        (Value::String(text), Some("BYTE" | "SHORT" | "INT" | "LONG")) => text.parse::<i64>().ok().map(Value::from),
        (Value::String(text), Some("FLOAT" | "DOUBLE")) => text
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        (Value::String(text), Some("BOOLEAN")) => text.parse::<bool>().ok().map(Value::Bool),
        _ => None,
    };
    converted.unwrap_or(cell)
}
