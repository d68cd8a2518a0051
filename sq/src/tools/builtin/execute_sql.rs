//! execute_sql tool - run a statement and return a token-bounded result

use async_trait::async_trait;
use chunkstore::{ErrorKind, FormatOptions, fingerprint, format_error};
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use crate::tools::params;
use crate::tools::{Tool, ToolContext, ToolResult};

/// Run SQL against the resolved workspace
pub struct ExecuteSqlTool;

#[async_trait]
impl Tool for ExecuteSqlTool {
    fn name(&self) -> &'static str {
        "execute_sql"
    }

    fn description(&self) -> &'static str {
        "Execute a SQL statement on the warehouse. Small results are returned inline. \
         Large results return the first chunk plus a session_id; fetch the rest with get_chunk."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sql": {
                    "type": "string",
                    "description": "The SQL statement to execute"
                },
                "workspace": {
                    "type": "string",
                    "description": "Workspace name (honored for the developer role only)"
                },
                "max_tokens": {
                    "type": "integer",
                    "description": "Token budget for the response (default: configured max-tokens)"
                },
                "auto_chunk": {
                    "type": "boolean",
                    "description": "Split oversized results into chunks (default: true)",
                    "default": true
                }
            },
            "required": ["sql"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        debug!(?input, "ExecuteSqlTool::execute: called");
        let sql = match params::required_str(&input, "sql") {
            Ok(sql) if !sql.trim().is_empty() => sql,
            Ok(_) => {
                return ToolResult::error(format_error(
                    ErrorKind::InvalidInput,
                    "Parameter sql must not be empty",
                    Map::new(),
                ));
            }
            Err(e) => return e.into_result(),
        };
        let requested = match params::optional_str(&input, "workspace") {
            Ok(requested) => requested,
            Err(e) => return e.into_result(),
        };
        let max_tokens = match params::optional_positive(&input, "max_tokens") {
            Ok(max_tokens) => max_tokens,
            Err(e) => return e.into_result(),
        };
        let auto_chunk = match params::optional_bool(&input, "auto_chunk") {
            Ok(auto_chunk) => auto_chunk.unwrap_or(true),
            Err(e) => return e.into_result(),
        };

        let resolution = match ctx.resolve(requested) {
            Ok(resolution) => resolution,
            Err(e) => {
                debug!(error = %e, "ExecuteSqlTool::execute: no workspace");
                return ToolResult::error(format_error(ErrorKind::WorkspaceUnavailable, e.to_string(), Map::new()));
            }
        };
        let workspace = &resolution.workspace;
        if let Some(warning) = &resolution.warning {
            warn!(role = %ctx.role, workspace = %workspace.name, %warning, "Workspace request not honored");
        }

        let result = match ctx.executor.execute(sql, workspace).await {
            Ok(result) => result,
            Err(e) => {
                warn!(workspace = %workspace.name, error = %e, "Query failed");
                let mut extra = Map::new();
                extra.insert("workspace".to_string(), json!(workspace.name));
                if let Some(status) = e.status() {
                    extra.insert("status".to_string(), json!(status));
                }
                return ToolResult::error(format_error(ErrorKind::QueryFailed, e.to_string(), extra));
            }
        };

        info!(workspace = %workspace.name, rows = result.row_count(), "Query succeeded");
        let payload = result.into_payload(&workspace.name, resolution.warning.as_deref());

        let mut options = FormatOptions::default()
            .with_auto_chunk(auto_chunk)
            .with_fingerprint(fingerprint(sql));
        if let Some(budget) = max_tokens {
            options = options.with_budget(budget);
        }
        ToolResult::success(ctx.responses.format(&payload, options).render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::{StaticExecutor, TabularResult};
    use crate::workspace::{Role, WorkspaceConfig};
    use chunkstore::{ResponseManager, SessionStore, TokenEstimator};
    use std::sync::Arc;
    use std::time::Duration;

    fn table(n: usize) -> TabularResult {
        TabularResult::new(
            vec!["id".to_string(), "name".to_string()],
            (0..n).map(|i| vec![json!(i), json!(format!("name-{}", i))]).collect(),
        )
    }

    fn context(executor: StaticExecutor, role: Role) -> (ToolContext, Arc<StaticExecutor>) {
        let executor = Arc::new(executor);
        let responses = ResponseManager::new(
            Arc::new(TokenEstimator::heuristic()),
            Arc::new(SessionStore::new(Duration::from_secs(60), None)),
            1000,
        );
        let ctx = ToolContext::new(Arc::new(responses), executor.clone(), role).with_workspaces(
            vec![
                WorkspaceConfig::new("prod", "https://prod.example.com", "wh-prod"),
                WorkspaceConfig::new("dev", "https://dev.example.com", "wh-dev"),
            ],
            Some("prod".to_string()),
        );
        (ctx, executor)
    }

    fn parse(result: &ToolResult) -> Value {
        serde_json::from_str(&result.content).unwrap()
    }

    #[tokio::test]
    async fn test_small_result_inline() {
        let (ctx, executor) = context(StaticExecutor::new(table(3)), Role::Analyst);
        let result = ExecuteSqlTool.execute(json!({"sql": "select * from t"}), &ctx).await;

        assert!(!result.is_error);
        let payload = parse(&result);
        assert_eq!(payload["workspace"], "prod");
        assert_eq!(payload["row_count"], 3);
        assert_eq!(payload["rows"][2], json!({"id": 2, "name": "name-2"}));
        assert_eq!(executor.calls()[0].sql, "select * from t");
        assert!(ctx.responses.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_large_result_chunked() {
        let (ctx, _) = context(StaticExecutor::new(table(400)), Role::Analyst);
        let result = ExecuteSqlTool.execute(json!({"sql": "select * from t"}), &ctx).await;

        assert!(!result.is_error);
        let envelope = parse(&result);
        assert_eq!(envelope["chunked"], true);
        assert_eq!(envelope["total_rows"], 400);
        assert!(envelope["chunk_count"].as_u64().unwrap() > 1);

        let session_id = envelope["session_id"].as_str().unwrap();
        let info = ctx.responses.get_chunking_session_info(session_id).unwrap();
        assert_eq!(info.fingerprint, fingerprint("select * from t"));
    }

    #[tokio::test]
    async fn test_auto_chunk_disabled() {
        let (ctx, _) = context(StaticExecutor::new(table(400)), Role::Analyst);
        let result = ExecuteSqlTool
            .execute(json!({"sql": "select * from t", "auto_chunk": false}), &ctx)
            .await;

        let payload = parse(&result);
        assert_eq!(payload["rows"].as_array().unwrap().len(), 400);
        assert!(ctx.responses.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_max_tokens_override() {
        let (ctx, _) = context(StaticExecutor::new(table(3)), Role::Analyst);
        let result = ExecuteSqlTool
            .execute(json!({"sql": "select 1", "max_tokens": 20}), &ctx)
            .await;
        assert_eq!(parse(&result)["chunked"], true);
    }

    #[tokio::test]
    async fn test_analyst_workspace_ignored() {
        let (ctx, executor) = context(StaticExecutor::new(table(1)), Role::Analyst);
        let result = ExecuteSqlTool
            .execute(json!({"sql": "select 1", "workspace": "dev"}), &ctx)
            .await;

        let payload = parse(&result);
        assert_eq!(payload["workspace"], "prod");
        assert!(payload["warning"].as_str().unwrap().contains("ignored"));
        assert_eq!(executor.calls()[0].workspace, "prod");
    }

    #[tokio::test]
    async fn test_developer_selects_workspace() {
        let (ctx, executor) = context(StaticExecutor::new(table(1)), Role::Developer);
        let result = ExecuteSqlTool
            .execute(json!({"sql": "select 1", "workspace": "dev"}), &ctx)
            .await;

        let payload = parse(&result);
        assert_eq!(payload["workspace"], "dev");
        assert!(payload.get("warning").is_none());
        assert_eq!(executor.calls()[0].workspace, "dev");
    }

    #[tokio::test]
    async fn test_query_failure_envelope() {
        let (ctx, _) = context(StaticExecutor::failing(503, "warehouse unavailable"), Role::Analyst);
        let result = ExecuteSqlTool.execute(json!({"sql": "select 1"}), &ctx).await;

        assert!(result.is_error);
        let envelope = parse(&result);
        assert_eq!(envelope["error"], "query_failed");
        assert_eq!(envelope["workspace"], "prod");
        assert_eq!(envelope["status"], 503);
        assert!(envelope["message"].as_str().unwrap().contains("warehouse unavailable"));
    }

    #[tokio::test]
    async fn test_invalid_input() {
        let (ctx, executor) = context(StaticExecutor::new(table(1)), Role::Analyst);

        let missing = ExecuteSqlTool.execute(json!({}), &ctx).await;
        assert_eq!(parse(&missing)["error"], "invalid_input");

        let empty = ExecuteSqlTool.execute(json!({"sql": "   "}), &ctx).await;
        assert_eq!(parse(&empty)["error"], "invalid_input");

        let zero = ExecuteSqlTool.execute(json!({"sql": "select 1", "max_tokens": 0}), &ctx).await;
        assert_eq!(parse(&zero)["error"], "invalid_input");

        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_no_workspaces() {
        let (ctx, _) = context(StaticExecutor::new(table(1)), Role::Developer);
        let ctx = ctx.with_workspaces(Vec::new(), None);
        let result = ExecuteSqlTool.execute(json!({"sql": "select 1"}), &ctx).await;

        assert!(result.is_error);
        assert_eq!(parse(&result)["error"], "workspace_unavailable");
    }
}
