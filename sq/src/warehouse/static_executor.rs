//! In-memory executor with a fixed outcome

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use super::{QueryError, QueryExecutor, TabularResult};
use crate::workspace::WorkspaceConfig;

/// A statement seen by a `StaticExecutor`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedQuery {
    pub workspace: String,
    pub sql: String,
}

#[derive(Debug)]
enum Outcome {
    Rows(TabularResult),
    Fail { status: u16, message: String },
}

/// Executor that returns the same result for every statement
#[derive(Debug)]
pub struct StaticExecutor {
    outcome: Outcome,
    calls: Mutex<Vec<ExecutedQuery>>,
}

impl StaticExecutor {
    pub fn new(result: TabularResult) -> Self {
        Self {
            outcome: Outcome::Rows(result),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Executor whose statements all fail with an API error
    pub fn failing(status: u16, message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Fail {
                status,
                message: message.into(),
            },
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Statements executed so far, oldest first
    pub fn calls(&self) -> Vec<ExecutedQuery> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl QueryExecutor for StaticExecutor {
    async fn execute(&self, sql: &str, workspace: &WorkspaceConfig) -> Result<TabularResult, QueryError> {
        debug!(workspace = %workspace.name, "StaticExecutor::execute: called");
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(ExecutedQuery {
                workspace: workspace.name.clone(),
                sql: sql.to_string(),
            });

        match &self.outcome {
            Outcome::Rows(result) => Ok(result.clone()),
            Outcome::Fail { status, message } => Err(QueryError::Api {
                status: *status,
                message: message.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_returns_result_and_records_call() {
        let executor = StaticExecutor::new(TabularResult::new(vec!["n".to_string()], vec![vec![json!(1)]]));
        let workspace = WorkspaceConfig::new("prod", "https://prod.example.com", "wh");

        let result = executor.execute("select 1 as n", &workspace).await.unwrap();
        assert_eq!(result.row_count(), 1);
        assert_eq!(
            executor.calls(),
            vec![ExecutedQuery {
                workspace: "prod".to_string(),
                sql: "select 1 as n".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_failing() {
        let executor = StaticExecutor::failing(503, "warehouse unavailable");
        let workspace = WorkspaceConfig::new("prod", "https://prod.example.com", "wh");

        let err = executor.execute("select 1", &workspace).await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().contains("warehouse unavailable"));
    }
}
