//! Warehouse access
//!
//! `QueryExecutor` is the seam between the tools and whatever actually runs
//! SQL. `StatementExecutor` talks to the statement execution HTTP API;
//! `StaticExecutor` serves canned results.

mod error;
mod statement;
mod static_executor;
mod types;

use std::sync::Arc;

use async_trait::async_trait;

use crate::workspace::WorkspaceConfig;

pub use error::QueryError;
pub use statement::StatementExecutor;
pub use static_executor::{ExecutedQuery, StaticExecutor};
pub use types::TabularResult;

/// Runs one SQL statement against a workspace
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, sql: &str, workspace: &WorkspaceConfig) -> Result<TabularResult, QueryError>;
}

/// Shared executor handle
pub type QueryExecutorRef = Arc<dyn QueryExecutor>;
