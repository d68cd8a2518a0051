//! SqlTools - SQL warehouse tools for LLM agents
//!
//! Runs SQL against a remote analytic warehouse on behalf of an agent and
//! answers with payloads that fit the agent's token budget. Oversized results
//! are chunked by `chunkstore` and paged with `get_chunk`.
//!
//! # Modules
//!
//! - [`config`] - Configuration types and loading
//! - [`workspace`] - Workspace configuration and role-gated selection
//! - [`warehouse`] - Query executor trait and the statement API client
//! - [`tools`] - Tool system (execute_sql, get_chunk, ...)
//! - [`server`] - Line-delimited JSON tool server
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod server;
pub mod tools;
pub mod warehouse;
pub mod workspace;

pub use config::{Config, QueryConfig};
pub use server::{ServerRequest, ServerResponse, ToolServer};
pub use tools::{Tool, ToolCall, ToolContext, ToolDefinition, ToolExecutor, ToolResult};
pub use warehouse::{QueryError, QueryExecutor, StatementExecutor, StaticExecutor, TabularResult};
pub use workspace::{Resolution, Role, WorkspaceConfig, WorkspaceError, resolve_workspace};
