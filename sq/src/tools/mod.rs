//! Tool system for SQL agents
//!
//! Every tool answers with text produced by the response manager, so results
//! are either inline JSON, a chunk handle, or an error envelope.

mod context;
mod error;
mod executor;
mod params;
mod traits;

pub mod builtin;

pub use context::ToolContext;
pub use error::ToolError;
pub use executor::ToolExecutor;
pub use traits::{Tool, ToolCall, ToolDefinition, ToolResult};
