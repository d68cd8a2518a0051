//! Tool error types

use chunkstore::{ErrorKind, format_error};
use serde_json::{Map, json};
use thiserror::Error;

use super::ToolResult;

/// Errors raised before a tool gets to do its work
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("Missing required parameter: {name}")]
    MissingParameter { name: String },

    #[error("Invalid parameter {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },
}

impl ToolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::MissingParameter { .. } | ToolError::InvalidArgument { .. } => ErrorKind::InvalidInput,
            ToolError::UnknownTool { .. } => ErrorKind::UnknownTool,
        }
    }

    /// Render as an error envelope result
    pub fn into_result(self) -> ToolResult {
        let mut extra = Map::new();
        match &self {
            ToolError::MissingParameter { name } | ToolError::InvalidArgument { name, .. } => {
                extra.insert("parameter".to_string(), json!(name));
            }
            ToolError::UnknownTool { name } => {
                extra.insert("tool".to_string(), json!(name));
            }
        }
        ToolResult::error(format_error(self.kind(), self.to_string(), extra))
    }
}
