//! get_chunk tool - fetch one fragment of a chunked result

use async_trait::async_trait;
use chunkstore::{chunk_text, session_error_text};
use serde_json::{Value, json};
use tracing::debug;

use crate::tools::params;
use crate::tools::{Tool, ToolContext, ToolResult};

/// Fetch a chunk by session id and zero-based index
pub struct GetChunkTool;

#[async_trait]
impl Tool for GetChunkTool {
    fn name(&self) -> &'static str {
        "get_chunk"
    }

    fn description(&self) -> &'static str {
        "Fetch one chunk of a chunked result. Chunk indexes start at 0; chunk 0 was returned by execute_sql."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": {
                    "type": "string",
                    "description": "Session id from a chunked execute_sql response"
                },
                "chunk_index": {
                    "type": "integer",
                    "description": "Zero-based chunk index (valid: 0..chunk_count)"
                }
            },
            "required": ["session_id", "chunk_index"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        debug!(?input, "GetChunkTool::execute: called");
        let session_id = match params::required_str(&input, "session_id") {
            Ok(session_id) => session_id,
            Err(e) => return e.into_result(),
        };
        let chunk_index = match params::required_i64(&input, "chunk_index") {
            Ok(chunk_index) => chunk_index,
            Err(e) => return e.into_result(),
        };

        match ctx.responses.get_chunk(session_id, chunk_index) {
            Ok(fragment) => ToolResult::success(chunk_text(session_id, &fragment)),
            Err(e) => {
                debug!(error = %e, "GetChunkTool::execute: lookup failed");
                ToolResult::error(session_error_text(&e))
            }
        }
    }
}
