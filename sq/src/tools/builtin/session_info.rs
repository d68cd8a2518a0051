//! get_chunking_session_info tool

use async_trait::async_trait;
use chunkstore::session_error_text;
use serde_json::{Value, json};
use tracing::debug;

use crate::tools::params;
use crate::tools::{Tool, ToolContext, ToolResult};

/// Describe a chunking session without fetching data
pub struct SessionInfoTool;

#[async_trait]
impl Tool for SessionInfoTool {
    fn name(&self) -> &'static str {
        "get_chunking_session_info"
    }

    fn description(&self) -> &'static str {
        "Describe a chunking session: chunk count, total rows, creation and expiry times."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": {
                    "type": "string",
                    "description": "Session id from a chunked execute_sql response"
                }
            },
            "required": ["session_id"]
        })
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult {
        debug!(?input, "SessionInfoTool::execute: called");
        let session_id = match params::required_str(&input, "session_id") {
            Ok(session_id) => session_id,
            Err(e) => return e.into_result(),
        };

        match ctx.responses.get_chunking_session_info(session_id) {
            Ok(info) => ToolResult::success(json!(info).to_string()),
            Err(e) => ToolResult::error(session_error_text(&e)),
        }
    }
}
