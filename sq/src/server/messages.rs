//! Tool server message types
//!
//! Simple JSON-over-newline protocol. Each message is a single line of JSON followed by `\n`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::ToolDefinition;

/// Messages from the agent to the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ServerRequest {
    /// Run a tool; answered with `ToolResult` carrying the same id
    CallTool {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },

    /// List available tools
    ListTools { id: String },

    /// Ping to check if the server is alive
    Ping,

    /// Finish in-flight calls and exit
    Shutdown,
}

/// Responses from the server to the agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ServerResponse {
    /// Tool output; `content` is the rendered response text
    ToolResult { id: String, content: String, is_error: bool },

    /// Tool definitions
    Tools { id: String, tools: Vec<ToolDefinition> },

    /// Pong response to ping
    Pong { version: String },

    /// Error response for requests that could not be handled
    Error { message: String },

    /// Acknowledgment
    Ok,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_tool_deserialize() {
        let line = r#"{"type":"CallTool","id":"7","name":"get_chunk","input":{"session_id":"abc","chunk_index":1}}"#;
        let msg: ServerRequest = serde_json::from_str(line).unwrap();
        assert_eq!(
            msg,
            ServerRequest::CallTool {
                id: "7".to_string(),
                name: "get_chunk".to_string(),
                input: json!({"session_id": "abc", "chunk_index": 1}),
            }
        );
    }

    #[test]
    fn test_ping_roundtrip() {
        let msg: ServerRequest = serde_json::from_str(r#"{"type":"Ping"}"#).unwrap();
        assert_eq!(msg, ServerRequest::Ping);
    }

    #[test]
    fn test_tool_result_serialize() {
        let response = ServerResponse::ToolResult {
            id: "1".to_string(),
            content: "{}".to_string(),
            is_error: false,
        };
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"type":"ToolResult","id":"1","content":"{}","is_error":false}"#
        );
    }

    #[test]
    fn test_ok_serialize() {
        assert_eq!(serde_json::to_string(&ServerResponse::Ok).unwrap(), r#"{"type":"Ok"}"#);
    }

    #[test]
    fn test_unknown_type_fails() {
        assert!(serde_json::from_str::<ServerRequest>(r#"{"type":"Reboot"}"#).is_err());
    }
}
