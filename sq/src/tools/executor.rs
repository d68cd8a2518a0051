//! ToolExecutor - registry and dispatch for SQL tools

use std::collections::HashMap;
use tracing::debug;

use super::builtin::{ExecuteSqlTool, GetChunkTool, ListWorkspacesTool, SessionInfoTool};
use super::{Tool, ToolCall, ToolContext, ToolDefinition, ToolError, ToolResult};

/// Owns the registered tools
pub struct ToolExecutor {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolExecutor {
    /// Create executor with the standard SQL tools
    pub fn standard() -> Self {
        debug!("ToolExecutor::standard: called");
        let mut executor = Self::empty();
        executor.add_tool(Box::new(ExecuteSqlTool));
        executor.add_tool(Box::new(GetChunkTool));
        executor.add_tool(Box::new(SessionInfoTool));
        executor.add_tool(Box::new(ListWorkspacesTool));
        executor
    }

    /// Create an empty executor (for testing)
    pub fn empty() -> Self {
        debug!("ToolExecutor::empty: called");
        Self { tools: HashMap::new() }
    }

    /// Add a tool to the executor
    pub fn add_tool(&mut self, tool: Box<dyn Tool>) {
        debug!(tool_name = %tool.name(), "ToolExecutor::add_tool: called");
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Tool definitions, sorted by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        debug!("ToolExecutor::definitions: called");
        let mut definitions: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Execute a tool call
    pub async fn execute(&self, tool_call: &ToolCall, ctx: &ToolContext) -> ToolResult {
        debug!(tool_name = %tool_call.name, tool_id = %tool_call.id, "ToolExecutor::execute: called");
        match self.tools.get(&tool_call.name) {
            Some(tool) => {
                debug!("ToolExecutor::execute: tool found, executing");
                tool.execute(tool_call.input.clone(), ctx).await
            }
            None => {
                debug!("ToolExecutor::execute: unknown tool");
                ToolError::UnknownTool {
                    name: tool_call.name.clone(),
                }
                .into_result()
            }
        }
    }

    /// Check if a tool exists
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names, sorted
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::{StaticExecutor, TabularResult};
    use crate::workspace::Role;
    use chunkstore::{ResponseManager, SessionStore, TokenEstimator};
    use std::sync::Arc;
    use std::time::Duration;

    fn context() -> ToolContext {
        let responses = ResponseManager::new(
            Arc::new(TokenEstimator::heuristic()),
            Arc::new(SessionStore::new(Duration::from_secs(60), None)),
            1000,
        );
        ToolContext::new(
            Arc::new(responses),
            Arc::new(StaticExecutor::new(TabularResult::default())),
            Role::Analyst,
        )
    }

    #[test]
    fn test_standard_executor_has_sql_tools() {
        let executor = ToolExecutor::standard();
        assert_eq!(
            executor.tool_names(),
            vec!["execute_sql", "get_chunk", "get_chunking_session_info", "list_workspaces"]
        );
    }

    #[test]
    fn test_definitions_sorted_with_schemas() {
        let defs = ToolExecutor::standard().definitions();
        assert_eq!(defs.len(), 4);
        assert_eq!(defs[0].name, "execute_sql");
        assert!(defs.iter().all(|d| d.input_schema["type"] == "object"));
    }

    #[test]
    fn test_empty_executor_registers_added_tools() {
        let mut executor = ToolExecutor::empty();
        assert!(!executor.has_tool("get_chunk"));

        executor.add_tool(Box::new(GetChunkTool));
        assert!(executor.has_tool("get_chunk"));
        assert!(!executor.has_tool("execute_sql"));
        assert_eq!(executor.definitions().len(), 1);
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let executor = ToolExecutor::standard();
        let call = ToolCall {
            id: "call_1".to_string(),
            name: "unknown_tool".to_string(),
            input: serde_json::json!({}),
        };

        let result = executor.execute(&call, &context()).await;
        assert!(result.is_error);
        assert!(result.content.contains(r#""error":"unknown_tool""#));
        assert!(result.content.contains("Unknown tool: unknown_tool"));
    }
}
