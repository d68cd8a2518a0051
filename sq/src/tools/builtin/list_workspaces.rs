//! list_workspaces tool

use async_trait::async_trait;
use chunkstore::FormatOptions;
use serde_json::{Value, json};
use tracing::debug;

use crate::tools::{Tool, ToolContext, ToolResult};
use crate::workspace::Role;

/// List configured workspaces and the one calls will use
pub struct ListWorkspacesTool;

#[async_trait]
impl Tool for ListWorkspacesTool {
    fn name(&self) -> &'static str {
        "list_workspaces"
    }

    fn description(&self) -> &'static str {
        "List the configured warehouse workspaces and the workspace execute_sql uses by default."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _input: Value, ctx: &ToolContext) -> ToolResult {
        debug!("ListWorkspacesTool::execute: called");
        let active = ctx.resolve(None).ok().map(|r| r.workspace.name);
        let workspaces: Vec<Value> = ctx
            .workspaces
            .iter()
            .map(|w| {
                json!({
                    "name": w.name,
                    "host": w.host,
                    "warehouse_id": w.warehouse_id,
                    "active": active.as_deref() == Some(w.name.as_str()),
                })
            })
            .collect();

        let payload = json!({
            "role": ctx.role.to_string(),
            "active_workspace": active,
            "selectable": ctx.role == Role::Developer,
            "workspaces": workspaces,
        });
        ToolResult::success(ctx.responses.format(&payload, FormatOptions::default()).render())
    }
}
