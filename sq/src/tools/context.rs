//! ToolContext - shared state handed to every tool call

use std::sync::Arc;

use chunkstore::{EstimateError, ResponseManager};
use tracing::debug;

use crate::config::Config;
use crate::warehouse::QueryExecutorRef;
use crate::workspace::{Resolution, Role, WorkspaceConfig, WorkspaceError, resolve_workspace};

/// Execution context for tools
///
/// Cheap to clone; the response manager and executor are shared. All
/// payloads leave through `responses`.
#[derive(Clone)]
pub struct ToolContext {
    /// Formats payloads and owns chunking sessions
    pub responses: Arc<ResponseManager>,

    /// Runs SQL
    pub executor: QueryExecutorRef,

    /// Configured workspaces
    pub workspaces: Arc<Vec<WorkspaceConfig>>,

    /// Workspace used when none is requested
    pub default_workspace: Option<String>,

    /// Caller role
    pub role: Role,
}

impl ToolContext {
    /// Create a context with no workspaces configured
    pub fn new(responses: Arc<ResponseManager>, executor: QueryExecutorRef, role: Role) -> Self {
        debug!(%role, "ToolContext::new: called");
        Self {
            responses,
            executor,
            workspaces: Arc::new(Vec::new()),
            default_workspace: None,
            role,
        }
    }

    /// Build the context from configuration
    pub fn from_config(config: &Config, executor: QueryExecutorRef) -> Result<Self, EstimateError> {
        debug!("ToolContext::from_config: called");
        let responses = Arc::new(ResponseManager::from_config(&config.chunking)?);
        Ok(Self::new(responses, executor, config.role)
            .with_workspaces(config.workspaces.clone(), config.default_workspace.clone()))
    }

    /// Builder method to set the workspaces
    pub fn with_workspaces(mut self, workspaces: Vec<WorkspaceConfig>, default_workspace: Option<String>) -> Self {
        debug!(count = workspaces.len(), ?default_workspace, "ToolContext::with_workspaces: called");
        self.workspaces = Arc::new(workspaces);
        self.default_workspace = default_workspace;
        self
    }

    /// Pick the workspace for a call
    pub fn resolve(&self, requested: Option<&str>) -> Result<Resolution, WorkspaceError> {
        resolve_workspace(self.role, requested, &self.workspaces, self.default_workspace.as_deref())
    }
}

impl std::fmt::Debug for ToolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolContext")
            .field("role", &self.role)
            .field("workspaces", &self.workspaces.len())
            .field("default_workspace", &self.default_workspace)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::{StaticExecutor, TabularResult};

    fn context(role: Role) -> ToolContext {
        let config = Config {
            role,
            default_workspace: Some("prod".to_string()),
            workspaces: vec![
                WorkspaceConfig::new("prod", "https://prod.example.com", "wh-prod"),
                WorkspaceConfig::new("dev", "https://dev.example.com", "wh-dev"),
            ],
            ..Default::default()
        };
        ToolContext::from_config(&config, Arc::new(StaticExecutor::new(TabularResult::default()))).unwrap()
    }

    #[test]
    fn test_from_config() {
        let ctx = context(Role::Developer);
        assert_eq!(ctx.workspaces.len(), 2);
        assert_eq!(ctx.responses.default_budget(), 9000);
    }

    #[test]
    fn test_resolve_uses_role() {
        assert_eq!(context(Role::Developer).resolve(Some("dev")).unwrap().workspace.name, "dev");
        assert_eq!(context(Role::Analyst).resolve(Some("dev")).unwrap().workspace.name, "prod");
    }

    #[test]
    fn test_resolve_without_workspaces() {
        let ctx = context(Role::Analyst).with_workspaces(Vec::new(), None);
        assert_eq!(ctx.resolve(None), Err(WorkspaceError::NoWorkspaces));
    }
}
