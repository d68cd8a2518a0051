//! Workspace configuration and role-gated selection

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Caller role; decides whether a requested workspace is honored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Always served from the default workspace
    #[default]
    Analyst,
    /// May target any configured workspace
    Developer,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "analyst" => Ok(Self::Analyst),
            "developer" => Ok(Self::Developer),
            other => Err(format!("Unknown role '{}', expected analyst or developer", other)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Analyst => write!(f, "analyst"),
            Self::Developer => write!(f, "developer"),
        }
    }
}

/// One warehouse endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Name callers use to select the workspace
    pub name: String,

    /// Base URL, e.g. https://example.cloud.databricks.com
    pub host: String,

    /// SQL warehouse to run statements on
    #[serde(rename = "warehouse-id")]
    pub warehouse_id: String,

    /// Environment variable holding the access token
    #[serde(rename = "token-env", default = "default_token_env")]
    pub token_env: String,
}

fn default_token_env() -> String {
    "DATABRICKS_TOKEN".to_string()
}

impl WorkspaceConfig {
    pub fn new(name: impl Into<String>, host: impl Into<String>, warehouse_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            warehouse_id: warehouse_id.into(),
            token_env: default_token_env(),
        }
    }

    /// Access token from the configured environment variable
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env).ok().filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkspaceError {
    #[error("No workspaces configured")]
    NoWorkspaces,
}

/// Outcome of workspace selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub workspace: WorkspaceConfig,
    /// Set when the request was not honored as given
    pub warning: Option<String>,
}

/// Pick the workspace a call runs against
///
/// The default is `default_name` when it names a configured workspace, else
/// the first one. Analysts always get the default. Developers get what they
/// ask for when it exists and fall back to the default otherwise.
pub fn resolve_workspace(
    role: Role,
    requested: Option<&str>,
    workspaces: &[WorkspaceConfig],
    default_name: Option<&str>,
) -> Result<Resolution, WorkspaceError> {
    debug!(%role, ?requested, count = workspaces.len(), "resolve_workspace: called");
    let default = default_name
        .and_then(|name| workspaces.iter().find(|w| w.name == name))
        .or_else(|| workspaces.first())
        .ok_or(WorkspaceError::NoWorkspaces)?;

    let requested = match requested.map(str::trim).filter(|r| !r.is_empty()) {
        Some(name) if name != default.name => name,
        _ => {
            return Ok(Resolution {
                workspace: default.clone(),
                warning: None,
            });
        }
    };

    match role {
        Role::Analyst => Ok(Resolution {
            workspace: default.clone(),
            warning: Some(format!(
                "Workspace '{}' ignored: analyst role always uses '{}'",
                requested, default.name
            )),
        }),
        Role::Developer => match workspaces.iter().find(|w| w.name == requested) {
            Some(workspace) => Ok(Resolution {
                workspace: workspace.clone(),
                warning: None,
            }),
            None => Ok(Resolution {
                workspace: default.clone(),
                warning: Some(format!(
                    "Unknown workspace '{}', falling back to '{}'",
                    requested, default.name
                )),
            }),
        },
    }
}
