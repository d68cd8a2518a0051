//! SqlTools configuration types and loading

use chunkstore::ChunkingConfig;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::workspace::{Role, WorkspaceConfig};

/// Main SqlTools configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Caller role for workspace selection
    pub role: Role,

    /// Workspace used when none is requested
    #[serde(rename = "default-workspace")]
    pub default_workspace: Option<String>,

    /// Configured warehouse endpoints
    pub workspaces: Vec<WorkspaceConfig>,

    /// Response chunking
    pub chunking: ChunkingConfig,

    /// Statement execution
    pub query: QueryConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if self.workspaces.is_empty() {
            return Err(eyre::eyre!(
                "No workspaces configured. Add at least one entry under 'workspaces'."
            ));
        }

        let mut seen = HashSet::new();
        for workspace in &self.workspaces {
            if !seen.insert(workspace.name.as_str()) {
                return Err(eyre::eyre!("Duplicate workspace name '{}'", workspace.name));
            }
        }

        if let Some(default) = &self.default_workspace {
            if !seen.contains(default.as_str()) {
                return Err(eyre::eyre!("Default workspace '{}' is not configured", default));
            }
        }

        self.chunking.validate().context("Invalid chunking settings")?;
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .sqltools.yml
        let local_config = PathBuf::from(".sqltools.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/sqltools/sqltools.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("sqltools").join("sqltools.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Statement execution settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Overall limit for one statement, including polling
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Delay between status polls
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 120_000,
            poll_interval_ms: 1000,
        }
    }
}

impl QueryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }
}
