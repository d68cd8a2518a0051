//! Configuration for the chunking engine

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Default token budget for one response
    #[serde(rename = "max-tokens")]
    pub max_tokens: usize,

    /// Model identifier used to pick the token encoding
    pub model: String,

    /// Lifetime of a chunking session
    #[serde(rename = "session-ttl-seconds")]
    pub session_ttl_seconds: u64,

    /// Maximum number of live sessions (None = unbounded)
    #[serde(rename = "max-sessions")]
    pub max_sessions: Option<usize>,

    /// Interval between expiry sweeps
    #[serde(rename = "sweep-interval-seconds")]
    pub sweep_interval_seconds: u64,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: crate::DEFAULT_MAX_TOKENS,
            model: crate::DEFAULT_MODEL.to_string(),
            session_ttl_seconds: crate::DEFAULT_SESSION_TTL_SECONDS,
            max_sessions: Some(crate::DEFAULT_MAX_SESSIONS),
            sweep_interval_seconds: 60,
        }
    }
}

impl ChunkingConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds.max(1))
    }

    /// Reject settings that would make every response or session unusable
    pub fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            return Err(eyre::eyre!("max-tokens must be greater than zero"));
        }
        if self.session_ttl_seconds == 0 {
            return Err(eyre::eyre!("session-ttl-seconds must be greater than zero"));
        }
        Ok(())
    }

    /// Load config from file, or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            return Self::load_from_file(config_path);
        }

        // Try default locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("chunkstore").join("config.yml")),
            Some(PathBuf::from("chunkstore.yml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                return Self::load_from_file(path);
            }
        }

        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
        let config: ChunkingConfig =
            serde_yaml::from_str(&content).context(format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }
}
