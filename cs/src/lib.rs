//! ChunkStore - token-bounded response chunking
//!
//! Keeps tool responses within an LLM token budget. Payloads that fit are
//! returned inline; payloads that don't are split on record boundaries and
//! stored behind a session handle for page-by-page retrieval.
//!
//! # Architecture
//!
//! ```text
//! payload ──► ResponseManager ──► TokenEstimator (fits?)
//!                  │                     │
//!                  │ no                  │ yes
//!                  ▼                     ▼
//!              Splitter ──► SessionStore.put   Inline(json)
//!                  │
//!                  ▼
//!          Handle(session_id, chunk 0, chunk_count)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use chunkstore::{ChunkingConfig, FormatOptions, ResponseManager};
//!
//! let manager = ResponseManager::from_config(&ChunkingConfig::default())?;
//! let response = manager.format(&payload, FormatOptions::default());
//! println!("{}", response.render());
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod estimator;
pub mod response;
pub mod session;
pub mod splitter;

pub use config::ChunkingConfig;
pub use error::{ErrorKind, EstimateError, SessionError};
pub use estimator::{HeuristicCounter, TokenCounter, TokenEstimator};
pub use response::{
    ChunkHandle, FormatOptions, FormattedResponse, ResponseManager, chunk_text, estimate_error_text, fingerprint,
    format_error, session_error_text,
};
pub use session::{ChunkSet, NewSession, SessionId, SessionInfo, SessionStore};
pub use splitter::{Fragment, Layout, SplitOutcome, Splitter, collect_rows};

/// Default token budget for one response
pub const DEFAULT_MAX_TOKENS: usize = 9000;

/// Default model identifier for token estimation
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Default session lifetime (30 minutes)
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 1800;

/// Default cap on live sessions
pub const DEFAULT_MAX_SESSIONS: usize = 256;
