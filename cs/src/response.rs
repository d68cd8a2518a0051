//! ResponseManager - the token-budget boundary for tool responses
//!
//! Every payload returned to a caller passes through [`ResponseManager::format`].
//! Payloads within budget are returned inline as compact JSON. Larger ones
//! are split, stored as a session, and returned as a handle carrying the
//! first fragment so the caller can use it without a second round trip.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::config::ChunkingConfig;
use crate::error::{ErrorKind, EstimateError, SessionError};
use crate::estimator::TokenEstimator;
use crate::session::{ChunkSet, SessionId, SessionInfo, SessionStore};
use crate::splitter::{Fragment, Splitter};

/// Tokens held back from the fragment budget for the handle envelope
pub const HANDLE_RESERVE_TOKENS: usize = 160;

/// Options for a single `format` call
#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// Token budget (None = manager default)
    pub budget: Option<usize>,
    /// Split and store oversized payloads instead of returning them whole
    pub auto_chunk: bool,
    /// Opaque fingerprint of the originating query
    pub fingerprint: Option<String>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            budget: None,
            auto_chunk: true,
            fingerprint: None,
        }
    }
}

impl FormatOptions {
    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn with_auto_chunk(mut self, auto_chunk: bool) -> Self {
        self.auto_chunk = auto_chunk;
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }
}

/// Handle to a stored chunking session
#[derive(Debug, Clone)]
pub struct ChunkHandle {
    pub session_id: SessionId,
    pub first_fragment: Fragment,
    pub chunk_count: usize,
    pub total_rows: usize,
    pub expires_at: DateTime<Utc>,
}

/// Result of formatting a payload
#[derive(Debug, Clone)]
pub enum FormattedResponse {
    /// Compact serialization of the whole payload
    Inline(String),
    /// First fragment plus a handle for the rest
    Handle(ChunkHandle),
}

impl FormattedResponse {
    pub fn is_chunked(&self) -> bool {
        matches!(self, Self::Handle(_))
    }

    /// Render the text returned to the caller
    pub fn render(&self) -> String {
        match self {
            Self::Inline(text) => text.clone(),
            Self::Handle(handle) => {
                let mut envelope = json!({
                    "chunked": true,
                    "session_id": handle.session_id,
                    "chunk_index": 0,
                    "chunk_count": handle.chunk_count,
                    "total_rows": handle.total_rows,
                    "expires_at": handle.expires_at.to_rfc3339(),
                    "data": handle.first_fragment.data,
                    "next": format!(
                        "Call get_chunk with session_id and chunk_index 1..{} for the remaining chunks",
                        handle.chunk_count.saturating_sub(1)
                    ),
                });
                if handle.first_fragment.oversized {
                    envelope["oversized"] = json!(true);
                    envelope["warning"] = json!(ErrorKind::OversizedSingleRecord.as_str());
        envelope["warning"] = json!(ErrorKind::OversizedSingleRecord.as_str());
                }
                envelope.to_string()
            }
        }
    }
}

/// Fingerprint of a query or payload (not cryptographic)
pub fn fingerprint(text: &str) -> String {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    text.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Build an inline error envelope: `{error, message, ..extra}`
pub fn format_error(kind: ErrorKind, message: impl Into<String>, extra: Map<String, Value>) -> String {
    let mut envelope = Map::new();
    envelope.insert("error".to_string(), json!(kind.as_str()));
    envelope.insert("message".to_string(), json!(message.into()));
    for (key, value) in extra {
        if key != "error" && key != "message" {
            envelope.insert(key, value);
        }
    }
    Value::Object(envelope).to_string()
}

/// Error envelope for a session lookup failure
pub fn session_error_text(err: &SessionError) -> String {
    let mut extra = Map::new();
    match err {
        SessionError::SessionNotFound { session_id } => {
            extra.insert("session_id".to_string(), json!(session_id));
        }
        SessionError::ChunkIndexOutOfRange {
            session_id,
            index,
            chunk_count,
        } => {
            extra.insert("session_id".to_string(), json!(session_id));
            extra.insert("chunk_index".to_string(), json!(index));
            extra.insert("chunk_count".to_string(), json!(chunk_count));
            let range = if *chunk_count == 0 {
                json!([])
            } else {
                json!([0, chunk_count - 1])
            };
            extra.insert("valid_range".to_string(), range);
        }
    }
    format_error(err.kind(), err.to_string(), extra)
}

/// Error envelope for an encoding that could not be built
pub fn estimate_error_text(err: &EstimateError) -> String {
    let mut extra = Map::new();
    match err {
        EstimateError::EncodingUnavailable { encoding, .. } => {
            extra.insert("encoding".to_string(), json!(encoding));
        }
    }
    format_error(err.kind(), err.to_string(), extra)
}

/// Chunk envelope for a fetched fragment
pub fn chunk_text(session_id: &str, fragment: &Fragment) -> String {
    let mut envelope = json!({
        "session_id": session_id,
        "chunk_index": fragment.index,
        "chunk_count": fragment.total,
        "record_count": fragment.record_count,
        "data": fragment.data,
    });
    if fragment.oversized {
        envelope["oversized"] = json!(true);
        envelope["warning"] = json!(ErrorKind::OversizedSingleRecord.as_str());
    }
    envelope.to_string()
}

/// Orchestrates estimation, splitting and session storage
#[derive(Debug)]
pub struct ResponseManager {
    estimator: Arc<TokenEstimator>,
    sessions: Arc<SessionStore>,
    default_budget: usize,
}

impl ResponseManager {
    pub fn new(estimator: Arc<TokenEstimator>, sessions: Arc<SessionStore>, default_budget: usize) -> Self {
        Self {
            estimator,
            sessions,
            default_budget,
        }
    }

    /// Build the estimator and session store from configuration
    pub fn from_config(config: &ChunkingConfig) -> Result<Self, EstimateError> {
        let estimator = Arc::new(TokenEstimator::new(config.model.clone())?);
        let sessions = Arc::new(SessionStore::new(config.session_ttl(), config.max_sessions));
        Ok(Self::new(estimator, sessions, config.max_tokens))
    }

    pub fn estimator(&self) -> &Arc<TokenEstimator> {
        &self.estimator
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn default_budget(&self) -> usize {
        self.default_budget
    }

    /// Format a payload for a caller
    pub fn format(&self, payload: &Value, options: FormatOptions) -> FormattedResponse {
        let budget = options.budget.unwrap_or(self.default_budget);
        let tokens = self.estimator.estimate(payload, true);
        debug!(tokens, budget, auto_chunk = options.auto_chunk, "ResponseManager::format: called");

        if tokens <= budget || !options.auto_chunk {
            return FormattedResponse::Inline(payload.to_string());
        }

        let fragment_budget = budget.saturating_sub(HANDLE_RESERVE_TOKENS).max(budget / 2);
        let outcome = Splitter::new(&self.estimator, fragment_budget).split(payload);
        if outcome.fragments.is_empty() {
            debug!("ResponseManager::format: nothing to split, returning inline");
            return FormattedResponse::Inline(payload.to_string());
        }

        let fingerprint = options
            .fingerprint
            .unwrap_or_else(|| fingerprint(&payload.to_string()));
        let chunks = ChunkSet::from_split(outcome, fingerprint);
        let first_fragment = chunks.fragments[0].clone();
        let chunk_count = chunks.chunk_count();
        let total_rows = chunks.total_records;

        let created = self.sessions.put(chunks);
        let session_id = created.id;
        let expires_at = created.expires_at;

        info!(%session_id, tokens, budget, chunk_count, total_rows, "Chunked oversized response");
        FormattedResponse::Handle(ChunkHandle {
            session_id,
            first_fragment,
            chunk_count,
            total_rows,
            expires_at,
        })
    }

    /// Fetch a fragment; negative indexes are out of range
    pub fn get_chunk(&self, session_id: &str, chunk_index: i64) -> Result<Fragment, SessionError> {
        debug!(%session_id, chunk_index, "ResponseManager::get_chunk: called");
        match usize::try_from(chunk_index) {
            Ok(index) => self.sessions.get(session_id, index),
            Err(_) => {
                let info = self.sessions.info(session_id)?;
                Err(SessionError::ChunkIndexOutOfRange {
                    session_id: session_id.to_string(),
                    index: chunk_index,
                    chunk_count: info.chunk_count,
                })
            }
        }
    }

    /// Fetch a fragment rendered as a chunk envelope or error envelope
    pub fn get_chunk_text(&self, session_id: &str, chunk_index: i64) -> String {
        match self.get_chunk(session_id, chunk_index) {
            Ok(fragment) => chunk_text(session_id, &fragment),
            Err(e) => session_error_text(&e),
        }
    }

    pub fn get_chunking_session_info(&self, session_id: &str) -> Result<SessionInfo, SessionError> {
        self.sessions.info(session_id)
    }

    /// Session info rendered as JSON or an error envelope
    pub fn session_info_text(&self, session_id: &str) -> String {
        match self.get_chunking_session_info(session_id) {
            Ok(info) => json!(info).to_string(),
            Err(e) => session_error_text(&e),
        }
    }
}
