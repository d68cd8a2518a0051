//! Error types for estimation and session lookups

use thiserror::Error;

/// Errors raised while constructing token encodings
#[derive(Debug, Error)]
pub enum EstimateError {
    #[error("Encoding {encoding} could not be constructed: {message}")]
    EncodingUnavailable { encoding: String, message: String },
}

/// Errors from session store lookups
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session not found or expired: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("Chunk index {index} out of range for session {session_id} (valid: 0..{chunk_count})")]
    ChunkIndexOutOfRange {
        session_id: String,
        index: i64,
        chunk_count: usize,
    },
}

impl EstimateError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::EstimationFailure
    }
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::SessionNotFound { .. } => ErrorKind::SessionNotFound,
            SessionError::ChunkIndexOutOfRange { .. } => ErrorKind::ChunkIndexOutOfRange,
        }
    }
}

/// Error kinds reported in inline error envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EstimationFailure,
    SessionNotFound,
    ChunkIndexOutOfRange,
    OversizedSingleRecord,
    QueryFailed,
    InvalidInput,
    WorkspaceUnavailable,
    UnknownTool,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EstimationFailure => "estimation_failure",
            Self::SessionNotFound => "session_not_found",
            Self::ChunkIndexOutOfRange => "chunk_index_out_of_range",
            Self::OversizedSingleRecord => "oversized_single_record",
            Self::QueryFailed => "query_failed",
            Self::InvalidInput => "invalid_input",
            Self::WorkspaceUnavailable => "workspace_unavailable",
            Self::UnknownTool => "unknown_tool",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
