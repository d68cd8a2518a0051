//! Warehouse error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while running a statement
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Access token not found. Set the {env} environment variable.")]
    MissingToken { env: String },

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Statement {statement_id} {state}: {message}")]
    Statement {
        statement_id: String,
        state: String,
        message: String,
    },

    #[error("Statement timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl QueryError {
    /// HTTP status when the warehouse answered with one
    pub fn status(&self) -> Option<u16> {
        match self {
            QueryError::Api { status, .. } => Some(*status),
            QueryError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_token_message() {
        let err = QueryError::MissingToken {
            env: "DATABRICKS_TOKEN".to_string(),
        };
        assert!(err.to_string().contains("DATABRICKS_TOKEN"));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_statement_message() {
        let err = QueryError::Statement {
            statement_id: "01ef".to_string(),
            state: "FAILED".to_string(),
            message: "Table not found: sales".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("FAILED"));
        assert!(msg.contains("Table not found"));
    }

    #[test]
    fn test_api_status() {
        let err = QueryError::Api {
            status: 403,
            message: "forbidden".to_string(),
        };
        assert_eq!(err.status(), Some(403));
    }
}
