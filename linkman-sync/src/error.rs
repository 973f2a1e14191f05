//! Error types for the sync layer.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing or invalid configuration (e.g. no backend URL).
    #[error("configuration error: {0}")]
    Config(String),

    /// The service rejected the request with a 4xx status other than 429.
    /// Never retried.
    #[error("request rejected with status {status}: {body}")]
    Client { status: u16, body: String },

    /// Every attempt failed with a retryable error.
    #[error("request failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    /// Network error that is not tied to a response status.
    #[error("network error: {0}")]
    Network(String),

    /// A response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Local store error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    /// Returns true for errors a later attempt might not hit.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::RetriesExhausted { .. } | SyncError::Network(_))
    }

    /// The HTTP status carried by a client error.
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Client { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for SyncError {
    fn from(e: rusqlite::Error) -> Self {
        SyncError::Storage(e.to_string())
    }
}
