//! Error types for the sync agent.

use library_core::ContentError;

use crate::db::DbError;
use crate::storage::StorageError;

/// Sync errors.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend error: {status} - {message}")]
    Backend { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid record: {0}")]
    Content(#[from] ContentError),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl SyncError {
    /// True for failures talking to the global service.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            SyncError::Network(_) | SyncError::Backend { .. } | SyncError::Parse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
