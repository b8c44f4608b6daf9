//! Error types for library-core.

use thiserror::Error;

/// Result type alias using ContentError.
pub type Result<T> = std::result::Result<T, ContentError>;

/// Errors raised while interpreting global records.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("unknown instance role: {0}")]
    UnknownRole(String),

    #[error("unknown entity family: {0}")]
    UnknownFamily(String),
}
