//! Blob storage for migrated files.
//!
//! File metadata lives in the replica database; the bytes live behind a
//! [`BlobStore`], either on local disk or in an S3-compatible bucket.

mod local;
mod s3;

pub use local::LocalBlobStore;
pub use s3::S3BlobStore;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("S3 error: {0}")]
    S3(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Key/value byte storage addressed by relative paths.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under `key`, replacing anything already there.
    async fn put(&self, key: &str, content: &[u8], content_type: &str) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Remove `key`. Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}

/// Generate the blob key for a migrated file.
///
/// Format: `{dir}/{file_id}/{file_name}`. The local file id keeps keys
/// unique even when two records ship files with the same name.
pub fn make_key(dir: &str, file_id: i64, file_name: &str) -> String {
    format!("{}/{}/{}", dir.trim_matches('/'), file_id, sanitize_file_name(file_name))
}

/// Generate the blob key for a migrated file's thumbnail.
///
/// Format: `{dir}/{file_id}/thumbnails/{file_name}.jpg`. The extra segment
/// keeps it apart from the original, which is always `{dir}/{file_id}/{name}`.
pub fn thumbnail_key(dir: &str, file_id: i64, file_name: &str) -> String {
    format!(
        "{}/{}/thumbnails/{}.jpg",
        dir.trim_matches('/'),
        file_id,
        sanitize_file_name(file_name)
    )
}

/// Reduce a file name to a single safe path segment.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}
