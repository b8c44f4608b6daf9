//! In-process global source for unit tests.

use std::collections::HashMap;

use async_trait::async_trait;
use library_core::{Family, FileDescriptor};

use crate::error::{Result, SyncError};
use crate::global::GlobalSource;

#[derive(Default)]
pub struct StaticSource {
    collections: HashMap<Family, serde_json::Value>,
    files: HashMap<i64, (FileDescriptor, Vec<u8>)>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collection(mut self, family: Family, payload: serde_json::Value) -> Self {
        self.collections.insert(family, payload);
        self
    }

    pub fn with_file(mut self, id: i64, name: &str, content_type: &str, content: &[u8]) -> Self {
        let descriptor = FileDescriptor {
            id,
            file_name: name.to_string(),
            content_type: content_type.to_string(),
        };
        self.files.insert(id, (descriptor, content.to_vec()));
        self
    }

    pub fn descriptor(&self, id: i64) -> FileDescriptor {
        self.files[&id].0.clone()
    }
}

#[async_trait]
impl GlobalSource for StaticSource {
    async fn fetch_collection(&self, family: Family) -> Result<serde_json::Value> {
        self.collections
            .get(&family)
            .cloned()
            .ok_or_else(|| SyncError::Backend {
                status: 404,
                message: format!("no {} collection", family),
            })
    }

    async fn lookup_files(&self, ids: &[i64]) -> Result<Vec<FileDescriptor>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.files.get(id).map(|(d, _)| d.clone()))
            .collect())
    }

    async fn download_file(&self, id: i64) -> Result<Vec<u8>> {
        self.files
            .get(&id)
            .map(|(_, content)| content.clone())
            .ok_or_else(|| SyncError::Backend {
                status: 404,
                message: format!("file {} not found", id),
            })
    }
}
