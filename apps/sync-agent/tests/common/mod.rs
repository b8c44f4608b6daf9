//! Common test utilities and fixtures for integration tests.
//!
//! This module provides shared test infrastructure including:
//! - FakeGlobal, an in-process stand-in for the global library service
//! - TestContext wiring an engine to an in-memory replica and a temp blob root
//! - Helpers for inspecting the replica after a run

#![allow(dead_code)]

pub mod fixtures;

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use library_core::{Family, FileDescriptor, InstanceRole};
use tempfile::TempDir;

use rehab_library_sync::db::SqliteRepository;
use rehab_library_sync::global::GlobalSource;
use rehab_library_sync::storage::LocalBlobStore;
use rehab_library_sync::{SyncEngine, SyncError};

/// Mutable global library held in memory.
#[derive(Default)]
pub struct FakeGlobal {
    collections: Mutex<HashMap<Family, serde_json::Value>>,
    files: Mutex<HashMap<i64, (FileDescriptor, Vec<u8>)>>,
    failing_families: Mutex<HashSet<Family>>,
    failing_downloads: Mutex<HashSet<i64>>,
    downloads: AtomicUsize,
    fetches: AtomicUsize,
}

impl FakeGlobal {
    pub fn set_collection(&self, family: Family, payload: serde_json::Value) {
        self.collections.lock().unwrap().insert(family, payload);
    }

    pub fn add_file(&self, id: i64, name: &str, content_type: &str, content: &[u8]) {
        let descriptor = FileDescriptor {
            id,
            file_name: name.to_string(),
            content_type: content_type.to_string(),
        };
        self.files
            .lock()
            .unwrap()
            .insert(id, (descriptor, content.to_vec()));
    }

    pub fn add_image(&self, id: i64) {
        let content = format!("png-{}", id);
        self.add_file(id, &format!("image-{}.png", id), "image/png", content.as_bytes());
    }

    pub fn fail_family(&self, family: Family) {
        self.failing_families.lock().unwrap().insert(family);
    }

    pub fn restore_family(&self, family: Family) {
        self.failing_families.lock().unwrap().remove(&family);
    }

    pub fn fail_download(&self, id: i64) {
        self.failing_downloads.lock().unwrap().insert(id);
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GlobalSource for FakeGlobal {
    async fn fetch_collection(&self, family: Family) -> Result<serde_json::Value, SyncError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing_families.lock().unwrap().contains(&family) {
            return Err(SyncError::Network("connection refused".to_string()));
        }
        Ok(self
            .collections
            .lock()
            .unwrap()
            .get(&family)
            .cloned()
            .unwrap_or_else(|| serde_json::json!([])))
    }

    async fn lookup_files(&self, ids: &[i64]) -> Result<Vec<FileDescriptor>, SyncError> {
        let files = self.files.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| files.get(id).map(|(descriptor, _)| descriptor.clone()))
            .collect())
    }

    async fn download_file(&self, id: i64) -> Result<Vec<u8>, SyncError> {
        if self.failing_downloads.lock().unwrap().contains(&id) {
            return Err(SyncError::Backend {
                status: 500,
                message: "storage offline".to_string(),
            });
        }
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.files
            .lock()
            .unwrap()
            .get(&id)
            .map(|(_, content)| content.clone())
            .ok_or_else(|| SyncError::Backend {
                status: 404,
                message: format!("file {} not found", id),
            })
    }
}

/// Test context containing the engine, the fake global library and the blob root.
pub struct TestContext {
    pub engine: SyncEngine,
    pub global: Arc<FakeGlobal>,
    pub blob_root: TempDir,
}

impl TestContext {
    /// Organization replica backed by an in-memory database.
    pub fn new() -> Self {
        Self::with_role(InstanceRole::Organization)
    }

    pub fn with_role(role: InstanceRole) -> Self {
        let blob_root = tempfile::tempdir().expect("Failed to create blob root");
        let global = Arc::new(FakeGlobal::default());
        let repo = SqliteRepository::open_in_memory().expect("Failed to open replica");
        let engine = SyncEngine::new(
            repo,
            global.clone(),
            Arc::new(LocalBlobStore::new(blob_root.path())),
            role,
        );
        Self {
            engine,
            global,
            blob_root,
        }
    }

    pub fn repo(&self) -> &SqliteRepository {
        self.engine.repository()
    }

    pub fn rows(&self, table: &str) -> usize {
        self.repo().count_rows(table).unwrap()
    }

    /// Number of blobs on disk.
    pub fn blob_count(&self) -> usize {
        count_files(self.blob_root.path())
    }

    pub fn blob_exists(&self, key: &str) -> bool {
        self.blob_root.path().join(key).is_file()
    }

    pub fn blob(&self, key: &str) -> Vec<u8> {
        std::fs::read(self.blob_root.path().join(key)).unwrap()
    }
}

fn count_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                count_files(&path)
            } else {
                1
            }
        })
        .sum()
}
