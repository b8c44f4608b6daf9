//! File migration from the global library into local blob storage.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use library_core::{ContentKind, FileDescriptor};
use sha2::{Digest, Sha256};

use crate::db::{NewFile, SqliteRepository};
use crate::error::Result;
use crate::global::GlobalSource;
use crate::storage::{make_key, thumbnail_key, BlobStore};

#[derive(Debug, thiserror::Error)]
#[error("Thumbnail error: {0}")]
pub struct ThumbnailError(pub String);

/// Produces preview images for migrated files.
#[async_trait]
pub trait ThumbnailGenerator: Send + Sync {
    /// Thumbnail bytes (JPEG) for `content`, or `None` when the kind has no preview.
    async fn generate(
        &self,
        kind: ContentKind,
        content: &[u8],
    ) -> std::result::Result<Option<Vec<u8>>, ThumbnailError>;
}

/// Generator that never produces thumbnails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoThumbnails;

#[async_trait]
impl ThumbnailGenerator for NoThumbnails {
    async fn generate(
        &self,
        _kind: ContentKind,
        _content: &[u8],
    ) -> std::result::Result<Option<Vec<u8>>, ThumbnailError> {
        Ok(None)
    }
}

/// Compute SHA-256 hash of file content.
pub fn compute_checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Downloads, stores and deletes files on behalf of synced records.
pub struct FileMigrator<'a> {
    repo: &'a SqliteRepository,
    source: &'a dyn GlobalSource,
    blobs: &'a dyn BlobStore,
    thumbnails: &'a dyn ThumbnailGenerator,
}

impl<'a> FileMigrator<'a> {
    pub fn new(
        repo: &'a SqliteRepository,
        source: &'a dyn GlobalSource,
        blobs: &'a dyn BlobStore,
        thumbnails: &'a dyn ThumbnailGenerator,
    ) -> Self {
        Self {
            repo,
            source,
            blobs,
            thumbnails,
        }
    }

    pub fn source(&self) -> &'a dyn GlobalSource {
        self.source
    }

    /// Copy one remote file into `dir` and return its local id.
    ///
    /// The metadata row is inserted first so the blob key can carry the
    /// local id; it is removed again if the blob cannot be written or
    /// recorded.
    pub async fn store_file(&self, descriptor: &FileDescriptor, dir: &str) -> Result<i64> {
        let content = self.source.download_file(descriptor.id).await?;
        let checksum = compute_checksum(&content);

        let id = self.repo.insert_file(&NewFile {
            filename: &descriptor.file_name,
            content_type: &descriptor.content_type,
            global_file_id: Some(descriptor.id),
            checksum: &checksum,
        })?;

        let key = make_key(dir, id, &descriptor.file_name);
        if let Err(e) = self.blobs.put(&key, &content, &descriptor.content_type).await {
            self.repo.delete_file_row(id)?;
            return Err(e.into());
        }
        if let Err(e) = self.repo.set_file_path(id, &key) {
            if let Err(cleanup) = self.blobs.delete(&key).await {
                tracing::warn!("Failed to remove orphaned blob {}: {}", key, cleanup);
            }
            self.repo.delete_file_row(id)?;
            return Err(e.into());
        }

        match self.thumbnails.generate(descriptor.kind(), &content).await {
            Ok(Some(thumbnail)) => {
                let thumb_key = thumbnail_key(dir, id, &descriptor.file_name);
                match self.blobs.put(&thumb_key, &thumbnail, "image/jpeg").await {
                    Ok(()) => self.repo.set_file_thumbnail(id, &thumb_key)?,
                    Err(e) => tracing::warn!("Failed to store thumbnail for file {}: {}", id, e),
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to generate thumbnail for file {}: {}", id, e),
        }

        tracing::debug!("Stored global file {} as local file {} at {}", descriptor.id, id, key);
        Ok(id)
    }

    /// Remove a file's blobs, then its metadata row. Unknown ids are ignored.
    pub async fn delete_file(&self, id: i64) -> Result<()> {
        let Some(file) = self.repo.get_file(id)? else {
            return Ok(());
        };

        // Thumbnail first: it sits one directory below the original.
        if let Some(thumbnail) = &file.thumbnail {
            self.blobs.delete(thumbnail).await?;
        }
        if !file.path.is_empty() {
            self.blobs.delete(&file.path).await?;
        }
        self.repo.delete_file_row(id)?;

        tracing::debug!("Deleted local file {} ({})", id, file.path);
        Ok(())
    }

    /// Delete every file in `ids`, logging failures. Returns how many went.
    pub async fn delete_files(&self, ids: impl IntoIterator<Item = i64>) -> usize {
        let mut deleted = 0;
        for id in ids {
            match self.delete_file(id).await {
                Ok(()) => deleted += 1,
                Err(e) => tracing::warn!("Failed to delete local file {}: {}", id, e),
            }
        }
        deleted
    }
}

/// File changes for one record version, applied after its rows commit.
///
/// New files are migrated before the record is written; files of the
/// previous version are released only once the new version is stored, and
/// previous files carrying the same global id are reused rather than
/// downloaded again.
#[derive(Debug)]
pub struct FileStage {
    dir: &'static str,
    previous: BTreeSet<i64>,
    reusable: BTreeMap<i64, Vec<i64>>,
    kept: BTreeSet<i64>,
    created: Vec<i64>,
}

impl FileStage {
    pub fn new(dir: &'static str) -> Self {
        Self {
            dir,
            previous: BTreeSet::new(),
            reusable: BTreeMap::new(),
            kept: BTreeSet::new(),
            created: Vec::new(),
        }
    }

    /// Register files owned by the previous version of the record.
    pub fn track_owned(
        &mut self,
        repo: &SqliteRepository,
        kind: &str,
        owner_ids: &[i64],
    ) -> Result<()> {
        for file in repo.files_owned_by(kind, owner_ids)? {
            if let Some(global_id) = file.global_file_id {
                self.reusable.entry(global_id).or_default().push(file.id);
            }
            self.previous.insert(file.id);
        }
        Ok(())
    }

    /// Local ids for a set of global file ids.
    ///
    /// Unknown or failed ids are missing from the result; the record is
    /// synced without them.
    pub async fn resolve(
        &mut self,
        files: &FileMigrator<'_>,
        global_ids: &BTreeSet<i64>,
    ) -> BTreeMap<i64, i64> {
        let mut resolved = BTreeMap::new();
        let mut missing = Vec::new();

        for &global_id in global_ids {
            match self.take_reusable(global_id) {
                Some(local_id) => {
                    self.kept.insert(local_id);
                    resolved.insert(global_id, local_id);
                }
                None => missing.push(global_id),
            }
        }

        if missing.is_empty() {
            return resolved;
        }

        let descriptors = match files.source().lookup_files(&missing).await {
            Ok(descriptors) => descriptors,
            Err(e) => {
                tracing::warn!("File lookup failed for {:?}: {}", missing, e);
                return resolved;
            }
        };

        for descriptor in descriptors {
            if !missing.contains(&descriptor.id) || resolved.contains_key(&descriptor.id) {
                continue;
            }
            match files.store_file(&descriptor, self.dir).await {
                Ok(local_id) => {
                    self.created.push(local_id);
                    resolved.insert(descriptor.id, local_id);
                }
                Err(e) => tracing::warn!("Failed to migrate global file {}: {}", descriptor.id, e),
            }
        }

        resolved
    }

    /// Local id for a single optional global file id.
    pub async fn resolve_one(
        &mut self,
        files: &FileMigrator<'_>,
        global_id: Option<i64>,
    ) -> Option<i64> {
        let global_id = global_id?;
        self.resolve(files, &BTreeSet::from([global_id]))
            .await
            .get(&global_id)
            .copied()
    }

    fn take_reusable(&mut self, global_id: i64) -> Option<i64> {
        let candidates = self.reusable.get_mut(&global_id)?;
        if candidates.is_empty() {
            return None;
        }
        Some(candidates.remove(0))
    }

    /// Files of the previous version that the new version no longer uses.
    pub fn superseded(&self) -> BTreeSet<i64> {
        self.previous.difference(&self.kept).copied().collect()
    }

    pub fn created(&self) -> &[i64] {
        &self.created
    }

    /// The record committed: release superseded files.
    pub async fn commit(self, files: &FileMigrator<'_>) -> usize {
        files.delete_files(self.superseded()).await
    }

    /// The record failed: drop files migrated for it.
    pub async fn abort(self, files: &FileMigrator<'_>) -> usize {
        files.delete_files(self.created).await
    }
}
