//! Rich-text file reference rewriting.

use std::collections::BTreeMap;

use library_core::{extract_file_ids, rewrite_file_ids, LocalizedText};

use super::files::{FileMigrator, FileStage};

/// Rich text with its embedded files migrated.
#[derive(Debug, Clone, PartialEq)]
pub struct Rewritten {
    pub content: LocalizedText,
    /// Global -> local ids used by `content`.
    pub mapping: BTreeMap<i64, i64>,
}

impl Rewritten {
    pub fn local_files(&self) -> impl Iterator<Item = i64> + '_ {
        self.mapping.values().copied()
    }
}

/// Migrate every file referenced by `content` and point the references at
/// the local copies.
///
/// Ids are collected across all languages first, so a file shared by
/// several translations is migrated once. References that cannot be
/// resolved are left untouched.
pub async fn rewrite_content(
    stage: &mut FileStage,
    files: &FileMigrator<'_>,
    content: &LocalizedText,
) -> Rewritten {
    let referenced = extract_file_ids(content);
    if referenced.is_empty() {
        return Rewritten {
            content: content.clone(),
            mapping: BTreeMap::new(),
        };
    }

    let mapping = stage.resolve(files, &referenced).await;
    let unmapped: Vec<i64> = referenced
        .iter()
        .filter(|id| !mapping.contains_key(*id))
        .copied()
        .collect();
    if !unmapped.is_empty() {
        tracing::warn!("Unresolved file references left in content: {:?}", unmapped);
    }

    Rewritten {
        content: rewrite_file_ids(content, &mapping),
        mapping,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteRepository;
    use crate::storage::LocalBlobStore;
    use crate::sync::files::NoThumbnails;
    use crate::testing::StaticSource;
    use pretty_assertions::assert_eq;

    fn text(pairs: &[(&str, &str)]) -> LocalizedText {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_rewrites_every_language_once() {
        let dir = tempfile::tempdir().unwrap();
        let repo = SqliteRepository::open_in_memory().unwrap();
        let blobs = LocalBlobStore::new(dir.path());
        let source = StaticSource::new().with_file(55, "knee.png", "image/png", b"png");
        let files = FileMigrator::new(&repo, &source, &blobs, &NoThumbnails);

        let content = text(&[
            ("en", "<img src=/file/55>"),
            ("km", "<p><img src=/file/55></p>"),
        ]);
        let mut stage = FileStage::new("faq");
        let rewritten = rewrite_content(&mut stage, &files, &content).await;

        let local = rewritten.mapping[&55];
        assert_eq!(repo.count_rows("files").unwrap(), 1);
        assert_eq!(rewritten.content["en"], format!("<img src=/file/{}>", local));
        assert_eq!(rewritten.content["km"], format!("<p><img src=/file/{}></p>", local));
    }

    #[tokio::test]
    async fn test_unmapped_reference_left_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let repo = SqliteRepository::open_in_memory().unwrap();
        let blobs = LocalBlobStore::new(dir.path());
        let source = StaticSource::new();
        let files = FileMigrator::new(&repo, &source, &blobs, &NoThumbnails);

        let content = text(&[("en", "<a href=/file/77>doc</a>")]);
        let mut stage = FileStage::new("faq");
        let rewritten = rewrite_content(&mut stage, &files, &content).await;

        assert_eq!(rewritten.content, content);
        assert!(rewritten.mapping.is_empty());
    }

    #[tokio::test]
    async fn test_plain_text_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let repo = SqliteRepository::open_in_memory().unwrap();
        let blobs = LocalBlobStore::new(dir.path());
        let source = StaticSource::new();
        let files = FileMigrator::new(&repo, &source, &blobs, &NoThumbnails);

        let content = text(&[("en", "No attachments here")]);
        let mut stage = FileStage::new("faq");
        let rewritten = rewrite_content(&mut stage, &files, &content).await;
        assert_eq!(rewritten.content, content);
        assert_eq!(rewritten.local_files().count(), 0);
    }
}
