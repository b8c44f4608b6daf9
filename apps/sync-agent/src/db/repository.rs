//! Repository for the local replica store.
//!
//! Family-specific row writers live in [`super::library`] and
//! [`super::screening`]; this module holds the connection, transactions,
//! file metadata, identity lookups, category links and the run journal.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::Utc;
use library_core::{Family, GlobalIndex, IdentityStrategy, LinkPlan, SyncKey, SyncReport};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::db::error::DbError;

pub(crate) type Result<T> = std::result::Result<T, DbError>;

/// Entity that exclusively owns a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileOwner {
    pub kind: &'static str,
    pub id: i64,
}

impl FileOwner {
    pub const EXERCISE: &'static str = "exercise";
    pub const EDUCATION_MATERIAL: &'static str = "education_material";
    pub const QUESTIONNAIRE_QUESTION: &'static str = "questionnaire_question";
    pub const SCREENING_QUESTIONNAIRE: &'static str = "screening_questionnaire";
    pub const SCREENING_QUESTION: &'static str = "screening_question";
    pub const SCREENING_OPTION: &'static str = "screening_option";
    pub const ASSISTIVE_TECHNOLOGY: &'static str = "assistive_technology";
    pub const FAQ: &'static str = "faq";
    pub const TUTORIAL: &'static str = "tutorial";

    pub fn new(kind: &'static str, id: i64) -> Self {
        Self { kind, id }
    }
}

/// File metadata row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub id: i64,
    pub filename: String,
    pub path: String,
    pub content_type: String,
    pub thumbnail: Option<String>,
    pub global_file_id: Option<i64>,
    pub checksum: Option<String>,
    pub owner_kind: Option<String>,
    pub owner_id: Option<i64>,
}

/// File metadata to insert before the blob is written.
#[derive(Debug, Clone)]
pub struct NewFile<'a> {
    pub filename: &'a str,
    pub content_type: &'a str,
    pub global_file_id: Option<i64>,
    pub checksum: &'a str,
}

/// Journal entry for one family run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SyncRun {
    pub run_id: String,
    pub family: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: String,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub failed: usize,
    pub error: Option<String>,
}

/// SQLite implementation of the replica store.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Open database at path, creating if necessary.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    /// Open in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let repo = Self { conn };
        repo.initialize()?;
        Ok(repo)
    }

    fn initialize(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(super::schema::SCHEMA)?;
        self.conn.execute_batch(super::schema::INIT_SCHEMA_VERSION)?;
        Ok(())
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside one transaction; any error rolls every write back.
    pub fn in_transaction<T, E>(
        &self,
        f: impl FnOnce(&Self) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<DbError>,
    {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| E::from(DbError::from(e)))?;
        let value = f(self)?;
        tx.commit().map_err(|e| E::from(DbError::from(e)))?;
        Ok(value)
    }

    pub fn count_rows(&self, table: &str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(count as usize)
    }

    // === Files ===

    pub fn insert_file(&self, file: &NewFile<'_>) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO files (filename, content_type, global_file_id, checksum, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                file.filename,
                file.content_type,
                file.global_file_id,
                file.checksum,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn set_file_path(&self, id: i64, path: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("UPDATE files SET path = ?1 WHERE id = ?2", params![path, id])?;
        if changed == 0 {
            return Err(DbError::FileNotFound(id));
        }
        Ok(())
    }

    pub fn set_file_thumbnail(&self, id: i64, thumbnail: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE files SET thumbnail = ?1 WHERE id = ?2",
            params![thumbnail, id],
        )?;
        Ok(())
    }

    /// Hand a file to its owner. A file has at most one owner at a time.
    pub fn claim_file(&self, file_id: i64, owner: FileOwner) -> Result<()> {
        self.conn.execute(
            "UPDATE files SET owner_kind = ?1, owner_id = ?2 WHERE id = ?3",
            params![owner.kind, owner.id, file_id],
        )?;
        Ok(())
    }

    pub fn get_file(&self, id: i64) -> Result<Option<LocalFile>> {
        self.conn
            .query_row(
                "SELECT id, filename, path, content_type, thumbnail, global_file_id, checksum,
                 owner_kind, owner_id
                 FROM files WHERE id = ?1",
                params![id],
                Self::row_to_file,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn all_files(&self) -> Result<Vec<LocalFile>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, filename, path, content_type, thumbnail, global_file_id, checksum,
             owner_kind, owner_id
             FROM files ORDER BY id",
        )?;
        let files = stmt
            .query_map([], Self::row_to_file)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(files)
    }

    /// Files currently owned by any of `owner_ids` of the given kind.
    pub fn files_owned_by(&self, kind: &str, owner_ids: &[i64]) -> Result<Vec<LocalFile>> {
        if owner_ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; owner_ids.len()].join(", ");
        let sql = format!(
            "SELECT id, filename, path, content_type, thumbnail, global_file_id, checksum,
             owner_kind, owner_id
             FROM files WHERE owner_kind = ? AND owner_id IN ({}) ORDER BY id",
            placeholders
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut values: Vec<rusqlite::types::Value> = vec![kind.to_string().into()];
        values.extend(owner_ids.iter().map(|id| rusqlite::types::Value::from(*id)));
        let files = stmt
            .query_map(params_from_iter(values), Self::row_to_file)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(files)
    }

    pub fn delete_file_row(&self, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM files WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn row_to_file(row: &rusqlite::Row) -> rusqlite::Result<LocalFile> {
        Ok(LocalFile {
            id: row.get(0)?,
            filename: row.get(1)?,
            path: row.get(2)?,
            content_type: row.get(3)?,
            thumbnail: row.get(4)?,
            global_file_id: row.get(5)?,
            checksum: row.get(6)?,
            owner_kind: row.get(7)?,
            owner_id: row.get(8)?,
        })
    }

    // === Identity ===

    /// Local ids of a mirrored table.
    pub fn mirrored_ids(&self, table: &str) -> Result<BTreeSet<i64>> {
        let mut stmt = self.conn.prepare(&format!("SELECT id FROM {}", table))?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<BTreeSet<i64>, _>>()?;
        Ok(ids)
    }

    pub fn mirrored_exists(&self, table: &str, id: i64) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                &format!("SELECT 1 FROM {} WHERE id = ?1", table),
                params![id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn delete_mirrored(&self, table: &str, id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute(&format!("DELETE FROM {} WHERE id = ?1", table), params![id])?;
        Ok(changed > 0)
    }

    /// Local id of the synced row for a global id, if any.
    pub fn find_synced(&self, table: &str, global_ref: i64) -> Result<Option<i64>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT id FROM {} WHERE global_ref = ?1 AND is_global = 1",
                    table
                ),
                params![global_ref],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Global ids of every synced row in a foreign-linked table.
    pub fn synced_refs(&self, table: &str) -> Result<BTreeSet<i64>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT global_ref FROM {} WHERE is_global = 1 AND global_ref IS NOT NULL",
            table
        ))?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<BTreeSet<i64>, _>>()?;
        Ok(ids)
    }

    /// Global ids present locally for a family, whatever its identity strategy.
    pub fn global_ids(&self, family: Family) -> Result<BTreeSet<i64>> {
        match family.identity() {
            IdentityStrategy::Mirrored => self.mirrored_ids(family.table()),
            IdentityStrategy::ForeignLinked => self.synced_refs(family.table()),
        }
    }

    /// Current key for a global record, if it has been synced before.
    pub fn resolve_key(&self, family: Family, global_id: i64) -> Result<Option<SyncKey>> {
        match family.identity() {
            IdentityStrategy::Mirrored => Ok(self
                .mirrored_exists(family.table(), global_id)?
                .then_some(SyncKey::Mirrored(global_id))),
            IdentityStrategy::ForeignLinked => Ok(self
                .find_synced(family.table(), global_id)?
                .map(|local_id| SyncKey::ForeignLinked {
                    local_id,
                    global_id,
                })),
        }
    }

    /// Global -> local index for a family, loaded in one query.
    pub fn global_index(&self, family: Family) -> Result<GlobalIndex> {
        match family.identity() {
            IdentityStrategy::Mirrored => {
                Ok(GlobalIndex::mirrored(self.mirrored_ids(family.table())?))
            }
            IdentityStrategy::ForeignLinked => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT global_ref, id FROM {} WHERE is_global = 1 AND global_ref IS NOT NULL",
                    family.table()
                ))?;
                let pairs = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<std::result::Result<Vec<(i64, i64)>, _>>()?;
                Ok(GlobalIndex::from_pairs(pairs))
            }
        }
    }

    /// Mark a synced row deleted; returns false when it already was.
    pub fn soft_delete_synced(
        &self,
        table: &str,
        global_ref: i64,
        deleted_at: &str,
    ) -> Result<bool> {
        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET deleted_at = ?1
                 WHERE global_ref = ?2 AND is_global = 1 AND deleted_at IS NULL",
                table
            ),
            params![deleted_at, global_ref],
        )?;
        Ok(changed > 0)
    }

    pub fn deleted_at(&self, table: &str, local_id: i64) -> Result<Option<String>> {
        self.conn
            .query_row(
                &format!("SELECT deleted_at FROM {} WHERE id = ?1", table),
                params![local_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    // === Category links ===

    pub fn category_links(&self, content_type: &str, content_id: i64) -> Result<BTreeSet<i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT category_id FROM content_categories
             WHERE content_type = ?1 AND content_id = ?2",
        )?;
        let ids = stmt
            .query_map(params![content_type, content_id], |row| row.get(0))?
            .collect::<std::result::Result<BTreeSet<i64>, _>>()?;
        Ok(ids)
    }

    pub fn apply_link_plan(
        &self,
        content_type: &str,
        content_id: i64,
        plan: &LinkPlan,
    ) -> Result<()> {
        for category_id in &plan.remove {
            self.conn.execute(
                "DELETE FROM content_categories
                 WHERE content_type = ?1 AND content_id = ?2 AND category_id = ?3",
                params![content_type, content_id, category_id],
            )?;
        }
        for category_id in &plan.add {
            self.conn.execute(
                "INSERT OR IGNORE INTO content_categories (content_type, content_id, category_id)
                 VALUES (?1, ?2, ?3)",
                params![content_type, content_id, category_id],
            )?;
        }
        Ok(())
    }

    // === Run journal ===

    pub fn start_run(&self, run_id: &str, family: Family) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO sync_runs (run_id, family, started_at) VALUES (?1, ?2, ?3)",
            params![run_id, family.as_str(), Utc::now().to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn finish_run(&self, id: i64, report: &SyncReport) -> Result<()> {
        let status = if report.skipped { "skipped" } else { "completed" };
        self.conn.execute(
            "UPDATE sync_runs SET finished_at = ?1, status = ?2, created = ?3, updated = ?4,
                    deleted = ?5, failed = ?6
             WHERE id = ?7",
            params![
                Utc::now().to_rfc3339(),
                status,
                report.created as i64,
                report.updated as i64,
                report.deleted as i64,
                report.failed as i64,
                id
            ],
        )?;
        Ok(())
    }

    pub fn fail_run(&self, id: i64, error: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE sync_runs SET finished_at = ?1, status = 'failed', error = ?2 WHERE id = ?3",
            params![Utc::now().to_rfc3339(), error, id],
        )?;
        Ok(())
    }

    /// Most recent runs for a family, newest first.
    pub fn recent_runs(&self, family: Family, limit: usize) -> Result<Vec<SyncRun>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, family, started_at, finished_at, status, created, updated, deleted,
             failed, error
             FROM sync_runs WHERE family = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let runs = stmt
            .query_map(params![family.as_str(), limit as i64], |row| {
                Ok(SyncRun {
                    run_id: row.get(0)?,
                    family: row.get(1)?,
                    started_at: row.get(2)?,
                    finished_at: row.get(3)?,
                    status: row.get(4)?,
                    created: row.get::<_, i64>(5)? as usize,
                    updated: row.get::<_, i64>(6)? as usize,
                    deleted: row.get::<_, i64>(7)? as usize,
                    failed: row.get::<_, i64>(8)? as usize,
                    error: row.get(9)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn new_file<'a>(name: &'a str, global: Option<i64>) -> NewFile<'a> {
        NewFile {
            filename: name,
            content_type: "image/png",
            global_file_id: global,
            checksum: "abc",
        }
    }

    #[test]
    fn test_file_lifecycle() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let id = repo.insert_file(&new_file("a.png", Some(55))).unwrap();
        repo.set_file_path(id, "faq/1/a.png").unwrap();
        repo.claim_file(id, FileOwner::new(FileOwner::FAQ, 3)).unwrap();

        let file = repo.get_file(id).unwrap().unwrap();
        assert_eq!(file.path, "faq/1/a.png");
        assert_eq!(file.global_file_id, Some(55));
        assert_eq!(file.owner_kind.as_deref(), Some("faq"));

        let owned = repo.files_owned_by(FileOwner::FAQ, &[3, 4]).unwrap();
        assert_eq!(owned.len(), 1);

        assert!(repo.delete_file_row(id).unwrap());
        assert!(!repo.delete_file_row(id).unwrap());
        assert!(repo.get_file(id).unwrap().is_none());
    }

    #[test]
    fn test_file_ids_are_not_reused() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let first = repo.insert_file(&new_file("a.png", None)).unwrap();
        repo.delete_file_row(first).unwrap();
        let second = repo.insert_file(&new_file("b.png", None)).unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_set_path_on_missing_file_errors() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        assert!(matches!(
            repo.set_file_path(99, "x"),
            Err(DbError::FileNotFound(99))
        ));
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let result: std::result::Result<(), DbError> = repo.in_transaction(|repo| {
            repo.insert_file(&new_file("a.png", None))?;
            Err(DbError::InvalidData("boom".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(repo.count_rows("files").unwrap(), 0);
    }

    #[test]
    fn test_run_journal() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        let id = repo.start_run("run-1", Family::Faqs).unwrap();
        let mut report = SyncReport::new(Family::Faqs);
        report.created = 2;
        repo.finish_run(id, &report).unwrap();

        let failed = repo.start_run("run-2", Family::Faqs).unwrap();
        repo.fail_run(failed, "network down").unwrap();

        let runs = repo.recent_runs(Family::Faqs, 10).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].status, "failed");
        assert_eq!(runs[0].error.as_deref(), Some("network down"));
        assert_eq!(runs[1].status, "completed");
        assert_eq!(runs[1].created, 2);
    }
}
