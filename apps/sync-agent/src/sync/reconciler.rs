//! Generic fetch, upsert and prune loop.

use std::collections::BTreeSet;

use library_core::{Family, PruneOutcome, PrunePolicy, SyncOutcome, SyncReport};
use serde::de::DeserializeOwned;

use super::files::FileStage;
use super::SyncContext;
use crate::error::{Result, SyncError};
use crate::global::fetch_records;

/// One entity family's side of a reconciliation pass.
pub(crate) trait Reconcile {
    type Record: DeserializeOwned;

    const FAMILY: Family;

    fn global_id(record: &Self::Record) -> i64;

    /// Load per-pass lookups before the first upsert.
    fn prepare(&mut self, _ctx: &SyncContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Write one fetched record and everything it owns.
    async fn upsert(&self, ctx: &SyncContext<'_>, record: &Self::Record) -> Result<SyncOutcome>;

    /// Handle a local row whose global id was absent from the fetch.
    async fn prune(&self, ctx: &SyncContext<'_>, global_id: i64) -> Result<PruneOutcome>;
}

/// Run one full pass for a family.
///
/// A failed fetch returns before anything is written. Per-record failures
/// are logged and counted; they never stop the pass, and the record's
/// local row is not pruned.
pub(crate) async fn reconcile<R: Reconcile>(
    ctx: &SyncContext<'_>,
    mut family: R,
) -> Result<SyncReport> {
    let records: Vec<R::Record> = fetch_records(ctx.source, R::FAMILY).await?;
    tracing::debug!("Fetched {} {} records", records.len(), R::FAMILY);

    family.prepare(ctx)?;

    let mut report = SyncReport::new(R::FAMILY);
    let mut fetched = BTreeSet::new();

    for record in &records {
        let global_id = R::global_id(record);
        fetched.insert(global_id);
        match family.upsert(ctx, record).await {
            Ok(outcome) => report.record(outcome),
            Err(e) => {
                tracing::warn!("Failed to sync {} {}: {}", R::FAMILY, global_id, e);
                report.record_failure();
            }
        }
    }

    let stale: Vec<i64> = ctx
        .repo
        .global_ids(R::FAMILY)?
        .difference(&fetched)
        .copied()
        .collect();

    for global_id in stale {
        match family.prune(ctx, global_id).await {
            Ok(outcome) => report.record_prune(outcome),
            Err(e) => {
                tracing::warn!("Failed to prune {} {}: {}", R::FAMILY, global_id, e);
                report.record_failure();
            }
        }
    }

    Ok(report)
}

/// Settle an item's staged files against the outcome of its row writes.
pub(crate) async fn finish_item<T>(
    ctx: &SyncContext<'_>,
    stage: FileStage,
    result: Result<T>,
) -> Result<T> {
    match result {
        Ok(value) => {
            stage.commit(&ctx.files).await;
            Ok(value)
        }
        Err(e) => {
            stage.abort(&ctx.files).await;
            Err(e)
        }
    }
}

/// Delete a mirrored row after removing the files it owns.
///
/// `owned` lists `(owner kind, owner ids)` pairs whose files go with the row.
/// A file that cannot be deleted keeps the row for the next run.
pub(crate) async fn hard_prune(
    ctx: &SyncContext<'_>,
    family: Family,
    global_id: i64,
    owned: &[(&str, Vec<i64>)],
) -> Result<PruneOutcome> {
    debug_assert_eq!(family.prune_policy(), PrunePolicy::HardPrune);

    for (kind, owner_ids) in owned {
        for file in ctx.repo.files_owned_by(kind, owner_ids)? {
            ctx.files.delete_file(file.id).await?;
        }
    }

    if !ctx.repo.delete_mirrored(family.table(), global_id)? {
        return Err(SyncError::InvalidData(format!(
            "{} {} vanished before prune",
            family, global_id
        )));
    }
    tracing::debug!("Deleted {} {}", family, global_id);
    Ok(PruneOutcome::Deleted)
}

/// Mark a synced row deleted; it stays in place with its files and links.
pub(crate) fn soft_prune(
    ctx: &SyncContext<'_>,
    family: Family,
    global_id: i64,
) -> Result<PruneOutcome> {
    debug_assert_eq!(family.prune_policy(), PrunePolicy::SoftMirror);

    let now = chrono::Utc::now().to_rfc3339();
    if ctx.repo.soft_delete_synced(family.table(), global_id, &now)? {
        tracing::debug!("Soft-deleted {} {}", family, global_id);
        Ok(PruneOutcome::SoftDeleted)
    } else {
        Ok(PruneOutcome::Unchanged)
    }
}
