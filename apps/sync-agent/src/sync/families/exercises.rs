//! Exercises: foreign-linked rows with ordered attachments and categories.

use std::collections::BTreeSet;

use library_core::records::GlobalExercise;
use library_core::{Family, GlobalIndex, PruneOutcome, SyncOutcome};

use super::{load_category_index, Timestamps};
use crate::db::{ExerciseRow, FileOwner};
use crate::error::{Result, SyncError};
use crate::sync::associations::sync_links;
use crate::sync::files::FileStage;
use crate::sync::reconciler::{finish_item, soft_prune, Reconcile};
use crate::sync::SyncContext;

#[derive(Default)]
pub(crate) struct Exercises {
    categories: GlobalIndex,
}

impl Reconcile for Exercises {
    type Record = GlobalExercise;

    const FAMILY: Family = Family::Exercises;

    fn global_id(record: &GlobalExercise) -> i64 {
        record.id
    }

    fn prepare(&mut self, ctx: &SyncContext<'_>) -> Result<()> {
        self.categories = load_category_index(ctx)?;
        Ok(())
    }

    async fn upsert(&self, ctx: &SyncContext<'_>, record: &GlobalExercise) -> Result<SyncOutcome> {
        let timestamps = Timestamps::parse(
            record.created_at.as_deref(),
            record.updated_at.as_deref(),
            record.deleted_at.as_deref(),
        )?;

        let mut stage = FileStage::new(Self::FAMILY.file_dir());
        if let Some(key) = ctx.repo.resolve_key(Self::FAMILY, record.id)? {
            stage.track_owned(ctx.repo, FileOwner::EXERCISE, &[key.local_id()])?;
        }
        let wanted: BTreeSet<i64> = record.files.iter().copied().collect();
        let mapping = stage.resolve(&ctx.files, &wanted).await;
        let attachments: Vec<i64> = record
            .files
            .iter()
            .filter_map(|global_id| mapping.get(global_id).copied())
            .collect();

        let row = ExerciseRow {
            title: &record.title,
            sets: record.sets_or_default(),
            reps: record.reps_or_default(),
            include_feedback: record.include_feedback,
            get_pain_level: record.get_pain_level,
            additional_fields: &record.additional_fields,
            auto_translated: &record.auto_translated,
            created_at: timestamps.created_at,
            updated_at: timestamps.updated_at,
            deleted_at: timestamps.deleted_at,
        };

        let result = ctx.repo.in_transaction(|repo| {
            let (key, outcome) = repo.upsert_synced_exercise(record.id, &row)?;
            repo.replace_exercise_files(key.local_id(), &attachments)?;
            for file_id in &attachments {
                repo.claim_file(*file_id, FileOwner::new(FileOwner::EXERCISE, key.local_id()))?;
            }
            sync_links(repo, Self::FAMILY, key.local_id(), &record.categories, &self.categories)?;
            Ok::<_, SyncError>(outcome)
        });

        finish_item(ctx, stage, result).await
    }

    async fn prune(&self, ctx: &SyncContext<'_>, global_id: i64) -> Result<PruneOutcome> {
        soft_prune(ctx, Self::FAMILY, global_id)
    }
}
