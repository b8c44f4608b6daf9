//! Assistive technology records with a single optional attachment.

use library_core::records::GlobalAssistiveTechnology;
use library_core::{Family, PruneOutcome, SyncOutcome};

use crate::db::FileOwner;
use crate::error::{Result, SyncError};
use crate::sync::files::FileStage;
use crate::sync::reconciler::{finish_item, hard_prune, Reconcile};
use crate::sync::SyncContext;

pub(crate) struct AssistiveTechnologies;

impl Reconcile for AssistiveTechnologies {
    type Record = GlobalAssistiveTechnology;

    const FAMILY: Family = Family::AssistiveTechnologies;

    fn global_id(record: &GlobalAssistiveTechnology) -> i64 {
        record.id
    }

    async fn upsert(
        &self,
        ctx: &SyncContext<'_>,
        record: &GlobalAssistiveTechnology,
    ) -> Result<SyncOutcome> {
        let mut stage = FileStage::new(Self::FAMILY.file_dir());
        stage.track_owned(ctx.repo, FileOwner::ASSISTIVE_TECHNOLOGY, &[record.id])?;
        let file_id = stage.resolve_one(&ctx.files, record.file_id).await;

        let result = ctx.repo.in_transaction(|repo| {
            let outcome = repo.upsert_assistive_technology(
                record.id,
                &record.code,
                &record.name,
                &record.description,
                file_id,
            )?;
            if let Some(file_id) = file_id {
                repo.claim_file(
                    file_id,
                    FileOwner::new(FileOwner::ASSISTIVE_TECHNOLOGY, record.id),
                )?;
            }
            Ok::<_, SyncError>(outcome)
        });

        finish_item(ctx, stage, result).await
    }

    async fn prune(&self, ctx: &SyncContext<'_>, global_id: i64) -> Result<PruneOutcome> {
        hard_prune(
            ctx,
            Self::FAMILY,
            global_id,
            &[(FileOwner::ASSISTIVE_TECHNOLOGY, vec![global_id])],
        )
        .await
    }
}
