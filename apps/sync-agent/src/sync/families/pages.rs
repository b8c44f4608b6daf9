//! FAQ and tutorial pages, whose rich text embeds file references.

use library_core::records::{GlobalFaq, GlobalTutorial};
use library_core::{Family, PruneOutcome, SyncOutcome};

use crate::db::FileOwner;
use crate::error::{Result, SyncError};
use crate::sync::files::FileStage;
use crate::sync::reconciler::{finish_item, hard_prune, Reconcile};
use crate::sync::rewriter::{rewrite_content, Rewritten};
use crate::sync::SyncContext;

/// Migrate the files of a page's content and stage the old version's files.
async fn stage_content(
    ctx: &SyncContext<'_>,
    family: Family,
    owner_kind: &'static str,
    id: i64,
    content: &library_core::LocalizedText,
) -> Result<(FileStage, Rewritten)> {
    let mut stage = FileStage::new(family.file_dir());
    stage.track_owned(ctx.repo, owner_kind, &[id])?;
    let rewritten = rewrite_content(&mut stage, &ctx.files, content).await;
    Ok((stage, rewritten))
}

fn claim_all(ctx: &SyncContext<'_>, rewritten: &Rewritten, owner: FileOwner) -> Result<()> {
    for file_id in rewritten.local_files() {
        ctx.repo.claim_file(file_id, owner)?;
    }
    Ok(())
}

pub(crate) struct Faqs;

impl Reconcile for Faqs {
    type Record = GlobalFaq;

    const FAMILY: Family = Family::Faqs;

    fn global_id(record: &GlobalFaq) -> i64 {
        record.id
    }

    async fn upsert(&self, ctx: &SyncContext<'_>, record: &GlobalFaq) -> Result<SyncOutcome> {
        let (stage, rewritten) =
            stage_content(ctx, Self::FAMILY, FileOwner::FAQ, record.id, &record.content).await?;

        let result = ctx.repo.in_transaction(|repo| {
            let outcome =
                repo.upsert_faq(record.id, &record.title, &rewritten.content, record.order)?;
            claim_all(ctx, &rewritten, FileOwner::new(FileOwner::FAQ, record.id))?;
            Ok::<_, SyncError>(outcome)
        });

        finish_item(ctx, stage, result).await
    }

    async fn prune(&self, ctx: &SyncContext<'_>, global_id: i64) -> Result<PruneOutcome> {
        hard_prune(ctx, Self::FAMILY, global_id, &[(FileOwner::FAQ, vec![global_id])]).await
    }
}

pub(crate) struct Tutorials;

impl Reconcile for Tutorials {
    type Record = GlobalTutorial;

    const FAMILY: Family = Family::Tutorials;

    fn global_id(record: &GlobalTutorial) -> i64 {
        record.id
    }

    async fn upsert(&self, ctx: &SyncContext<'_>, record: &GlobalTutorial) -> Result<SyncOutcome> {
        let (stage, rewritten) = stage_content(
            ctx,
            Self::FAMILY,
            FileOwner::TUTORIAL,
            record.id,
            &record.content,
        )
        .await?;

        let result = ctx.repo.in_transaction(|repo| {
            let outcome =
                repo.upsert_tutorial(
                    record.id,
                    &record.title,
                    &rewritten.content,
                    &record.platform,
                )?;
            claim_all(ctx, &rewritten, FileOwner::new(FileOwner::TUTORIAL, record.id))?;
            Ok::<_, SyncError>(outcome)
        });

        finish_item(ctx, stage, result).await
    }

    async fn prune(&self, ctx: &SyncContext<'_>, global_id: i64) -> Result<PruneOutcome> {
        hard_prune(ctx, Self::FAMILY, global_id, &[(FileOwner::TUTORIAL, vec![global_id])]).await
    }
}
