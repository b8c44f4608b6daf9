//! Screening questionnaires: the full section tree, mirrored at every level.
//!
//! Levels are written top-down so each child row points at its freshly
//! written parent. Nodes missing from the payload are pruned even when
//! their parent survives.

use std::collections::BTreeMap;

use library_core::records::GlobalScreeningQuestionnaire;
use library_core::{Family, PruneOutcome, SyncOutcome};

use crate::db::{FileOwner, ScreeningSubtree};
use crate::error::{Result, SyncError};
use crate::sync::files::FileStage;
use crate::sync::reconciler::{finish_item, hard_prune, Reconcile};
use crate::sync::rewriter::rewrite_content;
use crate::sync::SyncContext;

pub(crate) struct ScreeningQuestionnaires;

/// Every `(owner kind, owner ids)` holding files for one stored questionnaire.
fn file_owners(questionnaire_id: i64, subtree: &ScreeningSubtree) -> Vec<(&'static str, Vec<i64>)> {
    vec![
        (FileOwner::SCREENING_QUESTIONNAIRE, vec![questionnaire_id]),
        (
            FileOwner::SCREENING_QUESTION,
            subtree.questions.iter().copied().collect(),
        ),
        (
            FileOwner::SCREENING_OPTION,
            subtree.options.iter().copied().collect(),
        ),
    ]
}

impl Reconcile for ScreeningQuestionnaires {
    type Record = GlobalScreeningQuestionnaire;

    const FAMILY: Family = Family::ScreeningQuestionnaires;

    fn global_id(record: &GlobalScreeningQuestionnaire) -> i64 {
        record.id
    }

    async fn upsert(
        &self,
        ctx: &SyncContext<'_>,
        record: &GlobalScreeningQuestionnaire,
    ) -> Result<SyncOutcome> {
        let keep = ScreeningSubtree::from_record(record);

        // Nodes moving in from another questionnaire bring their files along.
        let mut stage = FileStage::new(Self::FAMILY.file_dir());
        let existing = ctx.repo.screening_subtree(record.id)?;
        for (kind, owner_ids) in file_owners(record.id, &existing.union(&keep)) {
            stage.track_owned(ctx.repo, kind, &owner_ids)?;
        }

        let description = rewrite_content(&mut stage, &ctx.files, &record.description).await;

        let mut question_files = BTreeMap::new();
        let mut option_files = BTreeMap::new();
        for question in record.sections.iter().flat_map(|s| &s.questions) {
            if let Some(local) = stage.resolve_one(&ctx.files, question.file_id).await {
                question_files.insert(question.id, local);
            }
            for option in &question.options {
                if let Some(local) = stage.resolve_one(&ctx.files, option.file_id).await {
                    option_files.insert(option.id, local);
                }
            }
        }

        let result = ctx.repo.in_transaction(|repo| {
            let outcome = repo.upsert_screening_questionnaire(
                record.id,
                &record.title,
                &description.content,
            )?;
            for file_id in description.local_files() {
                repo.claim_file(
                    file_id,
                    FileOwner::new(FileOwner::SCREENING_QUESTIONNAIRE, record.id),
                )?;
            }

            for section in &record.sections {
                repo.upsert_screening_section(record.id, section)?;

                for question in &section.questions {
                    let file_id = question_files.get(&question.id).copied();
                    repo.upsert_screening_question(section.id, question, file_id)?;
                    if let Some(file_id) = file_id {
                        repo.claim_file(
                            file_id,
                            FileOwner::new(FileOwner::SCREENING_QUESTION, question.id),
                        )?;
                    }

                    for option in &question.options {
                        let file_id = option_files.get(&option.id).copied();
                        repo.upsert_screening_option(question.id, option, file_id)?;
                        if let Some(file_id) = file_id {
                            repo.claim_file(
                                file_id,
                                FileOwner::new(FileOwner::SCREENING_OPTION, option.id),
                            )?;
                        }
                    }

                    for logic in &question.logics {
                        repo.upsert_screening_logic(question.id, logic)?;
                    }
                }
            }

            let removed = repo.prune_screening_subtree(record.id, &keep)?;
            if removed > 0 {
                tracing::debug!(
                    "Pruned {} stale nodes from screening questionnaire {}",
                    removed,
                    record.id
                );
            }
            Ok::<_, SyncError>(outcome)
        });

        finish_item(ctx, stage, result).await
    }

    async fn prune(&self, ctx: &SyncContext<'_>, global_id: i64) -> Result<PruneOutcome> {
        let subtree = ctx.repo.screening_subtree(global_id)?;
        hard_prune(ctx, Self::FAMILY, global_id, &file_owners(global_id, &subtree)).await
    }
}
