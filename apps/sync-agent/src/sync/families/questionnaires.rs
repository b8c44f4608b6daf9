//! Library questionnaires: questionnaire -> question -> answer.
//!
//! The questionnaire is foreign-linked, so questions and answers are keyed
//! by their parent's local id plus their own global id.

use std::collections::{BTreeMap, BTreeSet};

use library_core::records::GlobalQuestionnaire;
use library_core::{Family, GlobalIndex, PruneOutcome, SyncOutcome};

use super::{load_category_index, Timestamps};
use crate::db::{AnswerRow, FileOwner, QuestionRow, QuestionnaireRow};
use crate::error::{Result, SyncError};
use crate::sync::associations::sync_links;
use crate::sync::files::FileStage;
use crate::sync::reconciler::{finish_item, soft_prune, Reconcile};
use crate::sync::SyncContext;

#[derive(Default)]
pub(crate) struct Questionnaires {
    categories: GlobalIndex,
}

impl Reconcile for Questionnaires {
    type Record = GlobalQuestionnaire;

    const FAMILY: Family = Family::Questionnaires;

    fn global_id(record: &GlobalQuestionnaire) -> i64 {
        record.id
    }

    fn prepare(&mut self, ctx: &SyncContext<'_>) -> Result<()> {
        self.categories = load_category_index(ctx)?;
        Ok(())
    }

    async fn upsert(
        &self,
        ctx: &SyncContext<'_>,
        record: &GlobalQuestionnaire,
    ) -> Result<SyncOutcome> {
        let timestamps = Timestamps::parse(
            record.created_at.as_deref(),
            record.updated_at.as_deref(),
            record.deleted_at.as_deref(),
        )?;

        let mut stage = FileStage::new(Self::FAMILY.file_dir());
        if let Some(key) = ctx.repo.resolve_key(Self::FAMILY, record.id)? {
            let question_ids: Vec<i64> = ctx
                .repo
                .questionnaire_questions(key.local_id())?
                .into_iter()
                .map(|(id, _)| id)
                .collect();
            stage.track_owned(ctx.repo, FileOwner::QUESTIONNAIRE_QUESTION, &question_ids)?;
        }

        let mut question_files = BTreeMap::new();
        for question in &record.questions {
            if let Some(local) = stage.resolve_one(&ctx.files, question.file_id).await {
                question_files.insert(question.id, local);
            }
        }

        let row = QuestionnaireRow {
            title: &record.title,
            description: &record.description,
            auto_translated: &record.auto_translated,
            created_at: timestamps.created_at,
            updated_at: timestamps.updated_at,
            deleted_at: timestamps.deleted_at,
        };

        let result = ctx.repo.in_transaction(|repo| {
            let (key, outcome) = repo.upsert_synced_questionnaire(record.id, &row)?;
            let questionnaire_id = key.local_id();

            let mut kept_questions = BTreeSet::new();
            for question in &record.questions {
                let file_id = question_files.get(&question.id).copied();
                let question_id = repo.upsert_questionnaire_question(
                    questionnaire_id,
                    &QuestionRow {
                        global_ref: question.id,
                        title: &question.title,
                        question_type: &question.question_type,
                        mandatory: question.mandatory,
                        file_id,
                        display_order: question.order,
                    },
                )?;
                if let Some(file_id) = file_id {
                    repo.claim_file(
                        file_id,
                        FileOwner::new(FileOwner::QUESTIONNAIRE_QUESTION, question_id),
                    )?;
                }

                let mut kept_answers = BTreeSet::new();
                for answer in &question.answers {
                    repo.upsert_questionnaire_answer(
                        question_id,
                        &AnswerRow {
                            global_ref: answer.id,
                            description: &answer.description,
                            value: answer.value,
                            threshold: answer.threshold,
                            display_order: answer.order,
                        },
                    )?;
                    kept_answers.insert(answer.id);
                }
                repo.prune_questionnaire_answers(question_id, &kept_answers)?;
                kept_questions.insert(question_id);
            }
            repo.prune_questionnaire_questions(questionnaire_id, &kept_questions)?;

            sync_links(repo, Self::FAMILY, questionnaire_id, &record.categories, &self.categories)?;
            Ok::<_, SyncError>(outcome)
        });

        finish_item(ctx, stage, result).await
    }

    async fn prune(&self, ctx: &SyncContext<'_>, global_id: i64) -> Result<PruneOutcome> {
        soft_prune(ctx, Self::FAMILY, global_id)
    }
}
