//! Screening questionnaire tree rows.
//!
//! Every level is mirrored: section, question, option and logic rows use
//! the global ids as primary keys, so logic targets need no translation.

use std::collections::BTreeSet;

use library_core::records::{
    GlobalScreeningLogic, GlobalScreeningOption, GlobalScreeningQuestion,
    GlobalScreeningQuestionnaire, GlobalScreeningSection,
};
use library_core::{Family, LocalizedText, SyncOutcome};
use rusqlite::{params, OptionalExtension};

use crate::db::error::DbError;
use crate::db::repository::{Result, SqliteRepository};

/// Ids of every node below one screening questionnaire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreeningSubtree {
    pub sections: BTreeSet<i64>,
    pub questions: BTreeSet<i64>,
    pub options: BTreeSet<i64>,
    pub logics: BTreeSet<i64>,
}

impl ScreeningSubtree {
    /// Node ids carried by a fetched record.
    pub fn from_record(record: &GlobalScreeningQuestionnaire) -> Self {
        let mut tree = Self::default();
        for section in &record.sections {
            tree.sections.insert(section.id);
            for question in &section.questions {
                tree.questions.insert(question.id);
                tree.options.extend(question.options.iter().map(|o| o.id));
                tree.logics.extend(question.logics.iter().map(|l| l.id));
            }
        }
        tree
    }

    /// Nodes present in either tree.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            sections: self.sections.union(&other.sections).copied().collect(),
            questions: self.questions.union(&other.questions).copied().collect(),
            options: self.options.union(&other.options).copied().collect(),
            logics: self.logics.union(&other.logics).copied().collect(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.sections.len() + self.questions.len() + self.options.len() + self.logics.len()
    }
}

fn to_json(value: &LocalizedText) -> Result<String> {
    serde_json::to_string(value).map_err(DbError::from)
}

impl SqliteRepository {
    fn child_ids(&self, sql: &str, parents: &BTreeSet<i64>) -> Result<BTreeSet<i64>> {
        let mut stmt = self.conn().prepare(sql)?;
        let mut ids = BTreeSet::new();
        for parent in parents {
            let rows = stmt
                .query_map(params![parent], |row| row.get::<_, i64>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            ids.extend(rows);
        }
        Ok(ids)
    }

    /// Current subtree of a stored screening questionnaire.
    pub fn screening_subtree(&self, questionnaire_id: i64) -> Result<ScreeningSubtree> {
        let sections = self.child_ids(
            "SELECT id FROM screening_sections WHERE questionnaire_id = ?1",
            &BTreeSet::from([questionnaire_id]),
        )?;
        let questions = self.child_ids(
            "SELECT id FROM screening_questions WHERE section_id = ?1",
            &sections,
        )?;
        let options = self.child_ids(
            "SELECT id FROM screening_options WHERE question_id = ?1",
            &questions,
        )?;
        let logics = self.child_ids(
            "SELECT id FROM screening_logics WHERE question_id = ?1",
            &questions,
        )?;
        Ok(ScreeningSubtree {
            sections,
            questions,
            options,
            logics,
        })
    }

    pub fn upsert_screening_questionnaire(
        &self,
        id: i64,
        title: &LocalizedText,
        description: &LocalizedText,
    ) -> Result<SyncOutcome> {
        let existed = self.mirrored_exists(Family::ScreeningQuestionnaires.table(), id)?;
        self.conn().execute(
            "INSERT INTO screening_questionnaires (id, title, description) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET title = excluded.title,
             description = excluded.description",
            params![id, to_json(title)?, to_json(description)?],
        )?;
        Ok(if existed {
            SyncOutcome::Updated
        } else {
            SyncOutcome::Created
        })
    }

    pub fn upsert_screening_section(
        &self,
        questionnaire_id: i64,
        section: &GlobalScreeningSection,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO screening_sections (id, questionnaire_id, title, description,
             display_order)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET questionnaire_id = excluded.questionnaire_id,
                 title = excluded.title, description = excluded.description,
                 display_order = excluded.display_order",
            params![
                section.id,
                questionnaire_id,
                to_json(&section.title)?,
                to_json(&section.description)?,
                section.order
            ],
        )?;
        Ok(())
    }

    /// `file_id` is the local file already resolved for the question.
    pub fn upsert_screening_question(
        &self,
        section_id: i64,
        question: &GlobalScreeningQuestion,
        file_id: Option<i64>,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO screening_questions (id, section_id, title, question_type, mandatory,
             file_id, display_order)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET section_id = excluded.section_id, title = excluded.title,
                 question_type = excluded.question_type, mandatory = excluded.mandatory,
                 file_id = excluded.file_id, display_order = excluded.display_order",
            params![
                question.id,
                section_id,
                to_json(&question.title)?,
                question.question_type,
                question.mandatory,
                file_id,
                question.order
            ],
        )?;
        Ok(())
    }

    pub fn upsert_screening_option(
        &self,
        question_id: i64,
        option: &GlobalScreeningOption,
        file_id: Option<i64>,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO screening_options (id, question_id, option_text, option_point, threshold,
                 min_value, max_value, file_id, display_order)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO UPDATE SET question_id = excluded.question_id,
                 option_text = excluded.option_text, option_point = excluded.option_point,
                 threshold = excluded.threshold, min_value = excluded.min_value,
                 max_value = excluded.max_value, file_id = excluded.file_id,
                 display_order = excluded.display_order",
            params![
                option.id,
                question_id,
                to_json(&option.option_text)?,
                option.option_point,
                option.threshold,
                option.min,
                option.max,
                file_id,
                option.order
            ],
        )?;
        Ok(())
    }

    pub fn upsert_screening_logic(
        &self,
        question_id: i64,
        logic: &GlobalScreeningLogic,
    ) -> Result<()> {
        self.conn().execute(
            "INSERT INTO screening_logics (id, question_id, target_question_id, target_option_id,
                 target_option_value, condition_type, condition_rule)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET question_id = excluded.question_id,
                 target_question_id = excluded.target_question_id,
                 target_option_id = excluded.target_option_id,
                 target_option_value = excluded.target_option_value,
                 condition_type = excluded.condition_type,
                 condition_rule = excluded.condition_rule",
            params![
                logic.id,
                question_id,
                logic.target_question_id,
                logic.target_option_id,
                logic.target_option_value,
                logic.condition_type,
                logic.condition_rule
            ],
        )?;
        Ok(())
    }

    /// Delete nodes under a questionnaire that are not in `keep`.
    ///
    /// Leaves go first; removing a section cascades to anything left below it.
    pub fn prune_screening_subtree(
        &self,
        questionnaire_id: i64,
        keep: &ScreeningSubtree,
    ) -> Result<usize> {
        let current = self.screening_subtree(questionnaire_id)?;
        let mut removed = 0;
        let levels = [
            ("screening_logics", &current.logics, &keep.logics),
            ("screening_options", &current.options, &keep.options),
            ("screening_questions", &current.questions, &keep.questions),
            ("screening_sections", &current.sections, &keep.sections),
        ];
        for (table, present, wanted) in levels {
            for id in present.difference(wanted) {
                removed += self.delete_mirrored(table, *id)? as usize;
            }
        }
        Ok(removed)
    }

    /// Logic rows of a question as `(id, target question, target option)`.
    pub fn screening_logics(
        &self,
        question_id: i64,
    ) -> Result<Vec<(i64, Option<i64>, Option<i64>)>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, target_question_id, target_option_id FROM screening_logics
             WHERE question_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![question_id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Parent of a screening node, for tree checks.
    pub fn screening_parent(&self, table: &str, id: i64) -> Result<Option<i64>> {
        let column = match table {
            "screening_sections" => "questionnaire_id",
            "screening_questions" => "section_id",
            "screening_options" | "screening_logics" => "question_id",
            other => return Err(DbError::InvalidData(format!("not a screening table: {}", other))),
        };
        self.conn()
            .query_row(
                &format!("SELECT {} FROM {} WHERE id = ?1", column, table),
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }
}
