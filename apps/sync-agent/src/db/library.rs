//! Row writers for library families.
//!
//! Mirrored families upsert on `id`; foreign-linked families upsert on
//! `(global_ref, is_global = 1)` and never touch locally-authored rows.

use std::collections::{BTreeMap, BTreeSet};

use library_core::records::{
    AdditionalField, GlobalCategory, GlobalHealthCondition, GlobalLanguage, GlobalTranslation,
};
use library_core::{Family, LocalizedFlags, LocalizedText, SyncKey, SyncOutcome};
use rusqlite::{params, OptionalExtension, ToSql};
use serde::de::DeserializeOwned;

use crate::db::error::DbError;
use crate::db::repository::{Result, SqliteRepository};

fn outcome(existed: bool) -> SyncOutcome {
    if existed {
        SyncOutcome::Updated
    } else {
        SyncOutcome::Created
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(DbError::from)
}

/// Exercise columns written from a global record.
#[derive(Debug, Clone)]
pub struct ExerciseRow<'a> {
    pub title: &'a LocalizedText,
    pub sets: i64,
    pub reps: i64,
    pub include_feedback: bool,
    pub get_pain_level: bool,
    pub additional_fields: &'a [AdditionalField],
    pub auto_translated: &'a LocalizedFlags,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub deleted_at: Option<String>,
}

/// Education material columns; `file_ids` maps language to local file id.
#[derive(Debug, Clone)]
pub struct MaterialRow<'a> {
    pub title: &'a LocalizedText,
    pub file_ids: &'a BTreeMap<String, i64>,
    pub auto_translated: &'a LocalizedFlags,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub deleted_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct QuestionnaireRow<'a> {
    pub title: &'a LocalizedText,
    pub description: &'a LocalizedText,
    pub auto_translated: &'a LocalizedFlags,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub deleted_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct QuestionRow<'a> {
    pub global_ref: i64,
    pub title: &'a LocalizedText,
    pub question_type: &'a str,
    pub mandatory: bool,
    pub file_id: Option<i64>,
    pub display_order: i64,
}

#[derive(Debug, Clone)]
pub struct AnswerRow<'a> {
    pub global_ref: i64,
    pub description: &'a LocalizedText,
    pub value: Option<f64>,
    pub threshold: Option<f64>,
    pub display_order: i64,
}

/// Exercise as stored locally.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalExercise {
    pub id: i64,
    pub title: LocalizedText,
    pub sets: i64,
    pub reps: i64,
    pub therapist_id: Option<i64>,
    pub is_global: bool,
    pub global_ref: Option<i64>,
    pub created_at: Option<String>,
    pub deleted_at: Option<String>,
}

impl SqliteRepository {
    /// Read one JSON column of a row.
    pub fn read_json<T: DeserializeOwned>(
        &self,
        table: &str,
        column: &str,
        id: i64,
    ) -> Result<Option<T>> {
        let raw: Option<String> = self
            .conn()
            .query_row(
                &format!("SELECT {} FROM {} WHERE id = ?1", column, table),
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|s| serde_json::from_str(&s).map_err(DbError::from))
            .transpose()
    }

    // === Mirrored reference data ===

    pub fn upsert_language(&self, record: &GlobalLanguage) -> Result<SyncOutcome> {
        let existed = self.mirrored_exists(Family::Languages.table(), record.id)?;
        self.conn().execute(
            "INSERT INTO languages (id, name, code, rtl, auto_translated)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, code = excluded.code,
                 rtl = excluded.rtl, auto_translated = excluded.auto_translated",
            params![record.id, record.name, record.code, record.rtl, record.auto_translated],
        )?;
        Ok(outcome(existed))
    }

    pub fn upsert_translation(&self, record: &GlobalTranslation) -> Result<SyncOutcome> {
        let existed = self.mirrored_exists(Family::Translations.table(), record.id)?;
        self.conn().execute(
            "INSERT INTO translations (id, key, value, platform, auto_translated)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET key = excluded.key, value = excluded.value,
                 platform = excluded.platform, auto_translated = excluded.auto_translated",
            params![
                record.id,
                record.key,
                to_json(&record.value)?,
                record.platform,
                to_json(&record.auto_translated)?
            ],
        )?;
        Ok(outcome(existed))
    }

    pub fn upsert_category(&self, record: &GlobalCategory) -> Result<SyncOutcome> {
        let existed = self.mirrored_exists(Family::Categories.table(), record.id)?;
        self.conn().execute(
            "INSERT INTO categories (id, title, type, parent_id, auto_translated)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET title = excluded.title, type = excluded.type,
                 parent_id = excluded.parent_id, auto_translated = excluded.auto_translated",
            params![
                record.id,
                to_json(&record.title)?,
                record.category_type.as_str(),
                record.parent_id,
                to_json(&record.auto_translated)?
            ],
        )?;
        Ok(outcome(existed))
    }

    pub fn upsert_health_condition(&self, record: &GlobalHealthCondition) -> Result<SyncOutcome> {
        let existed = self.mirrored_exists(Family::HealthConditions.table(), record.id)?;
        self.conn().execute(
            "INSERT INTO health_conditions (id, title, parent_id, auto_translated)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET title = excluded.title, parent_id = excluded.parent_id,
                 auto_translated = excluded.auto_translated",
            params![
                record.id,
                to_json(&record.title)?,
                record.parent_id,
                to_json(&record.auto_translated)?
            ],
        )?;
        Ok(outcome(existed))
    }

    pub fn upsert_assistive_technology(
        &self,
        id: i64,
        code: &str,
        name: &LocalizedText,
        description: &LocalizedText,
        file_id: Option<i64>,
    ) -> Result<SyncOutcome> {
        let existed = self.mirrored_exists(Family::AssistiveTechnologies.table(), id)?;
        self.conn().execute(
            "INSERT INTO assistive_technologies (id, code, name, description, file_id)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET code = excluded.code, name = excluded.name,
                 description = excluded.description, file_id = excluded.file_id",
            params![id, code, to_json(name)?, to_json(description)?, file_id],
        )?;
        Ok(outcome(existed))
    }

    pub fn assistive_technology_file(&self, id: i64) -> Result<Option<i64>> {
        let file_id: Option<Option<i64>> = self
            .conn()
            .query_row(
                "SELECT file_id FROM assistive_technologies WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(file_id.flatten())
    }

    pub fn upsert_faq(
        &self,
        id: i64,
        title: &LocalizedText,
        content: &LocalizedText,
        order: i64,
    ) -> Result<SyncOutcome> {
        let existed = self.mirrored_exists(Family::Faqs.table(), id)?;
        self.conn().execute(
            "INSERT INTO faqs (id, title, content, display_order) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET title = excluded.title, content = excluded.content,
                 display_order = excluded.display_order",
            params![id, to_json(title)?, to_json(content)?, order],
        )?;
        Ok(outcome(existed))
    }

    pub fn upsert_tutorial(
        &self,
        id: i64,
        title: &LocalizedText,
        content: &LocalizedText,
        platform: &str,
    ) -> Result<SyncOutcome> {
        let existed = self.mirrored_exists(Family::Tutorials.table(), id)?;
        self.conn().execute(
            "INSERT INTO tutorials (id, title, content, platform) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET title = excluded.title, content = excluded.content,
                 platform = excluded.platform",
            params![id, to_json(title)?, to_json(content)?, platform],
        )?;
        Ok(outcome(existed))
    }

    // === Foreign-linked content ===

    /// Insert a therapist-authored exercise. Sync never touches these rows.
    pub fn insert_local_exercise(&self, title: &LocalizedText, therapist_id: i64) -> Result<i64> {
        self.conn().execute(
            "INSERT INTO exercises (title, therapist_id, is_global, created_at)
             VALUES (?1, ?2, 0, ?3)",
            params![to_json(title)?, therapist_id, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(self.conn().last_insert_rowid())
    }

    pub fn upsert_synced_exercise(
        &self,
        global_ref: i64,
        row: &ExerciseRow<'_>,
    ) -> Result<(SyncKey, SyncOutcome)> {
        let table = Family::Exercises.table();
        let title = to_json(row.title)?;
        let fields = to_json(&row.additional_fields)?;
        let flags = to_json(row.auto_translated)?;
        let values: [&dyn ToSql; 11] = [
            &title,
            &row.sets,
            &row.reps,
            &row.include_feedback,
            &row.get_pain_level,
            &fields,
            &flags,
            &row.created_at,
            &row.updated_at,
            &row.deleted_at,
            &global_ref,
        ];
        match self.find_synced(table, global_ref)? {
            Some(local_id) => {
                self.conn().execute(
                    "UPDATE exercises SET title = ?1, sets = ?2, reps = ?3, include_feedback = ?4,
                         get_pain_level = ?5, additional_fields = ?6, auto_translated = ?7,
                         created_at = ?8, updated_at = ?9, deleted_at = ?10
                     WHERE global_ref = ?11 AND is_global = 1",
                    &values[..],
                )?;
                Ok((
                    SyncKey::ForeignLinked { local_id, global_id: global_ref },
                    SyncOutcome::Updated,
                ))
            }
            None => {
                self.conn().execute(
                    "INSERT INTO exercises (title, sets, reps, include_feedback, get_pain_level,
                         additional_fields, auto_translated, created_at, updated_at, deleted_at,
                         global_ref, is_global, therapist_id)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 1, NULL)",
                    &values[..],
                )?;
                let local_id = self.conn().last_insert_rowid();
                Ok((
                    SyncKey::ForeignLinked { local_id, global_id: global_ref },
                    SyncOutcome::Created,
                ))
            }
        }
    }

    pub fn get_exercise(&self, id: i64) -> Result<Option<LocalExercise>> {
        let row = self
            .conn()
            .query_row(
                "SELECT id, title, sets, reps, therapist_id, is_global, global_ref, created_at,
                 deleted_at
                 FROM exercises WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<i64>>(4)?,
                        row.get::<_, bool>(5)?,
                        row.get::<_, Option<i64>>(6)?,
                        row.get::<_, Option<String>>(7)?,
                        row.get::<_, Option<String>>(8)?,
                    ))
                },
            )
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };
        let (id, title, sets, reps, therapist_id, is_global, global_ref, created_at, deleted_at) =
            row;
        Ok(Some(LocalExercise {
            id,
            title: serde_json::from_str(&title)?,
            sets,
            reps,
            therapist_id,
            is_global,
            global_ref,
            created_at,
            deleted_at,
        }))
    }

    /// Replace the ordered attachment list of an exercise.
    pub fn replace_exercise_files(&self, exercise_id: i64, file_ids: &[i64]) -> Result<()> {
        self.conn().execute(
            "DELETE FROM exercise_files WHERE exercise_id = ?1",
            params![exercise_id],
        )?;
        for (order, file_id) in file_ids.iter().enumerate() {
            self.conn().execute(
                "INSERT OR IGNORE INTO exercise_files (exercise_id, file_id, display_order)
                 VALUES (?1, ?2, ?3)",
                params![exercise_id, file_id, order as i64],
            )?;
        }
        Ok(())
    }

    pub fn exercise_files(&self, exercise_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self.conn().prepare(
            "SELECT file_id FROM exercise_files WHERE exercise_id = ?1 ORDER BY display_order",
        )?;
        let ids = stmt
            .query_map(params![exercise_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    pub fn upsert_synced_material(
        &self,
        global_ref: i64,
        row: &MaterialRow<'_>,
    ) -> Result<(SyncKey, SyncOutcome)> {
        let table = Family::EducationMaterials.table();
        let title = to_json(row.title)?;
        let file_ids = to_json(row.file_ids)?;
        let flags = to_json(row.auto_translated)?;
        let values: [&dyn ToSql; 7] = [
            &title,
            &file_ids,
            &flags,
            &row.created_at,
            &row.updated_at,
            &row.deleted_at,
            &global_ref,
        ];
        match self.find_synced(table, global_ref)? {
            Some(local_id) => {
                self.conn().execute(
                    "UPDATE education_materials SET title = ?1, file_ids = ?2, auto_translated = ?3,
                         created_at = ?4, updated_at = ?5, deleted_at = ?6
                     WHERE global_ref = ?7 AND is_global = 1",
                    &values[..],
                )?;
                Ok((
                    SyncKey::ForeignLinked { local_id, global_id: global_ref },
                    SyncOutcome::Updated,
                ))
            }
            None => {
                self.conn().execute(
                    "INSERT INTO education_materials (title, file_ids, auto_translated, created_at,
                         updated_at, deleted_at, global_ref, is_global)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)",
                    &values[..],
                )?;
                let local_id = self.conn().last_insert_rowid();
                Ok((
                    SyncKey::ForeignLinked { local_id, global_id: global_ref },
                    SyncOutcome::Created,
                ))
            }
        }
    }

    pub fn upsert_synced_questionnaire(
        &self,
        global_ref: i64,
        row: &QuestionnaireRow<'_>,
    ) -> Result<(SyncKey, SyncOutcome)> {
        let table = Family::Questionnaires.table();
        let title = to_json(row.title)?;
        let description = to_json(row.description)?;
        let flags = to_json(row.auto_translated)?;
        let values: [&dyn ToSql; 7] = [
            &title,
            &description,
            &flags,
            &row.created_at,
            &row.updated_at,
            &row.deleted_at,
            &global_ref,
        ];
        match self.find_synced(table, global_ref)? {
            Some(local_id) => {
                self.conn().execute(
                    "UPDATE questionnaires SET title = ?1, description = ?2, auto_translated = ?3,
                         created_at = ?4, updated_at = ?5, deleted_at = ?6
                     WHERE global_ref = ?7 AND is_global = 1",
                    &values[..],
                )?;
                Ok((
                    SyncKey::ForeignLinked { local_id, global_id: global_ref },
                    SyncOutcome::Updated,
                ))
            }
            None => {
                self.conn().execute(
                    "INSERT INTO questionnaires (title, description, auto_translated, created_at,
                         updated_at, deleted_at, global_ref, is_global)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)",
                    &values[..],
                )?;
                let local_id = self.conn().last_insert_rowid();
                Ok((
                    SyncKey::ForeignLinked { local_id, global_id: global_ref },
                    SyncOutcome::Created,
                ))
            }
        }
    }

    /// `(local id, global ref)` of every question under a questionnaire.
    pub fn questionnaire_questions(&self, questionnaire_id: i64) -> Result<Vec<(i64, i64)>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, global_ref FROM questionnaire_questions
             WHERE questionnaire_id = ?1 ORDER BY display_order, id",
        )?;
        let rows = stmt
            .query_map(params![questionnaire_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Upsert a question keyed by `(questionnaire_id, global_ref)`; returns its local id.
    pub fn upsert_questionnaire_question(
        &self,
        questionnaire_id: i64,
        row: &QuestionRow<'_>,
    ) -> Result<i64> {
        self.conn().execute(
            "INSERT INTO questionnaire_questions (questionnaire_id, global_ref, title,
             question_type,
                 mandatory, file_id, display_order)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(questionnaire_id, global_ref) DO UPDATE SET title = excluded.title,
                 question_type = excluded.question_type, mandatory = excluded.mandatory,
                 file_id = excluded.file_id, display_order = excluded.display_order",
            params![
                questionnaire_id,
                row.global_ref,
                to_json(row.title)?,
                row.question_type,
                row.mandatory,
                row.file_id,
                row.display_order
            ],
        )?;
        self.conn()
            .query_row(
                "SELECT id FROM questionnaire_questions
                 WHERE questionnaire_id = ?1 AND global_ref = ?2",
                params![questionnaire_id, row.global_ref],
                |r| r.get(0),
            )
            .map_err(Into::into)
    }

    pub fn upsert_questionnaire_answer(
        &self,
        question_id: i64,
        row: &AnswerRow<'_>,
    ) -> Result<i64> {
        self.conn().execute(
            "INSERT INTO questionnaire_answers (question_id, global_ref, description, value,
             threshold, display_order)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(question_id, global_ref) DO UPDATE SET description = excluded.description,
                 value = excluded.value, threshold = excluded.threshold,
                 display_order = excluded.display_order",
            params![
                question_id,
                row.global_ref,
                to_json(row.description)?,
                row.value,
                row.threshold,
                row.display_order
            ],
        )?;
        self.conn()
            .query_row(
                "SELECT id FROM questionnaire_answers WHERE question_id = ?1 AND global_ref = ?2",
                params![question_id, row.global_ref],
                |r| r.get(0),
            )
            .map_err(Into::into)
    }

    /// Delete questions of a questionnaire whose local id is not in `keep`.
    pub fn prune_questionnaire_questions(
        &self,
        questionnaire_id: i64,
        keep: &BTreeSet<i64>,
    ) -> Result<usize> {
        let mut removed = 0;
        for (id, _) in self.questionnaire_questions(questionnaire_id)? {
            if !keep.contains(&id) {
                removed += self.conn().execute(
                    "DELETE FROM questionnaire_questions WHERE id = ?1",
                    params![id],
                )?;
            }
        }
        Ok(removed)
    }

    /// Delete answers of a question whose global ref is not in `keep`.
    pub fn prune_questionnaire_answers(
        &self,
        question_id: i64,
        keep: &BTreeSet<i64>,
    ) -> Result<usize> {
        let mut stmt = self.conn().prepare(
            "SELECT id, global_ref FROM questionnaire_answers WHERE question_id = ?1",
        )?;
        let rows = stmt
            .query_map(params![question_id], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, Option<i64>>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut removed = 0;
        for (id, global_ref) in rows {
            if global_ref.map_or(true, |g| !keep.contains(&g)) {
                removed += self.conn().execute(
                    "DELETE FROM questionnaire_answers WHERE id = ?1",
                    params![id],
                )?;
            }
        }
        Ok(removed)
    }
}
