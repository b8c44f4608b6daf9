//! Typed records served by the global library, one per entity family.
//!
//! Fields the global service may omit are `Option` or carry a serde default.
//! File references are global file ids; they are resolved to local files
//! during sync.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{LocalizedFlags, LocalizedText};

/// Deserialize `null` as the type's default.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Count as served by the global library: a number, a numeric string or blank.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawCount {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Deserialize an optional count; `null` and blank strings are absent.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<RawCount>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawCount::Int(n)) => Ok(Some(n)),
        Some(RawCount::Float(f)) => Ok(Some(f as i64)),
        Some(RawCount::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<i64>()
                .or_else(|_| trimmed.parse::<f64>().map(|f| f as i64))
                .map(Some)
                .map_err(|_| D::Error::custom(format!("invalid count '{}'", text)))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalLanguage {
    pub id: i64,
    pub name: String,
    pub code: String,
    #[serde(default, deserialize_with = "null_default")]
    pub rtl: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub auto_translated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalTranslation {
    pub id: i64,
    pub key: String,
    #[serde(default, deserialize_with = "null_default")]
    pub value: LocalizedText,
    #[serde(default, deserialize_with = "null_default")]
    pub platform: String,
    #[serde(default, deserialize_with = "null_default")]
    pub auto_translated: LocalizedFlags,
}

/// Category type a category applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryType {
    Exercise,
    #[serde(alias = "material")]
    Education,
    Questionnaire,
}

impl CategoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exercise => "exercise",
            Self::Education => "education",
            Self::Questionnaire => "questionnaire",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalCategory {
    pub id: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub title: LocalizedText,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub auto_translated: LocalizedFlags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalHealthCondition {
    pub id: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub title: LocalizedText,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub auto_translated: LocalizedFlags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalAssistiveTechnology {
    pub id: i64,
    pub code: String,
    #[serde(default, deserialize_with = "null_default")]
    pub name: LocalizedText,
    #[serde(default, deserialize_with = "null_default")]
    pub description: LocalizedText,
    #[serde(default)]
    pub file_id: Option<i64>,
}

/// FAQ entry; `content` is rich text that may embed file references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalFaq {
    pub id: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub title: LocalizedText,
    #[serde(default, deserialize_with = "null_default")]
    pub content: LocalizedText,
    #[serde(default, deserialize_with = "null_default")]
    pub order: i64,
}

/// Tutorial page; `content` is rich text that may embed file references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalTutorial {
    pub id: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub title: LocalizedText,
    #[serde(default, deserialize_with = "null_default")]
    pub content: LocalizedText,
    #[serde(default, deserialize_with = "null_default")]
    pub platform: String,
}

/// Extra labelled field attached to an exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditionalField {
    #[serde(default, deserialize_with = "null_default")]
    pub field: LocalizedText,
    #[serde(default, deserialize_with = "null_default")]
    pub value: LocalizedText,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalExercise {
    pub id: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub title: LocalizedText,
    #[serde(default, deserialize_with = "lenient_count")]
    pub sets: Option<i64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub reps: Option<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub include_feedback: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub get_pain_level: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub additional_fields: Vec<AdditionalField>,
    /// Ordered attachment list (global file ids).
    #[serde(default, deserialize_with = "null_default")]
    pub files: Vec<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub categories: Vec<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub auto_translated: LocalizedFlags,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<String>,
}

impl GlobalExercise {
    /// Sets with an absent value coerced to zero.
    pub fn sets_or_default(&self) -> i64 {
        self.sets.unwrap_or(0)
    }

    /// Reps with an absent value coerced to zero.
    pub fn reps_or_default(&self) -> i64 {
        self.reps.unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalEducationMaterial {
    pub id: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub title: LocalizedText,
    /// One attachment per language code.
    #[serde(default, deserialize_with = "null_default")]
    pub file_id: BTreeMap<String, i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub categories: Vec<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub auto_translated: LocalizedFlags,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalQuestionnaire {
    pub id: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub title: LocalizedText,
    #[serde(default, deserialize_with = "null_default")]
    pub description: LocalizedText,
    #[serde(default, deserialize_with = "null_default")]
    pub questions: Vec<GlobalQuestion>,
    #[serde(default, deserialize_with = "null_default")]
    pub categories: Vec<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub auto_translated: LocalizedFlags,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalQuestion {
    pub id: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub title: LocalizedText,
    #[serde(rename = "type", default, deserialize_with = "null_default")]
    pub question_type: String,
    #[serde(default, deserialize_with = "null_default")]
    pub mandatory: bool,
    #[serde(default)]
    pub file_id: Option<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub order: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub answers: Vec<GlobalAnswer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalAnswer {
    pub id: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub description: LocalizedText,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default, deserialize_with = "null_default")]
    pub order: i64,
}

/// Screening questionnaire with its whole section tree embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalScreeningQuestionnaire {
    pub id: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub title: LocalizedText,
    /// Rich text; may embed file references.
    #[serde(default, deserialize_with = "null_default")]
    pub description: LocalizedText,
    #[serde(default, deserialize_with = "null_default")]
    pub sections: Vec<GlobalScreeningSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalScreeningSection {
    pub id: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub title: LocalizedText,
    #[serde(default, deserialize_with = "null_default")]
    pub description: LocalizedText,
    #[serde(default, deserialize_with = "null_default")]
    pub order: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub questions: Vec<GlobalScreeningQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalScreeningQuestion {
    pub id: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub title: LocalizedText,
    #[serde(default, deserialize_with = "null_default")]
    pub question_type: String,
    #[serde(default, deserialize_with = "null_default")]
    pub mandatory: bool,
    #[serde(default)]
    pub file_id: Option<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub order: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub options: Vec<GlobalScreeningOption>,
    #[serde(default, deserialize_with = "null_default")]
    pub logics: Vec<GlobalScreeningLogic>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalScreeningOption {
    pub id: i64,
    #[serde(default, deserialize_with = "null_default")]
    pub option_text: LocalizedText,
    #[serde(default)]
    pub option_point: Option<f64>,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub file_id: Option<i64>,
    #[serde(default, deserialize_with = "null_default")]
    pub order: i64,
}

/// Display logic; targets are global ids, which equal local ids for this tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalScreeningLogic {
    pub id: i64,
    #[serde(default)]
    pub target_question_id: Option<i64>,
    #[serde(default)]
    pub target_option_id: Option<i64>,
    #[serde(default)]
    pub target_option_value: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub condition_type: String,
    #[serde(default, deserialize_with = "null_default")]
    pub condition_rule: String,
}
