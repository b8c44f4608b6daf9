//! Core types for the content library replica.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ContentError;

/// Text keyed by language code (e.g. `"en"`, `"km"`).
pub type LocalizedText = BTreeMap<String, String>;

/// Per-language flags, used for `auto_translated` markers.
pub type LocalizedFlags = BTreeMap<String, bool>;

/// Which side of the library this instance plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceRole {
    /// Owns the canonical data; never pulls from itself.
    Global,
    /// Holds a replica of the global library.
    Organization,
}

impl Default for InstanceRole {
    fn default() -> Self {
        Self::Organization
    }
}

impl InstanceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Organization => "organization",
        }
    }

    /// Only organization instances replicate.
    pub fn replicates(&self) -> bool {
        matches!(self, Self::Organization)
    }
}

impl FromStr for InstanceRole {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(Self::Global),
            "organization" | "organisation" => Ok(Self::Organization),
            other => Err(ContentError::UnknownRole(other.to_string())),
        }
    }
}

/// How a local row is identified relative to its global record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityStrategy {
    /// Local primary key equals the global id.
    Mirrored,
    /// Local primary key is generated; `global_ref` + `is_global` point upstream.
    ForeignLinked,
}

/// What happens to local rows that vanished from the latest fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrunePolicy {
    /// Delete the row and every file it exclusively owns.
    HardPrune,
    /// Keep the row; only its `deleted_at` marker follows upstream.
    SoftMirror,
}

/// Resolved identity of one synced row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncKey {
    Mirrored(i64),
    ForeignLinked { local_id: i64, global_id: i64 },
}

impl SyncKey {
    pub fn local_id(&self) -> i64 {
        match *self {
            Self::Mirrored(id) => id,
            Self::ForeignLinked { local_id, .. } => local_id,
        }
    }

    pub fn global_id(&self) -> i64 {
        match *self {
            Self::Mirrored(id) => id,
            Self::ForeignLinked { global_id, .. } => global_id,
        }
    }
}

/// Entity families replicated from the global library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Languages,
    Translations,
    Categories,
    HealthConditions,
    AssistiveTechnologies,
    Faqs,
    Tutorials,
    Exercises,
    EducationMaterials,
    Questionnaires,
    ScreeningQuestionnaires,
}

impl Family {
    /// Every family, in the order a full run processes them.
    ///
    /// Categories precede the content families that link to them.
    pub const ALL: [Family; 11] = [
        Family::Languages,
        Family::Translations,
        Family::Categories,
        Family::HealthConditions,
        Family::AssistiveTechnologies,
        Family::Faqs,
        Family::Tutorials,
        Family::Exercises,
        Family::EducationMaterials,
        Family::Questionnaires,
        Family::ScreeningQuestionnaires,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Languages => "languages",
            Self::Translations => "translations",
            Self::Categories => "categories",
            Self::HealthConditions => "health_conditions",
            Self::AssistiveTechnologies => "assistive_technologies",
            Self::Faqs => "faqs",
            Self::Tutorials => "tutorials",
            Self::Exercises => "exercises",
            Self::EducationMaterials => "education_materials",
            Self::Questionnaires => "questionnaires",
            Self::ScreeningQuestionnaires => "screening_questionnaires",
        }
    }

    /// Collection path on the global service, relative to `/api/`.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Languages => "languages",
            Self::Translations => "translations",
            Self::Categories => "categories",
            Self::HealthConditions => "health-conditions",
            Self::AssistiveTechnologies => "assistive-technologies",
            Self::Faqs => "faqs",
            Self::Tutorials => "tutorials",
            Self::Exercises => "exercises",
            Self::EducationMaterials => "education-materials",
            Self::Questionnaires => "questionnaires",
            Self::ScreeningQuestionnaires => "screening-questionnaires",
        }
    }

    /// Local table holding the family's top-level rows.
    pub fn table(&self) -> &'static str {
        self.as_str()
    }

    pub fn identity(&self) -> IdentityStrategy {
        match self {
            Self::Exercises | Self::EducationMaterials | Self::Questionnaires => {
                IdentityStrategy::ForeignLinked
            }
            _ => IdentityStrategy::Mirrored,
        }
    }

    pub fn prune_policy(&self) -> PrunePolicy {
        match self.identity() {
            IdentityStrategy::ForeignLinked => PrunePolicy::SoftMirror,
            IdentityStrategy::Mirrored => PrunePolicy::HardPrune,
        }
    }

    /// Blob directory for files migrated on behalf of this family.
    pub fn file_dir(&self) -> &'static str {
        match self {
            Self::Exercises => "exercise",
            Self::EducationMaterials => "education_material",
            Self::Questionnaires => "questionnaire",
            Self::ScreeningQuestionnaires => "screening_questionnaire",
            Self::AssistiveTechnologies => "assistive_technology",
            Self::Faqs => "faq",
            Self::Tutorials => "tutorial",
            Self::Languages | Self::Translations | Self::Categories | Self::HealthConditions => {
                "library"
            }
        }
    }

    /// Key used for content-category links, for families that carry them.
    pub fn link_kind(&self) -> Option<&'static str> {
        match self {
            Self::Exercises => Some("exercise"),
            Self::EducationMaterials => Some("education_material"),
            Self::Questionnaires => Some("questionnaire"),
            _ => None,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_");
        Family::ALL
            .into_iter()
            .find(|family| family.as_str() == normalized)
            .ok_or_else(|| ContentError::UnknownFamily(s.to_string()))
    }
}

/// File descriptor returned by the global bulk lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub id: i64,
    #[serde(alias = "filename")]
    pub file_name: String,
    pub content_type: String,
}

impl FileDescriptor {
    pub fn kind(&self) -> ContentKind {
        ContentKind::from_content_type(&self.content_type)
    }
}

/// Broad media class of a file, used to pick a thumbnail strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Image,
    Video,
    Pdf,
    Other,
}

impl ContentKind {
    pub fn from_content_type(content_type: &str) -> Self {
        let lower = content_type.to_ascii_lowercase();
        if lower.starts_with("image/") {
            Self::Image
        } else if lower.starts_with("video/") {
            Self::Video
        } else if lower == "application/pdf" {
            Self::Pdf
        } else {
            Self::Other
        }
    }
}
