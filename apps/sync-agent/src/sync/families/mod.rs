//! Per-family reconcilers.

mod assistive;
mod exercises;
mod materials;
mod pages;
mod questionnaires;
mod reference;
mod screening;

pub(crate) use assistive::AssistiveTechnologies;
pub(crate) use exercises::Exercises;
pub(crate) use materials::EducationMaterials;
pub(crate) use pages::{Faqs, Tutorials};
pub(crate) use questionnaires::Questionnaires;
pub(crate) use reference::{Categories, HealthConditions, Languages, Translations};
pub(crate) use screening::ScreeningQuestionnaires;

use library_core::time::{parse_timestamp, to_storage};
use library_core::GlobalIndex;

use super::SyncContext;
use crate::error::Result;

/// Record timestamps normalized for storage. Absent values stay absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Timestamps {
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub deleted_at: Option<String>,
}

impl Timestamps {
    pub fn parse(
        created_at: Option<&str>,
        updated_at: Option<&str>,
        deleted_at: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            created_at: to_storage(parse_timestamp(created_at)?),
            updated_at: to_storage(parse_timestamp(updated_at)?),
            deleted_at: to_storage(parse_timestamp(deleted_at)?),
        })
    }
}

/// Category index for families that link to categories, loaded once per pass.
pub(crate) fn load_category_index(ctx: &SyncContext<'_>) -> Result<GlobalIndex> {
    let index = ctx.repo.global_index(library_core::Family::Categories)?;
    tracing::debug!("Loaded {} categories for linking", index.len());
    Ok(index)
}
