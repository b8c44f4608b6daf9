//! Reference data: languages, translations, categories and health conditions.
//!
//! These rows carry no files, so each upsert is a single statement.

use library_core::records::{
    GlobalCategory, GlobalHealthCondition, GlobalLanguage, GlobalTranslation,
};
use library_core::{Family, PruneOutcome, SyncOutcome};

use crate::error::Result;
use crate::sync::reconciler::{hard_prune, Reconcile};
use crate::sync::SyncContext;

pub(crate) struct Languages;

impl Reconcile for Languages {
    type Record = GlobalLanguage;

    const FAMILY: Family = Family::Languages;

    fn global_id(record: &GlobalLanguage) -> i64 {
        record.id
    }

    async fn upsert(&self, ctx: &SyncContext<'_>, record: &GlobalLanguage) -> Result<SyncOutcome> {
        Ok(ctx.repo.upsert_language(record)?)
    }

    async fn prune(&self, ctx: &SyncContext<'_>, global_id: i64) -> Result<PruneOutcome> {
        hard_prune(ctx, Self::FAMILY, global_id, &[]).await
    }
}

pub(crate) struct Translations;

impl Reconcile for Translations {
    type Record = GlobalTranslation;

    const FAMILY: Family = Family::Translations;

    fn global_id(record: &GlobalTranslation) -> i64 {
        record.id
    }

    async fn upsert(
        &self,
        ctx: &SyncContext<'_>,
        record: &GlobalTranslation,
    ) -> Result<SyncOutcome> {
        Ok(ctx.repo.upsert_translation(record)?)
    }

    async fn prune(&self, ctx: &SyncContext<'_>, global_id: i64) -> Result<PruneOutcome> {
        hard_prune(ctx, Self::FAMILY, global_id, &[]).await
    }
}

/// Removing a category drops its content links through the foreign key.
pub(crate) struct Categories;

impl Reconcile for Categories {
    type Record = GlobalCategory;

    const FAMILY: Family = Family::Categories;

    fn global_id(record: &GlobalCategory) -> i64 {
        record.id
    }

    async fn upsert(&self, ctx: &SyncContext<'_>, record: &GlobalCategory) -> Result<SyncOutcome> {
        Ok(ctx.repo.upsert_category(record)?)
    }

    async fn prune(&self, ctx: &SyncContext<'_>, global_id: i64) -> Result<PruneOutcome> {
        hard_prune(ctx, Self::FAMILY, global_id, &[]).await
    }
}

pub(crate) struct HealthConditions;

impl Reconcile for HealthConditions {
    type Record = GlobalHealthCondition;

    const FAMILY: Family = Family::HealthConditions;

    fn global_id(record: &GlobalHealthCondition) -> i64 {
        record.id
    }

    async fn upsert(
        &self,
        ctx: &SyncContext<'_>,
        record: &GlobalHealthCondition,
    ) -> Result<SyncOutcome> {
        Ok(ctx.repo.upsert_health_condition(record)?)
    }

    async fn prune(&self, ctx: &SyncContext<'_>, global_id: i64) -> Result<PruneOutcome> {
        hard_prune(ctx, Self::FAMILY, global_id, &[]).await
    }
}
