//! Sync engine pulling the global library into the local replica.

pub mod associations;
mod families;
pub mod files;
mod reconciler;
pub mod rewriter;

use std::sync::Arc;

use library_core::{Family, InstanceRole, SyncReport};
use uuid::Uuid;

use crate::db::SqliteRepository;
use crate::error::{Result, SyncError};
use crate::global::GlobalSource;
use crate::storage::BlobStore;

use self::families::{
    AssistiveTechnologies, Categories, EducationMaterials, Exercises, Faqs, HealthConditions,
    Languages, Questionnaires, ScreeningQuestionnaires, Translations, Tutorials,
};
use self::files::{FileMigrator, NoThumbnails, ThumbnailGenerator};
use self::reconciler::reconcile;

/// Collaborators borrowed for one family pass.
pub(crate) struct SyncContext<'a> {
    pub repo: &'a SqliteRepository,
    pub source: &'a dyn GlobalSource,
    pub files: FileMigrator<'a>,
}

/// Sync engine for one organization replica.
///
/// Families are processed one at a time; each call is an independent,
/// idempotent pass.
pub struct SyncEngine {
    repo: SqliteRepository,
    source: Arc<dyn GlobalSource>,
    blobs: Arc<dyn BlobStore>,
    thumbnails: Arc<dyn ThumbnailGenerator>,
    role: InstanceRole,
}

impl SyncEngine {
    /// Create a new sync engine.
    pub fn new(
        repo: SqliteRepository,
        source: Arc<dyn GlobalSource>,
        blobs: Arc<dyn BlobStore>,
        role: InstanceRole,
    ) -> Self {
        Self {
            repo,
            source,
            blobs,
            thumbnails: Arc::new(NoThumbnails),
            role,
        }
    }

    pub fn with_thumbnails(mut self, thumbnails: Arc<dyn ThumbnailGenerator>) -> Self {
        self.thumbnails = thumbnails;
        self
    }

    pub fn role(&self) -> InstanceRole {
        self.role
    }

    pub fn repository(&self) -> &SqliteRepository {
        &self.repo
    }

    fn context(&self) -> SyncContext<'_> {
        SyncContext {
            repo: &self.repo,
            source: self.source.as_ref(),
            files: FileMigrator::new(
                &self.repo,
                self.source.as_ref(),
                self.blobs.as_ref(),
                self.thumbnails.as_ref(),
            ),
        }
    }

    /// Run one family and journal the outcome.
    ///
    /// A global instance owns the canonical data, so it reports the family
    /// as skipped without contacting the network.
    pub async fn sync_family(&self, family: Family) -> Result<SyncReport> {
        let run_id = Uuid::new_v4().to_string();
        let run = self.repo.start_run(&run_id, family)?;

        if !self.role.replicates() {
            tracing::info!("Skipping {} sync on {} instance", family, self.role.as_str());
            let report = SyncReport::skipped(family);
            self.repo.finish_run(run, &report)?;
            return Ok(report);
        }

        tracing::info!("Starting {} sync (run {})", family, run_id);
        let result = self.dispatch(family).await;

        match &result {
            Ok(report) => {
                self.repo.finish_run(run, report)?;
                tracing::info!(
                    "Finished {} sync: {} created, {} updated, {} deleted, {} failed",
                    family,
                    report.created,
                    report.updated,
                    report.deleted,
                    report.failed
                );
            }
            Err(e) => {
                self.repo.fail_run(run, &e.to_string())?;
                tracing::warn!("{} sync aborted: {}", family, e);
            }
        }

        result
    }

    async fn dispatch(&self, family: Family) -> Result<SyncReport> {
        let ctx = self.context();
        match family {
            Family::Languages => reconcile(&ctx, Languages).await,
            Family::Translations => reconcile(&ctx, Translations).await,
            Family::Categories => reconcile(&ctx, Categories).await,
            Family::HealthConditions => reconcile(&ctx, HealthConditions).await,
            Family::AssistiveTechnologies => reconcile(&ctx, AssistiveTechnologies).await,
            Family::Faqs => reconcile(&ctx, Faqs).await,
            Family::Tutorials => reconcile(&ctx, Tutorials).await,
            Family::Exercises => reconcile(&ctx, Exercises::default()).await,
            Family::EducationMaterials => reconcile(&ctx, EducationMaterials::default()).await,
            Family::Questionnaires => reconcile(&ctx, Questionnaires::default()).await,
            Family::ScreeningQuestionnaires => reconcile(&ctx, ScreeningQuestionnaires).await,
        }
    }

    /// Run every family in dependency order, continuing past failures.
    pub async fn sync_all(&self) -> Vec<(Family, Result<SyncReport>)> {
        let mut results = Vec::with_capacity(Family::ALL.len());
        for family in Family::ALL {
            let result = self.sync_family(family).await;
            results.push((family, result));
        }
        results
    }

    pub async fn sync_languages(&self) -> Result<SyncReport> {
        self.sync_family(Family::Languages).await
    }

    pub async fn sync_translations(&self) -> Result<SyncReport> {
        self.sync_family(Family::Translations).await
    }

    pub async fn sync_categories(&self) -> Result<SyncReport> {
        self.sync_family(Family::Categories).await
    }

    pub async fn sync_health_conditions(&self) -> Result<SyncReport> {
        self.sync_family(Family::HealthConditions).await
    }

    pub async fn sync_assistive_technologies(&self) -> Result<SyncReport> {
        self.sync_family(Family::AssistiveTechnologies).await
    }

    pub async fn sync_faqs(&self) -> Result<SyncReport> {
        self.sync_family(Family::Faqs).await
    }

    pub async fn sync_tutorials(&self) -> Result<SyncReport> {
        self.sync_family(Family::Tutorials).await
    }

    pub async fn sync_exercises(&self) -> Result<SyncReport> {
        self.sync_family(Family::Exercises).await
    }

    pub async fn sync_education_materials(&self) -> Result<SyncReport> {
        self.sync_family(Family::EducationMaterials).await
    }

    pub async fn sync_questionnaires(&self) -> Result<SyncReport> {
        self.sync_family(Family::Questionnaires).await
    }

    pub async fn sync_screening_questionnaires(&self) -> Result<SyncReport> {
        self.sync_family(Family::ScreeningQuestionnaires).await
    }
}

/// Summarize a run-all result for logging.
pub fn summarize(results: &[(Family, Result<SyncReport>)]) -> (usize, Vec<(Family, String)>) {
    let mut succeeded = 0;
    let mut failures = Vec::new();
    for (family, result) in results {
        match result {
            Ok(_) => succeeded += 1,
            Err(e) => failures.push((*family, describe(e))),
        }
    }
    (succeeded, failures)
}

fn describe(error: &SyncError) -> String {
    if error.is_fetch_failure() {
        format!("fetch failed: {}", error)
    } else {
        error.to_string()
    }
}
