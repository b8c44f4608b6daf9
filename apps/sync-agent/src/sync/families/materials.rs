//! Education materials: one attachment per language.

use std::collections::{BTreeMap, BTreeSet};

use library_core::records::GlobalEducationMaterial;
use library_core::{Family, GlobalIndex, PruneOutcome, SyncOutcome};

use super::{load_category_index, Timestamps};
use crate::db::{FileOwner, MaterialRow};
use crate::error::{Result, SyncError};
use crate::sync::associations::sync_links;
use crate::sync::files::FileStage;
use crate::sync::reconciler::{finish_item, soft_prune, Reconcile};
use crate::sync::SyncContext;

#[derive(Default)]
pub(crate) struct EducationMaterials {
    categories: GlobalIndex,
}

impl Reconcile for EducationMaterials {
    type Record = GlobalEducationMaterial;

    const FAMILY: Family = Family::EducationMaterials;

    fn global_id(record: &GlobalEducationMaterial) -> i64 {
        record.id
    }

    fn prepare(&mut self, ctx: &SyncContext<'_>) -> Result<()> {
        self.categories = load_category_index(ctx)?;
        Ok(())
    }

    async fn upsert(
        &self,
        ctx: &SyncContext<'_>,
        record: &GlobalEducationMaterial,
    ) -> Result<SyncOutcome> {
        let timestamps = Timestamps::parse(
            record.created_at.as_deref(),
            record.updated_at.as_deref(),
            record.deleted_at.as_deref(),
        )?;

        let mut stage = FileStage::new(Self::FAMILY.file_dir());
        if let Some(key) = ctx.repo.resolve_key(Self::FAMILY, record.id)? {
            stage.track_owned(ctx.repo, FileOwner::EDUCATION_MATERIAL, &[key.local_id()])?;
        }
        let wanted: BTreeSet<i64> = record.file_id.values().copied().collect();
        let mapping = stage.resolve(&ctx.files, &wanted).await;
        let file_ids: BTreeMap<String, i64> = record
            .file_id
            .iter()
            .filter_map(|(lang, global_id)| {
                mapping.get(global_id).map(|local| (lang.clone(), *local))
            })
            .collect();

        let row = MaterialRow {
            title: &record.title,
            file_ids: &file_ids,
            auto_translated: &record.auto_translated,
            created_at: timestamps.created_at,
            updated_at: timestamps.updated_at,
            deleted_at: timestamps.deleted_at,
        };

        let result = ctx.repo.in_transaction(|repo| {
            let (key, outcome) = repo.upsert_synced_material(record.id, &row)?;
            for file_id in file_ids.values() {
                repo.claim_file(
                    *file_id,
                    FileOwner::new(FileOwner::EDUCATION_MATERIAL, key.local_id()),
                )?;
            }
            sync_links(repo, Self::FAMILY, key.local_id(), &record.categories, &self.categories)?;
            Ok::<_, SyncError>(outcome)
        });

        finish_item(ctx, stage, result).await
    }

    async fn prune(&self, ctx: &SyncContext<'_>, global_id: i64) -> Result<PruneOutcome> {
        soft_prune(ctx, Self::FAMILY, global_id)
    }
}
