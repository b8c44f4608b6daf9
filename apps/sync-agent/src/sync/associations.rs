//! Content-category link replacement.

use library_core::{Family, GlobalIndex, LinkPlan};

use crate::db::{DbError, SqliteRepository};

/// Make the links of one content row equal the resolved target set.
///
/// Target ids without a local row are dropped. Returns the applied plan,
/// which is empty for families without category links.
pub fn sync_links(
    repo: &SqliteRepository,
    family: Family,
    local_id: i64,
    target_global_ids: &[i64],
    index: &GlobalIndex,
) -> Result<LinkPlan, DbError> {
    let Some(content_type) = family.link_kind() else {
        return Ok(LinkPlan::default());
    };
    let target = index.resolve(target_global_ids);
    let current = repo.category_links(content_type, local_id)?;
    let plan = LinkPlan::between(&current, &target);
    if !plan.is_empty() {
        repo.apply_link_plan(content_type, local_id, &plan)?;
        tracing::debug!(
            "Links for {} {}: +{} -{}",
            content_type,
            local_id,
            plan.add.len(),
            plan.remove.len()
        );
    }
    Ok(plan)
}
