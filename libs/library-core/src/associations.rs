//! Association index and link-set planning.

use std::collections::{BTreeSet, HashMap};

/// Global id -> local id lookup for one target family, built once per pass.
#[derive(Debug, Clone, Default)]
pub struct GlobalIndex {
    entries: HashMap<i64, i64>,
}

impl GlobalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(global_id, local_id)` pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (i64, i64)>) -> Self {
        Self {
            entries: pairs.into_iter().collect(),
        }
    }

    /// Build for a mirrored family, where the local id is the global id.
    pub fn mirrored(ids: impl IntoIterator<Item = i64>) -> Self {
        Self::from_pairs(ids.into_iter().map(|id| (id, id)))
    }

    pub fn get(&self, global_id: i64) -> Option<i64> {
        self.entries.get(&global_id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Map global ids to local ids, discarding ids without a local row.
    pub fn resolve(&self, global_ids: &[i64]) -> BTreeSet<i64> {
        global_ids.iter().filter_map(|id| self.get(*id)).collect()
    }
}

/// Changes needed to turn the current link set into the target set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkPlan {
    pub add: BTreeSet<i64>,
    pub remove: BTreeSet<i64>,
}

impl LinkPlan {
    pub fn between(current: &BTreeSet<i64>, target: &BTreeSet<i64>) -> Self {
        Self {
            add: target.difference(current).copied().collect(),
            remove: current.difference(target).copied().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}
