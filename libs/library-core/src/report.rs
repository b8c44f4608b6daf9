//! Per-family sync outcomes and reports.

use serde::Serialize;

use crate::types::Family;

/// Result of upserting one global record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Created,
    Updated,
}

/// Result of pruning one local row absent from the fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneOutcome {
    /// Row and its owned files were removed.
    Deleted,
    /// Row was marked deleted and kept.
    SoftDeleted,
    /// Row was already marked deleted.
    Unchanged,
}

/// Counts for one family run.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SyncReport {
    pub family: Family,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub failed: usize,
    /// True when the instance role does not replicate.
    pub skipped: bool,
}

impl SyncReport {
    pub fn new(family: Family) -> Self {
        Self {
            family,
            created: 0,
            updated: 0,
            deleted: 0,
            failed: 0,
            skipped: false,
        }
    }

    pub fn skipped(family: Family) -> Self {
        Self {
            skipped: true,
            ..Self::new(family)
        }
    }

    pub fn record(&mut self, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Created => self.created += 1,
            SyncOutcome::Updated => self.updated += 1,
        }
    }

    pub fn record_prune(&mut self, outcome: PruneOutcome) {
        match outcome {
            PruneOutcome::Deleted | PruneOutcome::SoftDeleted => self.deleted += 1,
            PruneOutcome::Unchanged => {}
        }
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    /// Number of fetched records that were written.
    pub fn synced(&self) -> usize {
        self.created + self.updated
    }
}
