//! Core content library types shared by the replica sync agent.
//!
//! Provides:
//! - Typed records for every entity family served by the global library
//! - Rich-text file reference scanning and rewriting
//! - Association index and link-set planning
//! - Sync reports and timestamp parsing

pub mod associations;
pub mod content;
pub mod error;
pub mod records;
pub mod report;
pub mod time;
pub mod types;

pub use associations::{GlobalIndex, LinkPlan};
pub use content::{extract_file_ids, rewrite_file_ids};
pub use error::{ContentError, Result};
pub use report::{PruneOutcome, SyncOutcome, SyncReport};
pub use types::{
    ContentKind, Family, FileDescriptor, IdentityStrategy, InstanceRole, LocalizedFlags,
    LocalizedText, PrunePolicy, SyncKey,
};
