//! Mirroring the provider's group tree into the local database.

pub mod flatten;
pub mod job;

pub use flatten::{build_plan, flatten_group_tree};
pub use job::{GroupSyncJob, SyncStatus};
