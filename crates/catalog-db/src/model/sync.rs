//! Desired state handed to the mirror by one synchronization run.

use std::collections::BTreeSet;

use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;

use crate::model::group::NewGroup;

/// One group as the provider currently reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredGroup {
    pub id: String,
    pub name: String,
    pub path: String,
    pub parent_id: Option<String>,
    /// Role names for the configured client.
    pub role_names: BTreeSet<String>,
}

impl DesiredGroup {
    #[must_use]
    pub fn as_row(&self, sync_time: DateTime<Utc>) -> NewGroup<'_> {
        NewGroup {
            id: &self.id,
            name: &self.name,
            path: &self.path,
            parent_id: self.parent_id.as_deref(),
            last_sync_time: sync_time,
        }
    }
}

/// The full desired state for one run, parents before children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    pub sync_time: DateTime<Utc>,
    pub groups: Vec<DesiredGroup>,
}

impl SyncPlan {
    /// Starts a plan stamped with the current time at database precision.
    #[must_use]
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    #[must_use]
    pub fn at(sync_time: DateTime<Utc>) -> Self {
        Self {
            sync_time: sync_time.trunc_subsecs(6),
            groups: Vec::new(),
        }
    }
}

/// Counters reported by one applied plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub roles_added: usize,
    pub roles_removed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
    Unchanged,
}
