//! The local group/role mirror and the reconciliation applied by a sync run.

pub mod memory;
pub mod postgres;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DbResult;
use crate::model::group::{Group, GroupWithRoles};
use crate::model::role::Role;
use crate::model::sync::{DesiredGroup, SyncPlan, SyncSummary, UpsertOutcome};

pub use memory::MemoryMirror;
pub use postgres::PgMirror;

/// Storage for mirrored groups.
#[async_trait]
pub trait GroupMirror: Send + Sync {
    /// ## Summary
    /// Applies a plan atomically: every group in it is upserted with its
    /// roles and every other group is deleted, or nothing changes.
    ///
    /// ## Errors
    /// Returns a database error; the mirror is left as it was.
    async fn apply_sync(&self, plan: &SyncPlan) -> DbResult<SyncSummary>;

    /// ## Summary
    /// Lists every mirrored group with its role names, ordered by path.
    ///
    /// ## Errors
    /// Returns a database error if the mirror cannot be read.
    async fn list_groups(&self) -> DbResult<Vec<GroupWithRoles>>;

    /// ## Summary
    /// Loads the groups with the given ids. Unknown ids are skipped.
    ///
    /// ## Errors
    /// Returns a database error if the mirror cannot be read.
    async fn groups_by_ids(&self, ids: &[String]) -> DbResult<Vec<Group>>;
}

/// Row operations available inside one sync transaction.
#[async_trait]
pub(crate) trait MirrorTx: Send {
    async fn upsert_group(
        &mut self,
        group: &DesiredGroup,
        sync_time: DateTime<Utc>,
    ) -> DbResult<UpsertOutcome>;

    async fn group_roles(&mut self, group_id: &str) -> DbResult<Vec<Role>>;

    async fn get_or_create_role(&mut self, name: &str) -> DbResult<Role>;

    async fn attach_role(&mut self, group_id: &str, role_id: uuid::Uuid) -> DbResult<()>;

    async fn detach_role(&mut self, group_id: &str, role_id: uuid::Uuid) -> DbResult<()>;

    /// Deletes every group not stamped with `sync_time`.
    async fn delete_stale_groups(&mut self, sync_time: DateTime<Utc>) -> DbResult<usize>;
}

/// Runs a plan against one transaction. Callers own commit and rollback.
pub(crate) async fn reconcile<T: MirrorTx>(tx: &mut T, plan: &SyncPlan) -> DbResult<SyncSummary> {
    let mut summary = SyncSummary::default();

    for desired in &plan.groups {
        match tx.upsert_group(desired, plan.sync_time).await? {
            UpsertOutcome::Created => summary.created += 1,
            UpsertOutcome::Updated => summary.updated += 1,
            UpsertOutcome::Unchanged => summary.unchanged += 1,
        }

        let current: BTreeMap<String, Role> = tx
            .group_roles(&desired.id)
            .await?
            .into_iter()
            .map(|role| (role.name.clone(), role))
            .collect();

        for name in &desired.role_names {
            if current.contains_key(name) {
                continue;
            }
            let role = tx.get_or_create_role(name).await?;
            tx.attach_role(&desired.id, role.id).await?;
            summary.roles_added += 1;
        }

        for (name, role) in &current {
            if !desired.role_names.contains(name) {
                tx.detach_role(&desired.id, role.id).await?;
                summary.roles_removed += 1;
            }
        }
    }

    summary.deleted = tx.delete_stale_groups(plan.sync_time).await?;

    tracing::debug!(?summary, "Reconciled group mirror");
    Ok(summary)
}
