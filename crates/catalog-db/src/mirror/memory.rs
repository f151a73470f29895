use std::collections::{BTreeMap, BTreeSet, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{GroupMirror, MirrorTx, reconcile};
use crate::error::{DbError, DbResult};
use crate::model::group::{Group, GroupWithRoles};
use crate::model::role::{NewRole, Role};
use crate::model::sync::{DesiredGroup, SyncPlan, SyncSummary, UpsertOutcome};

#[derive(Debug, Clone, Default)]
struct MirrorState {
    groups: BTreeMap<String, Group>,
    /// Roles by name.
    roles: BTreeMap<String, Role>,
    links: BTreeSet<(String, uuid::Uuid)>,
}

impl MirrorState {
    /// Commit-time checks matching the deferred database constraints.
    fn verify(&self) -> DbResult<()> {
        let mut paths = HashSet::new();
        for group in self.groups.values() {
            if !paths.insert(group.path.as_str()) {
                return Err(DbError::InvariantViolation(format!(
                    "duplicate group path {}",
                    group.path
                )));
            }
        }
        Ok(())
    }

    fn role_names(&self, group_id: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .links
            .iter()
            .filter(|(gid, _)| gid == group_id)
            .filter_map(|(_, rid)| self.roles.values().find(|r| r.id == *rid))
            .map(|r| r.name.clone())
            .collect();
        names.sort();
        names
    }
}

/// Group mirror held in process memory, for development and tests.
///
/// A sync works on a copy of the state and swaps it in only on success.
#[derive(Debug, Default)]
pub struct MemoryMirror {
    state: Mutex<MirrorState>,
    #[cfg(feature = "testing")]
    fail_upsert_at: std::sync::Mutex<Option<usize>>,
}

impl MemoryMirror {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the `n`-th group upsert (zero based) of the next sync fail.
    #[cfg(feature = "testing")]
    pub fn fail_next_sync_at(&self, n: usize) {
        if let Ok(mut slot) = self.fail_upsert_at.lock() {
            *slot = Some(n);
        }
    }

    #[cfg(feature = "testing")]
    fn take_failure(&self) -> Option<usize> {
        self.fail_upsert_at.lock().ok().and_then(|mut slot| slot.take())
    }

    #[cfg(not(feature = "testing"))]
    #[expect(clippy::unused_self, reason = "Matches the signature of the feature-enabled variant")]
    fn take_failure(&self) -> Option<usize> {
        None
    }
}

struct MemoryTx {
    state: MirrorState,
    upserts: usize,
    fail_at: Option<usize>,
}

#[async_trait]
impl MirrorTx for MemoryTx {
    async fn upsert_group(
        &mut self,
        group: &DesiredGroup,
        sync_time: DateTime<Utc>,
    ) -> DbResult<UpsertOutcome> {
        if self.fail_at == Some(self.upserts) {
            return Err(DbError::DatabaseError(
                diesel::result::Error::RollbackTransaction,
            ));
        }
        self.upserts += 1;

        let row = group.as_row(sync_time);
        let outcome = match self.state.groups.get(&group.id) {
            None => UpsertOutcome::Created,
            Some(existing) if row.differs_from(existing) => UpsertOutcome::Updated,
            Some(_) => UpsertOutcome::Unchanged,
        };
        self.state.groups.insert(
            group.id.clone(),
            Group {
                id: group.id.clone(),
                name: group.name.clone(),
                path: group.path.clone(),
                parent_id: group.parent_id.clone(),
                last_sync_time: sync_time,
            },
        );
        Ok(outcome)
    }

    async fn group_roles(&mut self, group_id: &str) -> DbResult<Vec<Role>> {
        let ids: HashSet<uuid::Uuid> = self
            .state
            .links
            .iter()
            .filter(|(gid, _)| gid == group_id)
            .map(|(_, rid)| *rid)
            .collect();
        Ok(self
            .state
            .roles
            .values()
            .filter(|role| ids.contains(&role.id))
            .cloned()
            .collect())
    }

    async fn get_or_create_role(&mut self, name: &str) -> DbResult<Role> {
        let role = self.state.roles.entry(name.to_string()).or_insert_with(|| {
            let new = NewRole::new(name);
            Role {
                id: new.id,
                name: new.name.to_string(),
            }
        });
        Ok(role.clone())
    }

    async fn attach_role(&mut self, group_id: &str, role_id: uuid::Uuid) -> DbResult<()> {
        self.state.links.insert((group_id.to_string(), role_id));
        Ok(())
    }

    async fn detach_role(&mut self, group_id: &str, role_id: uuid::Uuid) -> DbResult<()> {
        self.state.links.remove(&(group_id.to_string(), role_id));
        Ok(())
    }

    async fn delete_stale_groups(&mut self, sync_time: DateTime<Utc>) -> DbResult<usize> {
        let stale: HashSet<String> = self
            .state
            .groups
            .values()
            .filter(|g| g.last_sync_time != sync_time)
            .map(|g| g.id.clone())
            .collect();

        self.state.groups.retain(|id, _| !stale.contains(id));
        self.state.links.retain(|(gid, _)| !stale.contains(gid));
        for group in self.state.groups.values_mut() {
            if group.parent_id.as_ref().is_some_and(|p| stale.contains(p)) {
                group.parent_id = None;
            }
        }
        Ok(stale.len())
    }
}

#[async_trait]
impl GroupMirror for MemoryMirror {
    #[tracing::instrument(skip(self, plan), fields(groups = plan.groups.len(), sync_time = %plan.sync_time))]
    async fn apply_sync(&self, plan: &SyncPlan) -> DbResult<SyncSummary> {
        let mut state = self.state.lock().await;
        let mut tx = MemoryTx {
            state: state.clone(),
            upserts: 0,
            fail_at: self.take_failure(),
        };
        let summary = reconcile(&mut tx, plan).await?;
        tx.state.verify()?;
        *state = tx.state;
        Ok(summary)
    }

    async fn list_groups(&self) -> DbResult<Vec<GroupWithRoles>> {
        let state = self.state.lock().await;
        let mut groups: Vec<GroupWithRoles> = state
            .groups
            .values()
            .map(|group| GroupWithRoles {
                group: group.clone(),
                roles: state.role_names(&group.id),
            })
            .collect();
        groups.sort_by(|a, b| a.group.path.cmp(&b.group.path));
        Ok(groups)
    }

    async fn groups_by_ids(&self, ids: &[String]) -> DbResult<Vec<Group>> {
        let state = self.state.lock().await;
        let mut groups: Vec<Group> = ids
            .iter()
            .filter_map(|id| state.groups.get(id).cloned())
            .collect();
        groups.sort_by(|a, b| a.path.cmp(&b.path));
        groups.dedup_by(|a, b| a.id == b.id);
        Ok(groups)
    }
}
