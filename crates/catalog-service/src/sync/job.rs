use std::sync::Arc;

use catalog_db::mirror::GroupMirror;
use catalog_db::model::sync::{SyncPlan, SyncSummary};
use catalog_keycloak::GroupDirectory;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use super::flatten::{build_plan, flatten_group_tree};
use crate::error::ServiceResult;

/// Observable state of the sync job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncStatus {
    Idle,
    Running {
        started_at: DateTime<Utc>,
    },
    Succeeded {
        finished_at: DateTime<Utc>,
        summary: SyncSummary,
    },
    Failed {
        finished_at: DateTime<Utc>,
        error: String,
    },
}

/// Brings the local group mirror in line with the provider's group tree.
pub struct GroupSyncJob<D: GroupDirectory + ?Sized, M: GroupMirror + ?Sized> {
    directory: Arc<D>,
    mirror: Arc<M>,
    client_id: String,
    status: RwLock<SyncStatus>,
}

impl<D: GroupDirectory + ?Sized, M: GroupMirror + ?Sized> GroupSyncJob<D, M> {
    /// `client_id` selects which client's roles are mirrored.
    #[must_use]
    pub fn new(directory: Arc<D>, mirror: Arc<M>, client_id: impl Into<String>) -> Self {
        Self {
            directory,
            mirror,
            client_id: client_id.into(),
            status: RwLock::new(SyncStatus::Idle),
        }
    }

    pub async fn status(&self) -> SyncStatus {
        self.status.read().await.clone()
    }

    /// ## Summary
    /// Runs one full sync pass.
    ///
    /// The remote tree is fetched before the mirror is touched, and the
    /// mirror applies the result in one transaction, so a failure at any
    /// point leaves it unchanged. Safe to retry.
    ///
    /// ## Errors
    /// Returns a provider error if the group tree cannot be fetched, or a
    /// database error if the mirror rejects the update.
    #[tracing::instrument(skip(self), fields(client_id = %self.client_id))]
    pub async fn sync_external_groups(&self) -> ServiceResult<SyncSummary> {
        let plan = SyncPlan::now();
        *self.status.write().await = SyncStatus::Running {
            started_at: plan.sync_time,
        };
        tracing::info!(sync_time = %plan.sync_time, "Group sync started");

        let result = self.run(plan).await;

        let finished_at = Utc::now();
        let status = match &result {
            Ok(summary) => {
                tracing::info!(
                    created = summary.created,
                    updated = summary.updated,
                    unchanged = summary.unchanged,
                    deleted = summary.deleted,
                    roles_added = summary.roles_added,
                    roles_removed = summary.roles_removed,
                    "Group sync finished"
                );
                SyncStatus::Succeeded {
                    finished_at,
                    summary: *summary,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Group sync failed");
                SyncStatus::Failed {
                    finished_at,
                    error: e.to_string(),
                }
            }
        };
        *self.status.write().await = status;
        result
    }

    async fn run(&self, plan: SyncPlan) -> ServiceResult<SyncSummary> {
        let roots = self.directory.list_groups(false).await?;
        let plan = build_plan(flatten_group_tree(roots), &self.client_id, plan);
        tracing::debug!(groups = plan.groups.len(), "Remote group tree flattened");
        Ok(self.mirror.apply_sync(&plan).await?)
    }
}
