//! Background group sync: a periodic timer plus on-demand triggers, drained
//! by a single task so runs never overlap within the process.

use std::sync::Arc;
use std::time::Duration;

use salvo::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::AppResult;
use catalog_core::config::SyncConfig;
use catalog_core::error::CoreError;
use catalog_db::mirror::GroupMirror;
use catalog_keycloak::GroupDirectory;
use catalog_service::sync::{GroupSyncJob, SyncStatus};

pub type SharedSyncJob = Arc<GroupSyncJob<dyn GroupDirectory, dyn GroupMirror>>;

/// Request side of the worker, shared with HTTP handlers.
#[derive(Clone)]
pub struct SyncHandle {
    sender: mpsc::Sender<()>,
    job: SharedSyncJob,
}

impl SyncHandle {
    /// ## Summary
    /// Queues a sync run. Returns false when the queue is full, in which
    /// case a queued run will already pick up the current remote state.
    pub fn trigger(&self) -> bool {
        match self.sender.try_send(()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(())) => {
                tracing::debug!("Sync already queued");
                false
            }
            Err(mpsc::error::TrySendError::Closed(())) => {
                tracing::warn!("Sync worker stopped, trigger dropped");
                false
            }
        }
    }

    pub async fn status(&self) -> SyncStatus {
        self.job.status().await
    }
}

pub struct GroupSyncWorker {
    job: SharedSyncJob,
    receiver: mpsc::Receiver<()>,
    interval: Option<Duration>,
    run_on_startup: bool,
}

impl GroupSyncWorker {
    #[must_use]
    pub fn new(job: SharedSyncJob, config: &SyncConfig) -> (Self, SyncHandle) {
        let (sender, receiver) = mpsc::channel(config.queue_depth.max(1));
        let interval = (config.interval_secs > 0).then(|| Duration::from_secs(config.interval_secs));
        let handle = SyncHandle {
            sender,
            job: Arc::clone(&job),
        };
        (
            Self {
                job,
                receiver,
                interval,
                run_on_startup: config.run_on_startup,
            },
            handle,
        )
    }

    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs until every [`SyncHandle`] is dropped.
    #[tracing::instrument(skip(self), fields(interval = ?self.interval))]
    pub async fn run(mut self) {
        tracing::info!("Group sync worker started");
        if self.run_on_startup {
            self.run_once("startup").await;
        }

        let mut ticker = self.interval.map(|period| {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        loop {
            tokio::select! {
                trigger = self.receiver.recv() => {
                    if trigger.is_none() {
                        break;
                    }
                    self.run_once("trigger").await;
                }
                _ = async {
                    match ticker.as_mut() {
                        Some(ticker) => ticker.tick().await,
                        None => std::future::pending().await,
                    }
                } => {
                    self.run_once("interval").await;
                }
            }
        }
        tracing::info!("Group sync worker stopped");
    }

    async fn run_once(&self, cause: &'static str) {
        tracing::debug!(cause, "Running group sync");
        // Failures are recorded in the job status; the worker keeps going.
        if let Err(e) = self.job.sync_external_groups().await {
            tracing::warn!(cause, error = %e, "Group sync run failed");
        }
    }
}

pub struct SyncHandler {
    pub handle: SyncHandle,
}

#[async_trait]
impl salvo::Handler for SyncHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(self.handle.clone());
    }
}

/// ## Summary
/// Retrieves the sync worker handle from the depot.
///
/// ## Errors
/// Returns an error if the handle is not found in the depot.
pub fn get_sync_from_depot(depot: &salvo::Depot) -> AppResult<SyncHandle> {
    depot
        .obtain::<SyncHandle>()
        .cloned()
        .map_err(|_err| CoreError::InvariantViolation("Sync handle not found in depot").into())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use catalog_db::mirror::MemoryMirror;
    use catalog_keycloak::{KeycloakResult, RemoteGroup};

    use super::*;

    struct OneGroup;

    #[async_trait]
    impl GroupDirectory for OneGroup {
        async fn list_groups(&self, _brief: bool) -> KeycloakResult<Vec<RemoteGroup>> {
            Ok(vec![RemoteGroup {
                id: "g1".to_string(),
                name: "Admins".to_string(),
                path: "/Admins".to_string(),
                ..RemoteGroup::default()
            }])
        }
    }

    fn job() -> (SharedSyncJob, Arc<MemoryMirror>) {
        let mirror = Arc::new(MemoryMirror::new());
        let directory: Arc<dyn GroupDirectory> = Arc::new(OneGroup);
        let mirror_dyn: Arc<dyn GroupMirror> = mirror.clone();
        (
            Arc::new(GroupSyncJob::new(directory, mirror_dyn, "catalog")),
            mirror,
        )
    }

    fn config(interval_secs: u64, run_on_startup: bool) -> SyncConfig {
        SyncConfig {
            interval_secs,
            queue_depth: 1,
            run_on_startup,
        }
    }

    async fn wait_for_success(handle: &SyncHandle) {
        for _ in 0..600 {
            if matches!(handle.status().await, SyncStatus::Succeeded { .. }) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("sync did not finish: {:?}", handle.status().await);
    }

    #[test_log::test(tokio::test)]
    async fn trigger_runs_sync() {
        let (job, mirror) = job();
        let (worker, handle) = GroupSyncWorker::new(job, &config(0, false));
        let task = worker.spawn();

        assert_eq!(handle.status().await, SyncStatus::Idle);
        assert!(handle.trigger());
        wait_for_success(&handle).await;

        let groups = mirror.list_groups().await.unwrap();
        let paths: BTreeSet<_> = groups.iter().map(|g| g.group.path.as_str()).collect();
        assert_eq!(paths, BTreeSet::from(["/Admins"]));

        drop(handle);
        task.await.unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn startup_run_happens_without_trigger() {
        let (job, _mirror) = job();
        let (worker, handle) = GroupSyncWorker::new(job, &config(0, true));
        let task = worker.spawn();

        wait_for_success(&handle).await;
        drop(handle);
        task.await.unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn full_queue_rejects_trigger() {
        let (job, _mirror) = job();
        // Not spawned: nothing drains the queue.
        let (_worker, handle) = GroupSyncWorker::new(job, &config(0, false));

        assert!(handle.trigger());
        assert!(!handle.trigger());
    }

    #[test_log::test(tokio::test)]
    async fn interval_drives_sync() {
        let (job, _mirror) = job();
        let (worker, handle) = GroupSyncWorker::new(job, &config(1, false));
        let task = worker.spawn();

        assert_eq!(handle.status().await, SyncStatus::Idle);
        wait_for_success(&handle).await;

        drop(handle);
        task.abort();
    }
}
