use salvo::{Depot, Response, Router, handler, http::StatusCode, writing::Json};
use serde::Serialize;

use super::policies::GROUP_POLICIES;
use crate::error::AppResult;
use crate::middleware::access::{AccessGate, PolicySource};
use crate::mirror_handler::get_mirror_from_depot;
use crate::worker::get_sync_from_depot;
use catalog_core::constants::{
    GROUP_SYNC_ROUTE, GROUP_SYNC_ROUTE_COMPONENT, GROUPS_ROUTE_COMPONENT,
};
use catalog_db::model::group::GroupWithRoles;

/// ## Summary
/// Sync trigger response payload
#[derive(Debug, Serialize)]
pub struct SyncQueuedResponse {
    /// False when a run was already queued.
    pub queued: bool,
}

const fn gate(action: &'static str) -> AccessGate {
    AccessGate::new(PolicySource::Fixed(GROUP_POLICIES), action)
}

/// ## Summary
/// GET /api/v1/groups - Mirrored groups with their roles
#[handler]
async fn list_groups(depot: &mut Depot, res: &mut Response) {
    match load_groups(depot).await {
        Ok(groups) => res.render(Json(groups)),
        Err(e) => e.render(res),
    }
}

async fn load_groups(depot: &Depot) -> AppResult<Vec<GroupWithRoles>> {
    Ok(get_mirror_from_depot(depot)?.list_groups().await?)
}

/// ## Summary
/// POST /api/v1/groups/sync - Queues a group sync run
///
/// `Location` points at the status endpoint for the queued run.
#[handler]
async fn trigger_sync(depot: &mut Depot, res: &mut Response) {
    match get_sync_from_depot(depot) {
        Ok(sync) => {
            res.status_code(StatusCode::ACCEPTED);
            if res.add_header("Location", GROUP_SYNC_ROUTE, true).is_err() {
                tracing::warn!("Failed to set Location header on sync response");
            }
            res.render(Json(SyncQueuedResponse {
                queued: sync.trigger(),
            }));
        }
        Err(e) => e.render(res),
    }
}

/// ## Summary
/// GET /api/v1/groups/sync - State of the last sync run
#[handler]
async fn sync_status(depot: &mut Depot, res: &mut Response) {
    match get_sync_from_depot(depot) {
        Ok(sync) => res.render(Json(sync.status().await)),
        Err(e) => e.render(res),
    }
}

pub fn routes() -> Router {
    Router::with_path(GROUPS_ROUTE_COMPONENT)
        .push(Router::new().hoop(gate("list")).get(list_groups))
        .push(
            Router::with_path(GROUP_SYNC_ROUTE_COMPONENT)
                .push(Router::new().hoop(gate("sync")).post(trigger_sync))
                .push(Router::new().hoop(gate("sync_status")).get(sync_status)),
        )
}
