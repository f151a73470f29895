use salvo::async_trait;
use std::sync::Arc;

use crate::error::AppResult;
use catalog_core::error::CoreError;
use catalog_db::mirror::GroupMirror;

pub struct MirrorHandler {
    pub mirror: Arc<dyn GroupMirror>,
}

#[async_trait]
impl salvo::Handler for MirrorHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(Arc::clone(&self.mirror));
    }
}

/// ## Summary
/// Retrieves the group mirror from the depot.
///
/// ## Errors
/// Returns an error if the group mirror is not found in the depot.
pub fn get_mirror_from_depot(depot: &salvo::Depot) -> AppResult<Arc<dyn GroupMirror>> {
    depot
        .obtain::<Arc<dyn GroupMirror>>()
        .cloned()
        .map_err(|_err| CoreError::InvariantViolation("Group mirror not found in depot").into())
}
