pub mod api;

use std::sync::Arc;

use salvo::Router;

use crate::config::{ConfigHandler, Settings};
use crate::keycloak_handler::{KeycloakContext, KeycloakHandler};
use crate::mirror_handler::MirrorHandler;
use crate::worker::{SyncHandle, SyncHandler};
use catalog_db::mirror::GroupMirror;

/// Process-wide dependencies injected into every request.
pub struct AppState {
    pub settings: Arc<Settings>,
    pub mirror: Arc<dyn GroupMirror>,
    pub keycloak: KeycloakContext,
    pub sync: SyncHandle,
}

/// ## Summary
/// Builds the root router with every shared dependency hooped in.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .hoop(ConfigHandler {
            settings: state.settings,
        })
        .hoop(MirrorHandler {
            mirror: state.mirror,
        })
        .hoop(KeycloakHandler {
            context: state.keycloak,
        })
        .hoop(SyncHandler { handle: state.sync })
        .push(api::routes())
}
