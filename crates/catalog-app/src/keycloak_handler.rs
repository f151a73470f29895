//! Provider clients shared by every request.

use salvo::async_trait;
use std::sync::Arc;

use crate::error::AppResult;
use catalog_core::error::CoreError;
use catalog_keycloak::{KeycloakConnection, ResourceRegistry};

/// Service-account side of the provider. Caller-scoped clients are built
/// per request from `connection`.
#[derive(Clone)]
pub struct KeycloakContext {
    pub connection: Arc<KeycloakConnection>,
    pub registry: Arc<dyn ResourceRegistry>,
}

pub struct KeycloakHandler {
    pub context: KeycloakContext,
}

#[async_trait]
impl salvo::Handler for KeycloakHandler {
    #[tracing::instrument(skip(self, _req, depot, _res, _ctrl))]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(self.context.clone());
    }
}

/// ## Summary
/// Retrieves the provider clients from the depot.
///
/// ## Errors
/// Returns an error if the provider clients are not found in the depot.
pub fn get_keycloak_from_depot(depot: &salvo::Depot) -> AppResult<KeycloakContext> {
    depot
        .obtain::<KeycloakContext>()
        .cloned()
        .map_err(|_err| CoreError::InvariantViolation("Keycloak context not found in depot").into())
}
