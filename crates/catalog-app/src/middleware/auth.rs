use std::sync::Arc;

use salvo::Depot;
use salvo::http::header::AUTHORIZATION;

use crate::error::{AppError, AppResult};
use crate::keycloak_handler::get_keycloak_from_depot;
use catalog_core::error::CoreError;
use catalog_keycloak::{AuthzClient, PermissionAuthority};

const BEARER_PREFIX: &str = "Bearer ";

/// ## Summary
/// Binds the caller's bearer token to an authorization client and stores it
/// in the depot. Requests without a token are rejected with 401.
pub struct CallerAuthority;

fn bearer_token(req: &salvo::Request) -> Option<&str> {
    req.headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[salvo::async_trait]
impl salvo::Handler for CallerAuthority {
    #[tracing::instrument(skip(self, req, depot, res, ctrl), fields(
        method = %req.method(),
        path = %req.uri().path()
    ))]
    async fn handle(
        &self,
        req: &mut salvo::Request,
        depot: &mut Depot,
        res: &mut salvo::Response,
        ctrl: &mut salvo::FlowCtrl,
    ) {
        let Some(token) = bearer_token(req) else {
            tracing::debug!("Request carries no bearer token");
            AppError::NotAuthenticated.render(res);
            ctrl.skip_rest();
            return;
        };

        let keycloak = match get_keycloak_from_depot(depot) {
            Ok(keycloak) => keycloak,
            Err(e) => {
                e.render(res);
                ctrl.skip_rest();
                return;
            }
        };

        let authority: Arc<dyn PermissionAuthority> =
            Arc::new(AuthzClient::new(keycloak.connection, token));
        depot.inject(authority);
    }
}

/// ## Summary
/// Retrieves the caller's authorization client from the depot.
///
/// ## Errors
/// Returns an error if no caller was bound to this request.
pub fn get_authority_from_depot(depot: &Depot) -> AppResult<Arc<dyn PermissionAuthority>> {
    depot
        .obtain::<Arc<dyn PermissionAuthority>>()
        .cloned()
        .map_err(|_err| {
            CoreError::InvariantViolation("Caller authority not found in depot").into()
        })
}
