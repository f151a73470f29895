mod catalog;
mod groups;
mod healthcheck;
pub mod policies;

use salvo::Router;

use crate::middleware::auth::CallerAuthority;

use catalog_core::constants::{API_ROUTE_COMPONENT, API_VERSION_COMPONENT};

/// ## Summary
/// Constructs the API router. Everything except the healthcheck requires a
/// caller token.
#[must_use]
pub fn routes() -> Router {
    Router::with_path(API_ROUTE_COMPONENT).push(
        Router::with_path(API_VERSION_COMPONENT)
            .push(healthcheck::routes())
            .push(
                Router::new()
                    .hoop(CallerAuthority)
                    // Literal segments before the `{kind}` catch-all.
                    .push(groups::routes())
                    .push(catalog::routes()),
            ),
    )
}
