//! Endpoint gate: resolves the policy table for the route and runs the
//! endpoint-level and object-level checks before the handler.

use salvo::Depot;
use salvo::http::header::ACCEPT;

use crate::config::get_config_from_depot;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::get_authority_from_depot;
use catalog_core::types::CatalogKind;
use catalog_service::authz::{AccessPolicies, AccessRequest, ActionPolicies, PermissionEvaluator};
use catalog_service::error::ServiceError;

/// Route parameter holding the plural catalog kind.
pub const KIND_PARAM: &str = "kind";
/// Route parameter holding an object id.
pub const ID_PARAM: &str = "id";

/// Where the gate finds its policy table.
#[derive(Debug, Clone, Copy)]
pub enum PolicySource {
    /// One table shared by every catalog kind; the resource type comes from
    /// the `kind` route parameter.
    Catalog(&'static [ActionPolicies]),
    Fixed(AccessPolicies),
}

pub struct AccessGate {
    pub source: PolicySource,
    pub action: &'static str,
}

impl AccessGate {
    #[must_use]
    pub const fn new(source: PolicySource, action: &'static str) -> Self {
        Self { source, action }
    }

    fn resolve(&self, req: &salvo::Request, depot: &mut Depot) -> AppResult<AccessPolicies> {
        match self.source {
            PolicySource::Fixed(policies) => Ok(policies),
            PolicySource::Catalog(actions) => {
                let segment = req.param::<String>(KIND_PARAM).unwrap_or_default();
                let kind = CatalogKind::from_route_segment(&segment)
                    .ok_or_else(|| AppError::NotFound(format!("unknown collection {segment:?}")))?;
                depot.inject(kind);
                Ok(AccessPolicies::new(kind.as_str(), actions))
            }
        }
    }

    async fn check(&self, req: &mut salvo::Request, depot: &mut Depot) -> AppResult<()> {
        let policies = self.resolve(req, depot)?;
        let object_id = req.param::<String>(ID_PARAM);
        let request = AccessRequest {
            accepts_browsable: accepts_html(req),
            ..AccessRequest::new(self.action, req.method().as_str())
        };
        let settings = get_config_from_depot(depot)?;
        let authority = get_authority_from_depot(depot)?;
        let evaluator =
            PermissionEvaluator::new(authority.as_ref()).with_debug(settings.server.debug);

        if !evaluator.has_permission(&policies, &request).await? {
            return Err(ServiceError::PermissionDenied(self.action.to_string()).into());
        }
        if let Some(id) = object_id
            && !evaluator
                .has_object_permission(&policies, &request, &id)
                .await?
        {
            return Err(ServiceError::PermissionDenied(format!("{} on {id}", self.action)).into());
        }

        depot.inject(policies);
        depot.inject(request);
        Ok(())
    }
}

fn accepts_html(req: &salvo::Request) -> bool {
    req.headers()
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("text/html"))
}

#[salvo::async_trait]
impl salvo::Handler for AccessGate {
    #[tracing::instrument(skip(self, req, depot, res, ctrl), fields(
        action = self.action,
        path = %req.uri().path()
    ))]
    async fn handle(
        &self,
        req: &mut salvo::Request,
        depot: &mut Depot,
        res: &mut salvo::Response,
        ctrl: &mut salvo::FlowCtrl,
    ) {
        if let Err(e) = self.check(req, depot).await {
            e.render(res);
            ctrl.skip_rest();
            return;
        }
        tracing::trace!("Access granted");
    }
}

/// ## Summary
/// Retrieves the catalog kind resolved by the gate.
///
/// ## Errors
/// Returns an error if the route was not gated by a catalog policy table.
pub fn get_kind_from_depot(depot: &Depot) -> AppResult<CatalogKind> {
    depot.obtain::<CatalogKind>().copied().map_err(|_err| {
        catalog_core::error::CoreError::InvariantViolation("Catalog kind not found in depot").into()
    })
}

/// ## Summary
/// Retrieves the policy table and request resolved by the gate.
///
/// ## Errors
/// Returns an error if the route was not gated.
pub fn get_access_from_depot(depot: &Depot) -> AppResult<(AccessPolicies, AccessRequest)> {
    let policies = depot
        .obtain::<AccessPolicies>()
        .copied()
        .map_err(missing_access)?;
    let request = depot
        .obtain::<AccessRequest>()
        .cloned()
        .map_err(missing_access)?;
    Ok((policies, request))
}

fn missing_access<E>(_err: E) -> AppError {
    catalog_core::error::CoreError::InvariantViolation("Access request not found in depot").into()
}
