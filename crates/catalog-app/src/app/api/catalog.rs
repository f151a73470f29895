//! Visibility and group sharing for catalog objects.

use std::collections::{BTreeSet, HashMap};

use salvo::{Depot, Request, Response, Router, handler, http::StatusCode, writing::Json};
use serde::{Deserialize, Serialize};

use super::policies::CATALOG_ACTIONS;
use crate::config::get_config_from_depot;
use crate::error::{AppError, AppResult};
use crate::keycloak_handler::get_keycloak_from_depot;
use crate::middleware::access::{
    AccessGate, ID_PARAM, PolicySource, get_access_from_depot, get_kind_from_depot,
};
use crate::middleware::auth::get_authority_from_depot;
use crate::mirror_handler::get_mirror_from_depot;
use catalog_core::types::CatalogKind;
use catalog_db::model::group::Group;
use catalog_service::authz::{
    CatalogObject, PermissionEvaluator, PermittedResourcesResult, ResourceLifecycle,
};
use catalog_service::error::ServiceError;

/// ## Summary
/// Share or unshare request payload
#[derive(Debug, Deserialize)]
pub struct ShareRequest {
    pub group_ids: Vec<String>,
    pub permissions: Vec<String>,
}

/// ## Summary
/// One group's share on an object
#[derive(Debug, Serialize)]
pub struct GroupShareResponse {
    pub group_id: String,
    /// `None` when the group has not been mirrored yet.
    pub group_name: Option<String>,
    pub group_path: Option<String>,
    pub permissions: Vec<String>,
}

const fn gate(action: &'static str) -> AccessGate {
    AccessGate::new(PolicySource::Catalog(CATALOG_ACTIONS), action)
}

fn object_id(req: &Request) -> AppResult<String> {
    req.param::<String>(ID_PARAM)
        .ok_or_else(|| AppError::InvalidRequest("missing object id".to_string()))
}

/// ## Summary
/// GET /api/v1/{kind}/permitted - Object ids of `kind` the caller may read
#[handler]
async fn permitted(depot: &mut Depot, res: &mut Response) {
    match list_permitted(depot).await {
        Ok(result) => res.render(Json(result)),
        Err(e) => e.render(res),
    }
}

async fn list_permitted(depot: &Depot) -> AppResult<PermittedResourcesResult> {
    let (policies, request) = get_access_from_depot(depot)?;
    let authority = get_authority_from_depot(depot)?;
    let settings = get_config_from_depot(depot)?;

    Ok(PermissionEvaluator::new(authority.as_ref())
        .with_debug(settings.server.debug)
        .permitted_for_action(&policies, &request)
        .await?)
}

/// ## Summary
/// GET /api/v1/{kind}/{id}/share_info - Groups the object is shared with
#[handler]
async fn share_info(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    match load_share_info(req, depot).await {
        Ok(shares) => res.render(Json(shares)),
        Err(e) => e.render(res),
    }
}

async fn load_share_info(req: &mut Request, depot: &Depot) -> AppResult<Vec<GroupShareResponse>> {
    let kind = get_kind_from_depot(depot)?;
    let object = CatalogObject::new(kind, object_id(req)?);
    let keycloak = get_keycloak_from_depot(depot)?;
    let mirror = get_mirror_from_depot(depot)?;

    let shares = ResourceLifecycle::new(keycloak.registry.as_ref())
        .get_group_permissions(&object)
        .await?;
    let ids: Vec<String> = shares.keys().cloned().collect();
    let groups: HashMap<String, Group> = mirror
        .groups_by_ids(&ids)
        .await?
        .into_iter()
        .map(|group| (group.id.clone(), group))
        .collect();

    Ok(shares
        .into_iter()
        .map(|(group_id, permissions)| {
            let group = groups.get(&group_id);
            GroupShareResponse {
                group_name: group.map(|g| g.name.clone()),
                group_path: group.map(|g| g.path.clone()),
                group_id,
                permissions,
            }
        })
        .collect())
}

/// ## Summary
/// POST /api/v1/{kind}/{id}/share - Grants permissions to groups
///
/// ## Errors
/// Returns HTTP 400 for an empty request or a permission that cannot be shared
/// Returns HTTP 404 if a group has not been mirrored
#[handler]
async fn share(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    match apply_share(req, depot, true).await {
        Ok(()) => {
            res.status_code(StatusCode::NO_CONTENT);
        }
        Err(e) => e.render(res),
    }
}

/// ## Summary
/// POST /api/v1/{kind}/{id}/unshare - Revokes permissions from groups
#[handler]
async fn unshare(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    match apply_share(req, depot, false).await {
        Ok(()) => {
            res.status_code(StatusCode::NO_CONTENT);
        }
        Err(e) => e.render(res),
    }
}

async fn apply_share(req: &mut Request, depot: &Depot, grant: bool) -> AppResult<()> {
    let kind = get_kind_from_depot(depot)?;
    let object = CatalogObject::new(kind, object_id(req)?);
    let body: ShareRequest = req
        .parse_json()
        .await
        .map_err(|e| AppError::InvalidRequest(e.to_string()))?;
    validate_share(kind, &body)?;

    let groups = resolve_groups(depot, &body.group_ids).await?;
    let keycloak = get_keycloak_from_depot(depot)?;
    let lifecycle = ResourceLifecycle::new(keycloak.registry.as_ref());
    if grant {
        lifecycle
            .add_group_permissions(&object, &groups, &body.permissions)
            .await?;
    } else {
        lifecycle
            .remove_group_permissions_for(&object, &groups, &body.permissions)
            .await?;
    }
    tracing::info!(
        object = %object.id,
        kind = %kind,
        grant,
        groups = groups.len(),
        "Object shares changed"
    );
    Ok(())
}

fn validate_share(kind: CatalogKind, body: &ShareRequest) -> AppResult<()> {
    if body.group_ids.is_empty() {
        return Err(ServiceError::ValidationError("group_ids must not be empty".into()).into());
    }
    if body.permissions.is_empty() {
        return Err(ServiceError::ValidationError("permissions must not be empty".into()).into());
    }
    let shareable = kind.shareable_permissions();
    if let Some(bad) = body
        .permissions
        .iter()
        .find(|p| !shareable.contains(&p.as_str()))
    {
        return Err(ServiceError::ValidationError(format!(
            "{bad:?} cannot be shared on {kind}, expected one of {shareable:?}"
        ))
        .into());
    }
    Ok(())
}

async fn resolve_groups(depot: &Depot, ids: &[String]) -> AppResult<Vec<Group>> {
    let wanted: BTreeSet<&str> = ids.iter().map(String::as_str).collect();
    let unique: Vec<String> = wanted.iter().map(|id| (*id).to_string()).collect();
    let groups = get_mirror_from_depot(depot)?.groups_by_ids(&unique).await?;

    let found: BTreeSet<&str> = groups.iter().map(|g| g.id.as_str()).collect();
    let missing: Vec<&str> = wanted.difference(&found).copied().collect();
    if !missing.is_empty() {
        return Err(ServiceError::NotFound(format!("groups {missing:?}")).into());
    }
    Ok(groups)
}

pub fn routes() -> Router {
    Router::with_path("{kind}")
        .push(
            Router::with_path("permitted")
                .hoop(gate("permitted"))
                .get(permitted),
        )
        .push(
            Router::with_path("{id}")
                .push(
                    Router::with_path("share_info")
                        .hoop(gate("share_info"))
                        .get(share_info),
                )
                .push(Router::with_path("share").hoop(gate("share")).post(share))
                .push(
                    Router::with_path("unshare")
                        .hoop(gate("unshare"))
                        .post(unshare),
                ),
        )
}
