//! Remote resource registration and group sharing.
//!
//! A group's share on an object is a single UMA policy on the object's
//! resource, named by [`make_group_policy_name`], whose scopes are the
//! permissions granted to that group.

use std::collections::{BTreeMap, BTreeSet};

use catalog_core::constants::WILDCARD_RESOURCE_ID;
use catalog_db::model::group::Group;
use catalog_keycloak::{KeycloakError, ResourceRegistry, Scope, Uma2Resource, UmaPolicy};

use super::naming::{
    make_group_policy_name, make_scope_name, parse_group_policy_name, parse_scope_name,
};
use super::object::ProtectedObject;
use crate::error::{ServiceError, ServiceResult};

const POSITIVE_LOGIC: &str = "POSITIVE";

pub struct ResourceLifecycle<'a, R: ResourceRegistry + ?Sized> {
    registry: &'a R,
}

impl<'a, R: ResourceRegistry + ?Sized> ResourceLifecycle<'a, R> {
    #[must_use]
    pub fn new(registry: &'a R) -> Self {
        Self { registry }
    }

    /// ## Summary
    /// Returns the remote resource for `obj`, registering it first if needed.
    ///
    /// New resources carry the object's owner, type and every scope of its
    /// permission vocabulary.
    ///
    /// ## Errors
    /// Returns a provider error if the lookup or registration fails.
    #[tracing::instrument(skip(self, obj), fields(resource = %obj.resource_name()))]
    pub async fn create_resource_if_not_exists(
        &self,
        obj: &dyn ProtectedObject,
    ) -> ServiceResult<Uma2Resource> {
        let name = obj.resource_name();
        if let Some(existing) = self.registry.find_resource(&name).await? {
            tracing::trace!("Remote resource already registered");
            return Ok(existing);
        }

        let resource_type = obj.resource_type();
        let resource = Uma2Resource {
            name,
            owner: obj.owner().cloned(),
            resource_type: Some(resource_type.to_string()),
            scopes: obj
                .permission_vocabulary()
                .iter()
                .map(|permission| Scope::named(make_scope_name(resource_type, permission)))
                .collect(),
            owner_managed_access: obj.owner().is_some(),
            ..Uma2Resource::default()
        };
        Ok(self.registry.create_resource(&resource).await?)
    }

    /// ## Summary
    /// Grants `permissions` on `obj` to `group`.
    ///
    /// Granting permissions the group already holds writes nothing.
    ///
    /// ## Errors
    /// Returns `ValidationError` for permissions outside the object's
    /// vocabulary, or a provider error.
    #[tracing::instrument(skip(self, obj, group), fields(resource = %obj.resource_name(), group = %group.path))]
    pub async fn assign_group_permissions(
        &self,
        obj: &dyn ProtectedObject,
        group: &Group,
        permissions: &[String],
    ) -> ServiceResult<()> {
        let requested = requested_scopes(obj, permissions)?;
        let resource = self.create_resource_if_not_exists(obj).await?;
        let resource_id = registered_id(&resource)?;
        let policy_name = make_group_policy_name(&resource.name, &group.id);

        match self.find_share(resource_id, &policy_name).await? {
            None => {
                let policy = UmaPolicy {
                    id: None,
                    name: policy_name,
                    description: Some(format!("Shared with {}", group.path)),
                    scopes: requested,
                    groups: BTreeSet::from([group.path.clone()]),
                    logic: Some(POSITIVE_LOGIC.to_string()),
                };
                self.registry.create_policy(resource_id, &policy).await?;
                tracing::info!(scopes = ?policy.scopes, "Share created");
            }
            Some(mut policy) => {
                let before = (policy.scopes.len(), policy.groups.len());
                policy.scopes.extend(requested);
                policy.groups.insert(group.path.clone());
                if before == (policy.scopes.len(), policy.groups.len()) {
                    tracing::debug!("Share already grants requested permissions");
                    return Ok(());
                }
                self.registry.update_policy(&policy).await?;
                tracing::info!(scopes = ?policy.scopes, "Share extended");
            }
        }
        Ok(())
    }

    /// ## Summary
    /// Revokes `permissions` on `obj` from `group`.
    ///
    /// The share is deleted once it grants nothing. Revoking permissions that
    /// were never granted writes nothing.
    ///
    /// ## Errors
    /// Returns `ValidationError` for permissions outside the object's
    /// vocabulary, or a provider error.
    #[tracing::instrument(skip(self, obj, group), fields(resource = %obj.resource_name(), group = %group.path))]
    pub async fn remove_group_permissions(
        &self,
        obj: &dyn ProtectedObject,
        group: &Group,
        permissions: &[String],
    ) -> ServiceResult<()> {
        let revoked = requested_scopes(obj, permissions)?;
        let Some(resource) = self.registry.find_resource(&obj.resource_name()).await? else {
            tracing::debug!("Resource not registered, nothing to revoke");
            return Ok(());
        };
        let resource_id = registered_id(&resource)?;
        let policy_name = make_group_policy_name(&resource.name, &group.id);

        let Some(mut policy) = self.find_share(resource_id, &policy_name).await? else {
            tracing::debug!("No share for group, nothing to revoke");
            return Ok(());
        };

        let before = policy.scopes.len();
        policy.scopes.retain(|scope| !revoked.contains(scope));
        if policy.scopes.len() == before {
            return Ok(());
        }

        if policy.scopes.is_empty() {
            let policy_id = policy
                .id
                .as_deref()
                .ok_or_else(|| KeycloakError::MissingId(policy.name.clone()))?;
            self.registry.delete_policy(policy_id).await?;
            tracing::info!("Share removed");
        } else {
            self.registry.update_policy(&policy).await?;
            tracing::info!(scopes = ?policy.scopes, "Share reduced");
        }
        Ok(())
    }

    /// ## Summary
    /// Grants `permissions` on `obj` to each of `groups`.
    ///
    /// ## Errors
    /// Returns `ValidationError` before any write if a permission is unknown,
    /// or the first provider error.
    pub async fn add_group_permissions(
        &self,
        obj: &dyn ProtectedObject,
        groups: &[Group],
        permissions: &[String],
    ) -> ServiceResult<()> {
        requested_scopes(obj, permissions)?;
        for group in groups {
            self.assign_group_permissions(obj, group, permissions)
                .await?;
        }
        Ok(())
    }

    /// ## Summary
    /// Revokes `permissions` on `obj` from each of `groups`.
    ///
    /// ## Errors
    /// Returns `ValidationError` before any write if a permission is unknown,
    /// or the first provider error.
    pub async fn remove_group_permissions_for(
        &self,
        obj: &dyn ProtectedObject,
        groups: &[Group],
        permissions: &[String],
    ) -> ServiceResult<()> {
        requested_scopes(obj, permissions)?;
        for group in groups {
            self.remove_group_permissions(obj, group, permissions)
                .await?;
        }
        Ok(())
    }

    /// ## Summary
    /// The permissions shared on `obj`, by group id.
    ///
    /// An object that was never registered has no shares.
    ///
    /// ## Errors
    /// Returns a provider error if the resource or its policies cannot be read.
    #[tracing::instrument(skip(self, obj), fields(resource = %obj.resource_name()))]
    pub async fn get_group_permissions(
        &self,
        obj: &dyn ProtectedObject,
    ) -> ServiceResult<BTreeMap<String, Vec<String>>> {
        let mut shares = BTreeMap::new();
        let Some(resource) = self.registry.find_resource(&obj.resource_name()).await? else {
            return Ok(shares);
        };
        let resource_id = registered_id(&resource)?;

        for policy in self.registry.find_policies(resource_id, None).await? {
            let Some(group_id) = parse_group_policy_name(&resource.name, &policy.name) else {
                continue;
            };
            let permissions: Vec<String> = policy
                .scopes
                .iter()
                .filter_map(|scope| parse_scope_name(obj.resource_type(), scope))
                .map(str::to_string)
                .collect();
            if !permissions.is_empty() {
                shares.insert(group_id.to_string(), permissions);
            }
        }
        Ok(shares)
    }

    /// ## Summary
    /// Deletes the remote resource for `obj`, if one is registered.
    ///
    /// Returns whether a resource was deleted.
    ///
    /// ## Errors
    /// Returns a provider error if the lookup or deletion fails.
    #[tracing::instrument(skip(self, obj), fields(resource = %obj.resource_name()))]
    pub async fn delete_resource_if_exists(&self, obj: &dyn ProtectedObject) -> ServiceResult<bool> {
        let Some(resource) = self.registry.find_resource(&obj.resource_name()).await? else {
            return Ok(false);
        };
        self.registry
            .delete_resource(registered_id(&resource)?)
            .await?;
        tracing::info!("Remote resource deleted");
        Ok(true)
    }

    async fn find_share(
        &self,
        resource_id: &str,
        policy_name: &str,
    ) -> ServiceResult<Option<UmaPolicy>> {
        Ok(self
            .registry
            .find_policies(resource_id, Some(policy_name))
            .await?
            .into_iter()
            .next())
    }
}

/// Scope names for `permissions`, rejecting any outside the vocabulary.
///
/// The wildcard object stands for every object of its type and cannot be shared.
fn requested_scopes(
    obj: &dyn ProtectedObject,
    permissions: &[String],
) -> ServiceResult<BTreeSet<String>> {
    if obj.resource_id() == WILDCARD_RESOURCE_ID {
        return Err(ServiceError::ValidationError(format!(
            "{} is reserved and cannot be shared",
            obj.resource_name()
        )));
    }
    let vocabulary = obj.permission_vocabulary();
    if let Some(unknown) = permissions
        .iter()
        .find(|p| !vocabulary.contains(&p.as_str()))
    {
        return Err(ServiceError::ValidationError(format!(
            "unknown {} permission: {unknown}",
            obj.resource_type()
        )));
    }
    Ok(permissions
        .iter()
        .map(|p| make_scope_name(obj.resource_type(), p))
        .collect())
}

fn registered_id(resource: &Uma2Resource) -> ServiceResult<&str> {
    resource
        .id
        .as_deref()
        .ok_or_else(|| ServiceError::NoSuchRemoteResource(resource.name.clone()))
}
