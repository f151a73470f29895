//! Permission checks against the identity provider.
//!
//! Object checks always carry the type's wildcard permission alongside the
//! object permission, so a type-wide grant satisfies them in one round trip.

use std::collections::HashSet;

use catalog_core::constants::WILDCARD_RESOURCE_ID;
use catalog_keycloak::{AuthzPermission, KeycloakError, PermissionAuthority};
use serde::Serialize;

use super::naming::{
    make_resource_name, make_scope_name, make_wildcard_resource_name, parse_resource_name,
};
use super::policy::{AccessPolicies, PolicyKind};
use crate::error::{ServiceError, ServiceResult};

/// Object ids visible to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermittedResourcesResult {
    /// Every object of the type is visible; `items` carries nothing.
    pub is_wildcard: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<String>>,
}

impl PermittedResourcesResult {
    #[must_use]
    pub const fn wildcard() -> Self {
        Self {
            is_wildcard: true,
            items: None,
        }
    }

    #[must_use]
    pub const fn items(items: Vec<String>) -> Self {
        Self {
            is_wildcard: false,
            items: Some(items),
        }
    }

    /// True if `id` is visible under this result.
    #[must_use]
    pub fn permits(&self, id: &str) -> bool {
        self.is_wildcard
            || self
                .items
                .as_ref()
                .is_some_and(|items| items.iter().any(|item| item == id))
    }
}

/// What the HTTP layer knows about an incoming request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequest {
    /// The resolved endpoint action; `None` for root/discovery endpoints.
    pub action: Option<String>,
    pub method: String,
    /// The client asked for the browsable (HTML) rendering.
    pub accepts_browsable: bool,
}

impl AccessRequest {
    #[must_use]
    pub fn new(action: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            action: Some(action.into()),
            method: method.into(),
            accepts_browsable: false,
        }
    }

    #[must_use]
    pub fn is_safe_method(&self) -> bool {
        matches!(
            self.method.to_ascii_uppercase().as_str(),
            "GET" | "HEAD" | "OPTIONS"
        )
    }

    fn declared_action(&self) -> ServiceResult<&str> {
        self.action
            .as_deref()
            .ok_or_else(|| ServiceError::PolicyNotDeclared("<unspecified>".to_string()))
    }
}

/// Evaluates access for one caller.
pub struct PermissionEvaluator<'a, A: PermissionAuthority + ?Sized> {
    authority: &'a A,
    debug: bool,
}

impl<'a, A: PermissionAuthority + ?Sized> PermissionEvaluator<'a, A> {
    #[must_use]
    pub fn new(authority: &'a A) -> Self {
        Self {
            authority,
            debug: false,
        }
    }

    /// Marks the process as running in development mode.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// ## Summary
    /// Does the caller hold `permission` on every object of `resource_type`?
    ///
    /// ## Errors
    /// Returns a provider error if the check cannot be made.
    #[tracing::instrument(skip(self))]
    pub async fn check_wildcard_permission(
        &self,
        resource_type: &str,
        permission: &str,
    ) -> ServiceResult<bool> {
        let wildcard = AuthzPermission::new(
            make_wildcard_resource_name(resource_type),
            make_scope_name(resource_type, permission),
        )?;
        let allowed = self.authority.check_permissions(&[wildcard]).await?;
        tracing::debug!(allowed, "Wildcard permission checked");
        Ok(allowed)
    }

    /// ## Summary
    /// Does the caller hold `permission` on object `id`, either directly or
    /// through the type's wildcard resource?
    ///
    /// An object never registered with the provider can only be reached
    /// through the wildcard grant.
    ///
    /// ## Errors
    /// Returns a provider error if the check cannot be made.
    #[tracing::instrument(skip(self))]
    pub async fn check_resource_permission(
        &self,
        resource_type: &str,
        id: &str,
        permission: &str,
    ) -> ServiceResult<bool> {
        let scope = make_scope_name(resource_type, permission);
        let candidates = [
            AuthzPermission::new(make_wildcard_resource_name(resource_type), scope.clone())?,
            AuthzPermission::new(make_resource_name(resource_type, id), scope)?,
        ];

        match self.authority.check_permissions(&candidates).await {
            Ok(allowed) => {
                tracing::debug!(allowed, "Object permission checked");
                Ok(allowed)
            }
            Err(KeycloakError::InvalidResource(reason)) => {
                tracing::debug!(%reason, "Object not registered, checking wildcard only");
                self.check_wildcard_permission(resource_type, permission)
                    .await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// ## Summary
    /// Lists the ids of `resource_type` objects the caller holds `permission` on.
    ///
    /// Stops at the first wildcard grant. Permissions on other types that
    /// share the scope name are ignored.
    ///
    /// ## Errors
    /// Returns a provider error if the permissions cannot be listed.
    #[tracing::instrument(skip(self))]
    pub async fn get_permitted_resources(
        &self,
        resource_type: &str,
        permission: &str,
    ) -> ServiceResult<PermittedResourcesResult> {
        let filter = AuthzPermission::for_scope(make_scope_name(resource_type, permission))?;
        let granted = self.authority.get_permissions(&filter).await?;

        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for granted in &granted {
            let Some((granted_type, id)) = parse_resource_name(granted.resource()) else {
                continue;
            };
            if granted_type != resource_type {
                continue;
            }
            if id == WILDCARD_RESOURCE_ID {
                tracing::debug!("Wildcard grant found");
                return Ok(PermittedResourcesResult::wildcard());
            }
            if seen.insert(id) {
                items.push(id.to_string());
            }
        }

        tracing::debug!(count = items.len(), "Permitted objects resolved");
        Ok(PermittedResourcesResult::items(items))
    }

    /// ## Summary
    /// Endpoint-level gate, run before any object is loaded.
    ///
    /// A wildcard policy on the action is checked here; actions gated only by
    /// object or queryset policies pass and are decided once the objects are
    /// known.
    ///
    /// ## Errors
    /// Returns `PolicyNotDeclared` if the action has no policies, or a
    /// provider error if a check cannot be made.
    pub async fn has_permission(
        &self,
        policies: &AccessPolicies,
        request: &AccessRequest,
    ) -> ServiceResult<bool> {
        if self.browsable_bypass(request) {
            return Ok(true);
        }
        let action = request.declared_action()?;
        match policies.get_permission(action, PolicyKind::Wildcard)? {
            Some(policy) => {
                self.check_wildcard_permission(policies.resource_type(), policy.permission)
                    .await
            }
            None => Ok(true),
        }
    }

    /// ## Summary
    /// Object-level gate for object `id`.
    ///
    /// Uses the action's object policy, or its wildcard policy when it has none.
    ///
    /// ## Errors
    /// Returns `PolicyNotDeclared` if neither is declared, or a provider
    /// error if a check cannot be made.
    pub async fn has_object_permission(
        &self,
        policies: &AccessPolicies,
        request: &AccessRequest,
        id: &str,
    ) -> ServiceResult<bool> {
        if self.browsable_bypass(request) {
            return Ok(true);
        }
        let action = request.declared_action()?;
        let resource_type = policies.resource_type();
        if let Some(policy) = policies.get_permission(action, PolicyKind::Object)? {
            return self
                .check_resource_permission(resource_type, id, policy.permission)
                .await;
        }
        if let Some(policy) = policies.get_permission(action, PolicyKind::Wildcard)? {
            return self
                .check_wildcard_permission(resource_type, policy.permission)
                .await;
        }
        Err(ServiceError::PolicyNotDeclared(action.to_string()))
    }

    /// ## Summary
    /// Visible object ids for a listing action.
    ///
    /// ## Errors
    /// Returns `PolicyNotDeclared` if the action has no queryset policy, or a
    /// provider error if the permissions cannot be listed.
    pub async fn permitted_for_action(
        &self,
        policies: &AccessPolicies,
        request: &AccessRequest,
    ) -> ServiceResult<PermittedResourcesResult> {
        let action = request.declared_action()?;
        let policy = policies
            .get_permission(action, PolicyKind::Queryset)?
            .ok_or_else(|| ServiceError::PolicyNotDeclared(action.to_string()))?;
        self.get_permitted_resources(policies.resource_type(), policy.permission)
            .await
    }

    #[cfg(any(test, feature = "browsable-bypass"))]
    fn browsable_bypass(&self, request: &AccessRequest) -> bool {
        let bypass = self.debug
            && request.action.is_none()
            && request.accepts_browsable
            && request.is_safe_method();
        if bypass {
            tracing::debug!("Browsable API request allowed in debug mode");
        }
        bypass
    }

    #[cfg(not(any(test, feature = "browsable-bypass")))]
    #[expect(clippy::unused_self, reason = "Matches the signature of the feature-enabled variant")]
    fn browsable_bypass(&self, _request: &AccessRequest) -> bool {
        false
    }
}
