//! Capability traits for the three provider APIs.
//!
//! The service layer depends on these rather than on the concrete clients so
//! evaluators, lifecycle managers and the sync job can run against stubs.

use async_trait::async_trait;

use crate::error::KeycloakResult;
use crate::model::{RemoteGroup, Uma2Resource, UmaPolicy};
use crate::permission::AuthzPermission;

/// Admin API: the realm's group tree.
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    /// Every root group with its `sub_groups` filled in recursively. When
    /// `brief` is false, `client_roles` is populated as well.
    async fn list_groups(&self, brief: bool) -> KeycloakResult<Vec<RemoteGroup>>;
}

/// UMA2 protection API: resource registration and user-managed policies.
#[async_trait]
pub trait ResourceRegistry: Send + Sync {
    async fn find_resource(&self, name: &str) -> KeycloakResult<Option<Uma2Resource>>;

    /// Registers a resource. Not idempotent; callers look it up first.
    async fn create_resource(&self, resource: &Uma2Resource) -> KeycloakResult<Uma2Resource>;

    async fn delete_resource(&self, resource_id: &str) -> KeycloakResult<()>;

    async fn find_policies(
        &self,
        resource_id: &str,
        name: Option<&str>,
    ) -> KeycloakResult<Vec<UmaPolicy>>;

    async fn create_policy(
        &self,
        resource_id: &str,
        policy: &UmaPolicy,
    ) -> KeycloakResult<UmaPolicy>;

    async fn update_policy(&self, policy: &UmaPolicy) -> KeycloakResult<()>;

    async fn delete_policy(&self, policy_id: &str) -> KeycloakResult<()>;
}

/// Authorization API, evaluated for the caller's bearer token.
#[async_trait]
pub trait PermissionAuthority: Send + Sync {
    /// Asks the provider for a decision over `permissions` in one request.
    async fn check_permissions(&self, permissions: &[AuthzPermission]) -> KeycloakResult<bool>;

    /// Every permission the caller holds that matches `filter`.
    async fn get_permissions(
        &self,
        filter: &AuthzPermission,
    ) -> KeycloakResult<Vec<AuthzPermission>>;
}
