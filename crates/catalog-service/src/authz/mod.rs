//! Keycloak-backed authorization for catalog objects.
//!
//! ## Module Organization
//!
//! - `naming`: remote resource, scope and share-policy names
//! - `object`: the local objects that are mirrored as UMA2 resources
//! - `policy`: per-endpoint access policy declarations
//! - `evaluator`: allow/deny decisions and visible-object filtering
//! - `lifecycle`: remote resource registration and group sharing

pub mod evaluator;
pub mod lifecycle;
pub mod naming;
pub mod object;
pub mod policy;

pub use evaluator::{AccessRequest, PermissionEvaluator, PermittedResourcesResult};
pub use lifecycle::ResourceLifecycle;
pub use object::{CatalogObject, ProtectedObject};
pub use policy::{AccessPolicies, ActionPolicies, KeycloakPolicy, PolicyKind};
