//! Keycloak wire layer: UMA2 value types, discovery, tokens and the three
//! client capabilities (Admin, UMA2 protection, Authorization).
//!
//! ## Module Organization
//!
//! - `permission`: `resource#scope` permission strings
//! - `model`: provider JSON representations, normalized at parse time
//! - `api`: capability traits the service layer is written against
//! - `client`: reqwest-backed implementations of those traits

pub mod api;
pub mod client;
pub mod error;
pub mod model;
pub mod permission;

pub use api::{GroupDirectory, PermissionAuthority, ResourceRegistry};
pub use client::{
    AdminClient, AuthzClient, KeycloakConnection, OpenIdClient, ServiceAccountToken,
    Uma2ConfigSource, UmaClient,
};
pub use error::{KeycloakError, KeycloakResult};
pub use model::{
    RemoteGroup, ResourceOwner, Scope, TokenSet, Uma2Configuration, Uma2Resource, UmaPolicy,
};
pub use permission::AuthzPermission;
