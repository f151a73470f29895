//! Provider JSON representations.
//!
//! Keycloak is loose about some shapes (an owner may be a bare id, a scope a
//! bare name). Those are resolved into one record type while deserializing.

pub mod discovery;
pub mod group;
pub mod policy;
pub mod resource;
pub mod token;

pub use discovery::Uma2Configuration;
pub use group::RemoteGroup;
pub use policy::UmaPolicy;
pub use resource::{ResourceOwner, Scope, Uma2Resource};
pub use token::{GrantedPermission, ProviderErrorBody, TokenSet};
