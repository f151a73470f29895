//! Encoded permissions as used by the UMA ticket grant.
//!
//! A permission is written `resource#scope`. Either half may be empty, but
//! not both: `portfolio:42` asks for every scope of one resource and
//! `#portfolio:read` asks for one scope on every resource.

use catalog_core::constants::PERMISSION_SEPARATOR;

use crate::error::{KeycloakError, KeycloakResult};

/// A `(resource, scope)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AuthzPermission {
    resource: String,
    scope: String,
}

impl AuthzPermission {
    /// Builds a permission from its two halves.
    ///
    /// ## Errors
    /// Returns `MalformedPermission` if both halves are empty.
    pub fn new(resource: impl Into<String>, scope: impl Into<String>) -> KeycloakResult<Self> {
        let resource = resource.into();
        let scope = scope.into();
        if resource.is_empty() && scope.is_empty() {
            return Err(KeycloakError::MalformedPermission(String::new()));
        }
        Ok(Self { resource, scope })
    }

    /// A permission on every resource carrying `scope`.
    ///
    /// ## Errors
    /// Returns `MalformedPermission` if `scope` is empty.
    pub fn for_scope(scope: impl Into<String>) -> KeycloakResult<Self> {
        Self::new(String::new(), scope)
    }

    /// Parses `resource#scope`, splitting on the first separator.
    ///
    /// ## Errors
    /// Returns `MalformedPermission` if both halves are empty (`""` or `"#"`).
    pub fn parse(encoded: &str) -> KeycloakResult<Self> {
        let (resource, scope) = encoded
            .split_once(PERMISSION_SEPARATOR)
            .unwrap_or((encoded, ""));
        if resource.is_empty() && scope.is_empty() {
            return Err(KeycloakError::MalformedPermission(encoded.to_string()));
        }
        Ok(Self {
            resource: resource.to_string(),
            scope: scope.to_string(),
        })
    }

    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }
}

impl std::fmt::Display for AuthzPermission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.scope.is_empty() {
            f.write_str(&self.resource)
        } else {
            write!(f, "{}{PERMISSION_SEPARATOR}{}", self.resource, self.scope)
        }
    }
}

impl std::str::FromStr for AuthzPermission {
    type Err = KeycloakError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
