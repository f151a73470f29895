//! Access policy declarations for protected endpoints.
//!
//! Each endpoint declares, per action, the Keycloak permissions that gate it.
//! The tables are static; an action missing from a table is rejected rather
//! than allowed.

use crate::error::{ServiceError, ServiceResult};

/// How a policy is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    /// Checked against the type's wildcard resource, before any object is loaded.
    Wildcard,
    /// Checked against one object (wildcard grants also satisfy it).
    Object,
    /// Turned into the set of visible object ids.
    Queryset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeycloakPolicy {
    pub permission: &'static str,
    pub kind: PolicyKind,
}

impl KeycloakPolicy {
    #[must_use]
    pub const fn wildcard(permission: &'static str) -> Self {
        Self {
            permission,
            kind: PolicyKind::Wildcard,
        }
    }

    #[must_use]
    pub const fn object(permission: &'static str) -> Self {
        Self {
            permission,
            kind: PolicyKind::Object,
        }
    }

    #[must_use]
    pub const fn queryset(permission: &'static str) -> Self {
        Self {
            permission,
            kind: PolicyKind::Queryset,
        }
    }
}

/// The policies declared for one action.
#[derive(Debug, Clone, Copy)]
pub struct ActionPolicies {
    pub action: &'static str,
    pub policies: &'static [KeycloakPolicy],
}

impl ActionPolicies {
    #[must_use]
    pub const fn new(action: &'static str, policies: &'static [KeycloakPolicy]) -> Self {
        Self { action, policies }
    }
}

/// The policy table of one protected endpoint.
#[derive(Debug, Clone, Copy)]
pub struct AccessPolicies {
    resource_type: &'static str,
    actions: &'static [ActionPolicies],
}

impl AccessPolicies {
    #[must_use]
    pub const fn new(resource_type: &'static str, actions: &'static [ActionPolicies]) -> Self {
        Self {
            resource_type,
            actions,
        }
    }

    #[must_use]
    pub const fn resource_type(&self) -> &'static str {
        self.resource_type
    }

    /// ## Summary
    /// Returns every policy declared for `action`.
    ///
    /// ## Errors
    /// Returns `PolicyNotDeclared` if the action has no entry.
    pub fn policies_for(&self, action: &str) -> ServiceResult<&'static [KeycloakPolicy]> {
        self.actions
            .iter()
            .find(|entry| entry.action == action)
            .map(|entry| entry.policies)
            .filter(|policies| !policies.is_empty())
            .ok_or_else(|| ServiceError::PolicyNotDeclared(action.to_string()))
    }

    /// ## Summary
    /// Resolves the policy of `kind` declared for `action`.
    ///
    /// `Ok(None)` means the action is declared but not gated by that kind.
    ///
    /// ## Errors
    /// Returns `PolicyNotDeclared` if the action has no entry.
    pub fn get_permission(
        &self,
        action: &str,
        kind: PolicyKind,
    ) -> ServiceResult<Option<&'static KeycloakPolicy>> {
        Ok(self
            .policies_for(action)?
            .iter()
            .find(|policy| policy.kind == kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICIES: AccessPolicies = AccessPolicies::new(
        "portfolio",
        &[
            ActionPolicies::new("list", &[KeycloakPolicy::queryset("read")]),
            ActionPolicies::new(
                "retrieve",
                &[KeycloakPolicy::object("read"), KeycloakPolicy::wildcard("read")],
            ),
            ActionPolicies::new("create", &[KeycloakPolicy::wildcard("create")]),
            ActionPolicies::new("copy", &[]),
        ],
    );

    #[test]
    fn resolves_policy_by_kind() {
        let policy = POLICIES
            .get_permission("retrieve", PolicyKind::Object)
            .unwrap()
            .unwrap();
        assert_eq!(policy.permission, "read");
        assert!(
            POLICIES
                .get_permission("create", PolicyKind::Object)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn undeclared_action_is_not_allowed() {
        let err = POLICIES
            .get_permission("destroy", PolicyKind::Wildcard)
            .unwrap_err();
        assert!(matches!(err, ServiceError::PolicyNotDeclared(action) if action == "destroy"));
    }

    #[test]
    fn empty_policy_list_counts_as_undeclared() {
        assert!(matches!(
            POLICIES.policies_for("copy"),
            Err(ServiceError::PolicyNotDeclared(_))
        ));
    }
}
