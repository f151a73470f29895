//! Access policy tables for the HTTP endpoints.

use catalog_service::authz::{AccessPolicies, ActionPolicies, KeycloakPolicy};

/// Resource type guarding the group mirror endpoints.
pub const GROUP_RESOURCE_TYPE: &str = "group";

/// Shared by every catalog kind; the resource type is the route's kind.
pub const CATALOG_ACTIONS: &[ActionPolicies] = &[
    ActionPolicies::new("permitted", &[KeycloakPolicy::queryset("read")]),
    ActionPolicies::new("share_info", &[KeycloakPolicy::object("read")]),
    ActionPolicies::new("share", &[KeycloakPolicy::object("update")]),
    ActionPolicies::new("unshare", &[KeycloakPolicy::object("update")]),
];

pub const GROUP_POLICIES: AccessPolicies = AccessPolicies::new(
    GROUP_RESOURCE_TYPE,
    &[
        ActionPolicies::new("list", &[KeycloakPolicy::wildcard("read")]),
        ActionPolicies::new("sync", &[KeycloakPolicy::wildcard("sync")]),
        ActionPolicies::new("sync_status", &[KeycloakPolicy::wildcard("read")]),
    ],
);
