//! Names shared with the identity provider.
//!
//! Resources are `{type}:{id}`, scopes are `{type}:{permission}` and the
//! share policy for a group on a resource is `{resource}/group:{group_id}`.
//! Types never contain the separator; ids may.

use catalog_core::constants::{NAME_SEPARATOR, WILDCARD_RESOURCE_ID};

const GROUP_POLICY_MARKER: &str = "/group:";

#[must_use]
pub fn make_resource_name(resource_type: &str, id: &str) -> String {
    format!("{resource_type}{NAME_SEPARATOR}{id}")
}

#[must_use]
pub fn make_scope_name(resource_type: &str, permission: &str) -> String {
    format!("{resource_type}{NAME_SEPARATOR}{permission}")
}

#[must_use]
pub fn make_wildcard_resource_name(resource_type: &str) -> String {
    make_resource_name(resource_type, WILDCARD_RESOURCE_ID)
}

/// ## Summary
/// Splits a resource name into `(type, id)` at the first separator.
///
/// Returns `None` when there is no separator or the type is empty.
#[must_use]
pub fn parse_resource_name(name: &str) -> Option<(&str, &str)> {
    name.split_once(NAME_SEPARATOR)
        .filter(|(resource_type, _)| !resource_type.is_empty())
}

/// The permission half of a scope name, if it belongs to `resource_type`.
#[must_use]
pub fn parse_scope_name<'a>(resource_type: &str, scope: &'a str) -> Option<&'a str> {
    scope
        .strip_prefix(resource_type)
        .and_then(|rest| rest.strip_prefix(NAME_SEPARATOR))
}

#[must_use]
pub fn make_group_policy_name(resource_name: &str, group_id: &str) -> String {
    format!("{resource_name}{GROUP_POLICY_MARKER}{group_id}")
}

/// The group id of a share policy on `resource_name`.
#[must_use]
pub fn parse_group_policy_name<'a>(resource_name: &str, policy_name: &'a str) -> Option<&'a str> {
    policy_name
        .strip_prefix(resource_name)
        .and_then(|rest| rest.strip_prefix(GROUP_POLICY_MARKER))
        .filter(|group_id| !group_id.is_empty())
}
