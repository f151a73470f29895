use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A user-managed permission (UMA policy) attached to one resource.
///
/// Group shares are stored as one policy per (resource, group); the policy's
/// scopes are the permissions shared with that group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UmaPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub scopes: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub groups: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<String>,
}
