use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A group as returned by the Admin API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub sub_groups: Vec<RemoteGroup>,
    /// Newer servers return children lazily and only report their count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_group_count: Option<u64>,
    /// Client id to role names; only present in full representations.
    #[serde(default)]
    pub client_roles: BTreeMap<String, Vec<String>>,
}

impl RemoteGroup {
    /// True when the server reported more children than it embedded.
    #[must_use]
    pub fn has_unfetched_children(&self) -> bool {
        self.sub_group_count
            .is_some_and(|count| count > self.sub_groups.len() as u64)
    }
}
