//! UMA2 resource representation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Owner of a registered resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceOwner {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ResourceOwner {
    #[must_use]
    pub fn new(id: impl Into<String>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
        }
    }
}

/// A scope attached to a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(
        rename = "iconUri",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub icon_uri: Option<String>,
}

impl Scope {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            icon_uri: None,
        }
    }
}

/// A resource registered with the provider's protection API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "wire::ResourceWire", into = "wire::ResourceWire")]
pub struct Uma2Resource {
    pub id: Option<String>,
    pub name: String,
    pub owner: Option<ResourceOwner>,
    pub uris: Vec<String>,
    pub resource_type: Option<String>,
    pub scopes: Vec<Scope>,
    pub icon_uri: Option<String>,
    pub display_name: Option<String>,
    pub attributes: BTreeMap<String, Vec<String>>,
    pub owner_managed_access: bool,
}

impl Uma2Resource {
    /// Names of every scope on this resource.
    pub fn scope_names(&self) -> impl Iterator<Item = &str> {
        self.scopes.iter().map(|s| s.name.as_str())
    }
}

mod wire {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Serialize};

    use super::{ResourceOwner, Scope, Uma2Resource};

    #[derive(Clone, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum OwnerRepr {
        Id(String),
        Record(ResourceOwner),
    }

    #[derive(Clone, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum ScopeRepr {
        Name(String),
        Record(Scope),
    }

    impl From<OwnerRepr> for ResourceOwner {
        fn from(repr: OwnerRepr) -> Self {
            match repr {
                OwnerRepr::Id(id) => Self { id, name: None },
                OwnerRepr::Record(owner) => owner,
            }
        }
    }

    impl From<ScopeRepr> for Scope {
        fn from(repr: ScopeRepr) -> Self {
            match repr {
                ScopeRepr::Name(name) => Self::named(name),
                ScopeRepr::Record(scope) => scope,
            }
        }
    }

    #[derive(Clone, Default, Serialize, Deserialize)]
    pub struct ResourceWire {
        #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
        pub id: Option<String>,
        pub name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub owner: Option<OwnerRepr>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub uris: Vec<String>,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        pub resource_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub resource_scopes: Option<Vec<ScopeRepr>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub scopes: Option<Vec<ScopeRepr>>,
        #[serde(rename = "icon_uri", default, skip_serializing_if = "Option::is_none")]
        pub icon_uri: Option<String>,
        #[serde(
            rename = "displayName",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        pub display_name: Option<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        pub attributes: BTreeMap<String, Vec<String>>,
        #[serde(rename = "ownerManagedAccess", default)]
        pub owner_managed_access: bool,
    }

    impl From<ResourceWire> for Uma2Resource {
        fn from(wire: ResourceWire) -> Self {
            let scopes = wire
                .resource_scopes
                .or(wire.scopes)
                .unwrap_or_default()
                .into_iter()
                .map(Scope::from)
                .collect();
            Self {
                id: wire.id,
                name: wire.name,
                owner: wire.owner.map(ResourceOwner::from),
                uris: wire.uris,
                resource_type: wire.resource_type,
                scopes,
                icon_uri: wire.icon_uri,
                display_name: wire.display_name,
                attributes: wire.attributes,
                owner_managed_access: wire.owner_managed_access,
            }
        }
    }

    impl From<Uma2Resource> for ResourceWire {
        fn from(resource: Uma2Resource) -> Self {
            Self {
                id: resource.id,
                name: resource.name,
                owner: resource.owner.map(OwnerRepr::Record),
                uris: resource.uris,
                resource_type: resource.resource_type,
                resource_scopes: Some(
                    resource.scopes.into_iter().map(ScopeRepr::Record).collect(),
                ),
                scopes: None,
                icon_uri: resource.icon_uri,
                display_name: resource.display_name,
                attributes: resource.attributes,
                owner_managed_access: resource.owner_managed_access,
            }
        }
    }
}
