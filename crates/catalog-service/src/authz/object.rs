use catalog_core::types::CatalogKind;
use catalog_keycloak::ResourceOwner;

use super::naming::make_resource_name;

/// A local object mirrored as a UMA2 resource.
pub trait ProtectedObject: Send + Sync {
    /// Short type tag, e.g. `portfolio`.
    fn resource_type(&self) -> &str;

    fn resource_id(&self) -> &str;

    /// Identity recorded as the remote resource's owner.
    fn owner(&self) -> Option<&ResourceOwner>;

    /// Every permission defined for this object's type.
    fn permission_vocabulary(&self) -> &[&'static str];

    fn resource_name(&self) -> String {
        make_resource_name(self.resource_type(), self.resource_id())
    }
}

/// A catalog entity as seen by the authorization layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogObject {
    pub kind: CatalogKind,
    pub id: String,
    pub owner: Option<ResourceOwner>,
}

impl CatalogObject {
    #[must_use]
    pub fn new(kind: CatalogKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            owner: None,
        }
    }

    #[must_use]
    pub fn owned_by(mut self, owner: ResourceOwner) -> Self {
        self.owner = Some(owner);
        self
    }
}

impl ProtectedObject for CatalogObject {
    fn resource_type(&self) -> &str {
        self.kind.as_str()
    }

    fn resource_id(&self) -> &str {
        &self.id
    }

    fn owner(&self) -> Option<&ResourceOwner> {
        self.owner.as_ref()
    }

    fn permission_vocabulary(&self) -> &[&'static str] {
        self.kind.permissions()
    }
}
