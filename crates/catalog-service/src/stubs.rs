//! In-process stand-ins for the provider capabilities.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use catalog_keycloak::{
    AuthzPermission, GroupDirectory, KeycloakError, KeycloakResult, PermissionAuthority,
    RemoteGroup, ResourceRegistry, Uma2Resource, UmaPolicy,
};

pub fn perm(encoded: &str) -> AuthzPermission {
    AuthzPermission::parse(encoded).unwrap()
}

/// Grants any batch containing at least one granted permission.
#[derive(Default)]
pub struct StubAuthority {
    pub granted: Vec<AuthzPermission>,
    /// Returned, filtered by scope, from `get_permissions`.
    pub listing: Vec<AuthzPermission>,
    /// Resources the provider has never heard of.
    pub unknown: BTreeSet<String>,
    pub checks: Mutex<Vec<Vec<AuthzPermission>>>,
    pub list_calls: AtomicUsize,
}

impl StubAuthority {
    pub fn granting(granted: &[&str]) -> Self {
        Self {
            granted: granted.iter().map(|p| perm(p)).collect(),
            ..Self::default()
        }
    }

    pub fn check_count(&self) -> usize {
        self.checks.lock().unwrap().len()
    }
}

#[async_trait]
impl PermissionAuthority for StubAuthority {
    async fn check_permissions(&self, permissions: &[AuthzPermission]) -> KeycloakResult<bool> {
        self.checks.lock().unwrap().push(permissions.to_vec());
        if let Some(p) = permissions.iter().find(|p| self.unknown.contains(p.resource())) {
            return Err(KeycloakError::InvalidResource(p.resource().to_string()));
        }
        Ok(permissions.iter().any(|p| self.granted.contains(p)))
    }

    async fn get_permissions(
        &self,
        filter: &AuthzPermission,
    ) -> KeycloakResult<Vec<AuthzPermission>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .listing
            .iter()
            .filter(|p| p.scope() == filter.scope())
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct RegistryState {
    resources: BTreeMap<String, Uma2Resource>,
    /// Policy id to (resource id, policy).
    policies: BTreeMap<String, (String, UmaPolicy)>,
    next_id: usize,
}

/// Remembers resources and policies the way the provider would.
#[derive(Default)]
pub struct StubRegistry {
    state: Mutex<RegistryState>,
    pub resource_creates: AtomicUsize,
    pub resource_deletes: AtomicUsize,
    pub policy_creates: AtomicUsize,
    pub policy_updates: AtomicUsize,
    pub policy_deletes: AtomicUsize,
}

impl StubRegistry {
    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn policies(&self) -> Vec<UmaPolicy> {
        self.state
            .lock()
            .unwrap()
            .policies
            .values()
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn resource(&self, name: &str) -> Option<Uma2Resource> {
        self.state.lock().unwrap().resources.get(name).cloned()
    }
}

#[async_trait]
impl ResourceRegistry for StubRegistry {
    async fn find_resource(&self, name: &str) -> KeycloakResult<Option<Uma2Resource>> {
        Ok(self.resource(name))
    }

    async fn create_resource(&self, resource: &Uma2Resource) -> KeycloakResult<Uma2Resource> {
        self.resource_creates.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let mut created = resource.clone();
        created.id = Some(format!("r-{}", state.next_id));
        state
            .resources
            .insert(created.name.clone(), created.clone());
        Ok(created)
    }

    async fn delete_resource(&self, resource_id: &str) -> KeycloakResult<()> {
        self.resource_deletes.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        state
            .resources
            .retain(|_, r| r.id.as_deref() != Some(resource_id));
        state.policies.retain(|_, (rid, _)| rid != resource_id);
        Ok(())
    }

    async fn find_policies(
        &self,
        resource_id: &str,
        name: Option<&str>,
    ) -> KeycloakResult<Vec<UmaPolicy>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .policies
            .values()
            .filter(|(rid, p)| rid == resource_id && name.is_none_or(|n| p.name == n))
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn create_policy(
        &self,
        resource_id: &str,
        policy: &UmaPolicy,
    ) -> KeycloakResult<UmaPolicy> {
        self.policy_creates.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("p-{}", state.next_id);
        let mut created = policy.clone();
        created.id = Some(id.clone());
        state
            .policies
            .insert(id, (resource_id.to_string(), created.clone()));
        Ok(created)
    }

    async fn update_policy(&self, policy: &UmaPolicy) -> KeycloakResult<()> {
        self.policy_updates.fetch_add(1, Ordering::SeqCst);
        let id = policy
            .id
            .clone()
            .ok_or_else(|| KeycloakError::MissingId(policy.name.clone()))?;
        let mut state = self.state.lock().unwrap();
        if let Some((_, stored)) = state.policies.get_mut(&id) {
            *stored = policy.clone();
        }
        Ok(())
    }

    async fn delete_policy(&self, policy_id: &str) -> KeycloakResult<()> {
        self.policy_deletes.fetch_add(1, Ordering::SeqCst);
        self.state.lock().unwrap().policies.remove(policy_id);
        Ok(())
    }
}

/// Serves a fixed group tree, or fails every call.
#[derive(Default)]
pub struct StubDirectory {
    pub groups: Mutex<Option<Vec<RemoteGroup>>>,
    pub calls: AtomicUsize,
}

impl StubDirectory {
    pub fn serving(groups: Vec<RemoteGroup>) -> Self {
        Self {
            groups: Mutex::new(Some(groups)),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, groups: Option<Vec<RemoteGroup>>) {
        *self.groups.lock().unwrap() = groups;
    }
}

#[async_trait]
impl GroupDirectory for StubDirectory {
    async fn list_groups(&self, brief: bool) -> KeycloakResult<Vec<RemoteGroup>> {
        assert!(!brief, "sync needs client roles");
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.groups.lock().unwrap().clone().ok_or(KeycloakError::Http {
            status: 503,
            url: "stub://groups".to_string(),
            body: String::new(),
        })
    }
}

/// A remote group with roles for `client_id`.
pub fn remote_group(
    id: &str,
    path: &str,
    client_id: &str,
    roles: &[&str],
    children: Vec<RemoteGroup>,
) -> RemoteGroup {
    let mut client_roles = BTreeMap::new();
    if !roles.is_empty() {
        client_roles.insert(
            client_id.to_string(),
            roles.iter().map(|r| (*r).to_string()).collect(),
        );
    }
    RemoteGroup {
        id: id.to_string(),
        name: path.rsplit('/').next().unwrap_or(path).to_string(),
        path: path.to_string(),
        sub_groups: children,
        client_roles,
        ..RemoteGroup::default()
    }
}
