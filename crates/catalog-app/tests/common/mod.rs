#![allow(dead_code)]
//! Router fixture backed by a mocked token endpoint and in-memory stores.

use std::sync::{Arc, Mutex};

use catalog_app::app::{AppState, router};
use catalog_app::config::{
    DatabaseBackend, DatabaseConfig, KeycloakConfig, LoggingConfig, ServerConfig, Settings,
    SyncConfig,
};
use catalog_app::keycloak_handler::KeycloakContext;
use catalog_app::worker::GroupSyncWorker;
use catalog_db::mirror::{GroupMirror, MemoryMirror};
use catalog_keycloak::{
    GroupDirectory, KeycloakConnection, KeycloakError, KeycloakResult, RemoteGroup,
    ResourceRegistry, Uma2ConfigSource, Uma2Configuration, Uma2Resource, UmaPolicy,
};
use catalog_service::sync::GroupSyncJob;
use httptest::matchers::{contains, request, url_decoded};
use httptest::responders::{json_encoded, status_code};
use httptest::{Expectation, Server, all_of};
use salvo::Service;
use salvo::async_trait;
use serde_json::json;

pub const REALM: &str = "catalog";
pub const CLIENT_ID: &str = "catalog-api";
pub const TOKEN_PATH: &str = "/realms/catalog/protocol/openid-connect/token";
pub const USER_BEARER: &str = "Bearer user-token";
pub const BASE: &str = "http://127.0.0.1:5800/api/v1";

/// Resource registry holding everything in memory.
#[derive(Default)]
pub struct MemoryRegistry {
    pub resources: Mutex<Vec<Uma2Resource>>,
    /// `(resource id, policy)`
    pub policies: Mutex<Vec<(String, UmaPolicy)>>,
}

impl MemoryRegistry {
    pub fn policy(&self, name: &str) -> Option<UmaPolicy> {
        self.policies
            .lock()
            .unwrap()
            .iter()
            .find(|(_, p)| p.name == name)
            .map(|(_, p)| p.clone())
    }

    pub fn resource(&self, name: &str) -> Option<Uma2Resource> {
        self.resources
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.name == name)
            .cloned()
    }
}

#[async_trait]
impl ResourceRegistry for MemoryRegistry {
    async fn find_resource(&self, name: &str) -> KeycloakResult<Option<Uma2Resource>> {
        Ok(self.resource(name))
    }

    async fn create_resource(&self, resource: &Uma2Resource) -> KeycloakResult<Uma2Resource> {
        let mut resources = self.resources.lock().unwrap();
        let created = Uma2Resource {
            id: Some(format!("rs-{}", resources.len() + 1)),
            ..resource.clone()
        };
        resources.push(created.clone());
        Ok(created)
    }

    async fn delete_resource(&self, resource_id: &str) -> KeycloakResult<()> {
        self.resources
            .lock()
            .unwrap()
            .retain(|r| r.id.as_deref() != Some(resource_id));
        Ok(())
    }

    async fn find_policies(
        &self,
        resource_id: &str,
        name: Option<&str>,
    ) -> KeycloakResult<Vec<UmaPolicy>> {
        Ok(self
            .policies
            .lock()
            .unwrap()
            .iter()
            .filter(|(rid, p)| rid == resource_id && name.is_none_or(|n| p.name == n))
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn create_policy(
        &self,
        resource_id: &str,
        policy: &UmaPolicy,
    ) -> KeycloakResult<UmaPolicy> {
        let mut policies = self.policies.lock().unwrap();
        let created = UmaPolicy {
            id: Some(format!("pol-{}", policies.len() + 1)),
            ..policy.clone()
        };
        policies.push((resource_id.to_string(), created.clone()));
        Ok(created)
    }

    async fn update_policy(&self, policy: &UmaPolicy) -> KeycloakResult<()> {
        let mut policies = self.policies.lock().unwrap();
        let slot = policies
            .iter_mut()
            .find(|(_, p)| p.id == policy.id)
            .ok_or_else(|| KeycloakError::MissingId(policy.name.clone()))?;
        slot.1 = policy.clone();
        Ok(())
    }

    async fn delete_policy(&self, policy_id: &str) -> KeycloakResult<()> {
        self.policies
            .lock()
            .unwrap()
            .retain(|(_, p)| p.id.as_deref() != Some(policy_id));
        Ok(())
    }
}

/// Serves a fixed group tree.
pub struct FixedDirectory(pub Vec<RemoteGroup>);

#[async_trait]
impl GroupDirectory for FixedDirectory {
    async fn list_groups(&self, _brief: bool) -> KeycloakResult<Vec<RemoteGroup>> {
        Ok(self.0.clone())
    }
}

pub fn group(id: &str, name: &str, roles: &[&str]) -> RemoteGroup {
    RemoteGroup {
        id: id.to_string(),
        name: name.to_string(),
        path: format!("/{name}"),
        client_roles: [(
            CLIENT_ID.to_string(),
            roles.iter().map(ToString::to_string).collect(),
        )]
        .into(),
        ..RemoteGroup::default()
    }
}

fn settings(server: &Server) -> Settings {
    Settings {
        database: DatabaseConfig {
            backend: DatabaseBackend::Memory,
            url: String::new(),
            max_connections: 1,
            run_migrations: false,
        },
        keycloak: KeycloakConfig {
            url: format!("http://{}", server.addr()),
            realm: REALM.to_string(),
            client_id: CLIENT_ID.to_string(),
            client_secret: "s3cret".to_string(),
            timeout_secs: 5,
            uma2_discovery: false,
            uma2_configuration: None,
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5800,
            debug: false,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
        sync: SyncConfig {
            interval_secs: 0,
            queue_depth: 1,
            run_on_startup: false,
        },
    }
}

fn connection(server: &Server) -> Arc<KeycloakConnection> {
    let uma2: Uma2Configuration = serde_json::from_value(json!({
        "issuer": server.url_str("/realms/catalog"),
        "authorization_endpoint": server.url_str("/realms/catalog/protocol/openid-connect/auth"),
        "token_endpoint": server.url_str(TOKEN_PATH),
        "introspection_endpoint": server.url_str("/realms/catalog/protocol/openid-connect/token/introspect"),
        "registration_endpoint": server.url_str("/realms/catalog/clients-registrations/openid-connect"),
        "resource_registration_endpoint": server.url_str("/realms/catalog/authz/protection/resource_set"),
        "permission_endpoint": server.url_str("/realms/catalog/authz/protection/permission"),
        "policy_endpoint": server.url_str("/realms/catalog/authz/protection/uma-policy"),
    }))
    .unwrap();
    Arc::new(KeycloakConnection::new(
        reqwest::Client::new(),
        &format!("http://{}", server.addr()),
        REALM,
        CLIENT_ID,
        "s3cret",
        Arc::new(Uma2ConfigSource::fixed(uma2)),
    ))
}

pub struct TestApp {
    pub server: Server,
    pub service: Service,
    pub mirror: Arc<MemoryMirror>,
    pub registry: Arc<MemoryRegistry>,
}

impl TestApp {
    pub async fn start(remote_groups: Vec<RemoteGroup>) -> Self {
        let server = Server::run();
        let mirror = Arc::new(MemoryMirror::new());
        let registry = Arc::new(MemoryRegistry::default());

        let directory: Arc<dyn GroupDirectory> = Arc::new(FixedDirectory(remote_groups));
        let mirror_dyn: Arc<dyn GroupMirror> = mirror.clone();
        let settings = settings(&server);
        let job = Arc::new(GroupSyncJob::new(
            directory,
            Arc::clone(&mirror_dyn),
            CLIENT_ID,
        ));
        let (worker, sync) = GroupSyncWorker::new(job, &settings.sync);
        drop(worker.spawn());

        let registry_dyn: Arc<dyn ResourceRegistry> = registry.clone();
        let service = Service::new(router(AppState {
            keycloak: KeycloakContext {
                connection: connection(&server),
                registry: registry_dyn,
            },
            settings: Arc::new(settings),
            mirror: mirror_dyn,
            sync,
        }));

        Self {
            server,
            service,
            mirror,
            registry,
        }
    }

    /// Answers decision requests naming `permission` with `allowed`, at
    /// least once.
    pub fn expect_decision(&self, permission: &'static str, allowed: bool) {
        let matcher = all_of![
            request::method_path("POST", TOKEN_PATH),
            request::headers(contains(("authorization", USER_BEARER))),
            request::body(url_decoded(contains(("response_mode", "decision")))),
            request::body(url_decoded(contains(("permission", permission)))),
        ];
        let expectation = Expectation::matching(matcher).times(1..);
        self.server.expect(if allowed {
            expectation.respond_with(json_encoded(json!({"result": true})))
        } else {
            expectation.respond_with(
                status_code(403)
                    .append_header("Content-Type", "application/json")
                    .body(
                        json!({
                            "error": "access_denied",
                            "error_description": "not_authorized"
                        })
                        .to_string(),
                    ),
            )
        });
    }

    /// Answers one permission listing with `granted` (`[{rsname, scopes}]`).
    pub fn expect_permissions(&self, granted: serde_json::Value) {
        self.server.expect(
            Expectation::matching(all_of![
                request::method_path("POST", TOKEN_PATH),
                request::body(url_decoded(contains(("response_mode", "permissions")))),
            ])
            .respond_with(json_encoded(granted)),
        );
    }
}
