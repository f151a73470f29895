#![allow(dead_code)]
//! Shared fixtures for provider wire tests.

use std::sync::Arc;

use catalog_keycloak::{KeycloakConnection, Uma2ConfigSource, Uma2Configuration};
use httptest::matchers::{contains, request, url_decoded};
use httptest::responders::{Responder, json_encoded, status_code};
use httptest::{Expectation, Server, all_of};
use serde_json::json;

pub const REALM: &str = "catalog";
pub const CLIENT_ID: &str = "catalog-api";
pub const CLIENT_SECRET: &str = "s3cret";

pub const DISCOVERY_PATH: &str = "/realms/catalog/.well-known/uma2-configuration";
pub const TOKEN_PATH: &str = "/realms/catalog/protocol/openid-connect/token";
pub const RESOURCE_SET_PATH: &str = "/realms/catalog/authz/protection/resource_set";
pub const POLICY_PATH: &str = "/realms/catalog/authz/protection/uma-policy";
pub const ADMIN_GROUPS_PATH: &str = "/admin/realms/catalog/groups";

pub const SERVICE_TOKEN: &str = "service-token";
pub const SERVICE_BEARER: &str = "Bearer service-token";

pub fn base_url(server: &Server) -> String {
    format!("http://{}", server.addr())
}

/// The UMA2 document a realm on `server` would publish.
pub fn uma2_document(server: &Server) -> serde_json::Value {
    json!({
        "issuer": server.url_str("/realms/catalog"),
        "authorization_endpoint": server.url_str("/realms/catalog/protocol/openid-connect/auth"),
        "token_endpoint": server.url_str(TOKEN_PATH),
        "introspection_endpoint": server.url_str("/realms/catalog/protocol/openid-connect/token/introspect"),
        "end_session_endpoint": server.url_str("/realms/catalog/protocol/openid-connect/logout"),
        "registration_endpoint": server.url_str("/realms/catalog/clients-registrations/openid-connect"),
        "resource_registration_endpoint": server.url_str(RESOURCE_SET_PATH),
        "permission_endpoint": server.url_str("/realms/catalog/authz/protection/permission"),
        "policy_endpoint": server.url_str(POLICY_PATH),
        "jwks_uri": server.url_str("/realms/catalog/protocol/openid-connect/certs"),
    })
}

fn connection(server: &Server, source: Uma2ConfigSource) -> Arc<KeycloakConnection> {
    Arc::new(KeycloakConnection::new(
        reqwest::Client::new(),
        &base_url(server),
        REALM,
        CLIENT_ID,
        CLIENT_SECRET,
        Arc::new(source),
    ))
}

/// A connection using statically supplied endpoints (no discovery request).
pub fn static_connection(server: &Server) -> Arc<KeycloakConnection> {
    let config: Uma2Configuration =
        serde_json::from_value(uma2_document(server)).expect("valid UMA2 document");
    connection(server, Uma2ConfigSource::fixed(config))
}

/// A connection that discovers endpoints from `server`.
pub fn discovering_connection(server: &Server) -> Arc<KeycloakConnection> {
    connection(server, Uma2ConfigSource::discover())
}

/// Expects exactly one discovery request.
pub fn expect_discovery(server: &Server) {
    server.expect(
        Expectation::matching(request::method_path("GET", DISCOVERY_PATH))
            .respond_with(json_encoded(uma2_document(server))),
    );
}

/// Expects exactly one client credentials grant.
pub fn expect_service_token(server: &Server) {
    server.expect(
        Expectation::matching(all_of![
            request::method_path("POST", TOKEN_PATH),
            request::body(url_decoded(contains(("grant_type", "client_credentials")))),
            request::body(url_decoded(contains(("client_id", CLIENT_ID)))),
        ])
        .respond_with(json_encoded(json!({
            "access_token": SERVICE_TOKEN,
            "expires_in": 300,
            "token_type": "Bearer",
        }))),
    );
}

/// A JSON body with a non-200 status.
pub fn json_status(status: u16, body: &serde_json::Value) -> impl Responder + use<> {
    status_code(status)
        .append_header("Content-Type", "application/json")
        .body(body.to_string())
}
