//! UMA2 configuration resolution across clients.

mod common;

use std::sync::Arc;

use catalog_keycloak::{ResourceRegistry, ServiceAccountToken, UmaClient};
use common::*;
use httptest::matchers::request;
use httptest::responders::{json_encoded, status_code};
use httptest::{Expectation, Server, cycle};
use serde_json::json;

#[test_log::test(tokio::test)]
async fn discovery_runs_once_per_process() {
    let server = Server::run();
    expect_discovery(&server);
    expect_service_token(&server);
    server.expect(
        Expectation::matching(request::method_path("GET", RESOURCE_SET_PATH))
            .times(3)
            .respond_with(json_encoded(json!([]))),
    );

    let conn = discovering_connection(&server);
    let client = UmaClient::new(
        Arc::clone(&conn),
        Arc::new(ServiceAccountToken::new(Arc::clone(&conn))),
    );

    for _ in 0..3 {
        assert!(client.find_resource("portfolio:1").await.unwrap().is_none());
    }
}

#[test_log::test(tokio::test)]
async fn static_configuration_skips_discovery() {
    // No discovery expectation: a discovery request would fail the test.
    let server = Server::run();
    expect_service_token(&server);
    server.expect(
        Expectation::matching(request::method_path("GET", RESOURCE_SET_PATH))
            .respond_with(json_encoded(json!([]))),
    );

    let conn = static_connection(&server);
    let client = UmaClient::new(
        Arc::clone(&conn),
        Arc::new(ServiceAccountToken::new(Arc::clone(&conn))),
    );
    client.find_resource("portfolio:1").await.unwrap();
}

#[test_log::test(tokio::test)]
async fn failed_discovery_is_retried() {
    let server = Server::run();
    server.expect(
        Expectation::matching(request::method_path("GET", DISCOVERY_PATH))
            .times(2)
            .respond_with(cycle![
                status_code(503),
                json_encoded(uma2_document(&server)),
            ]),
    );

    let conn = discovering_connection(&server);
    let err = conn.uma2_configuration().await.unwrap_err();
    assert_eq!(err.status(), Some(503));

    let config = conn.uma2_configuration().await.unwrap();
    assert_eq!(config.token_endpoint, server.url_str(TOKEN_PATH));
}
