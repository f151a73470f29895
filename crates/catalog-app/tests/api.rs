//! HTTP surface: authentication, gating, visibility, sharing and group sync.

mod common;

use std::collections::BTreeSet;
use std::time::Duration;

use catalog_db::mirror::GroupMirror;
use catalog_db::model::sync::{DesiredGroup, SyncPlan};
use common::*;
use httptest::Expectation;
use httptest::matchers::request;
use httptest::responders::status_code;
use salvo::http::StatusCode;
use salvo::test::{ResponseExt, TestClient};
use serde_json::{Value, json};

const BEARER: &str = "Bearer user-token";

async fn seed_admins(app: &TestApp) {
    let mut plan = SyncPlan::now();
    plan.groups.push(DesiredGroup {
        id: "g1".to_string(),
        name: "Admins".to_string(),
        path: "/Admins".to_string(),
        parent_id: None,
        role_names: BTreeSet::from(["approver".to_string()]),
    });
    app.mirror.apply_sync(&plan).await.unwrap();
}

#[test_log::test(tokio::test)]
async fn healthcheck_needs_no_token() {
    let app = TestApp::start(vec![]).await;
    let mut res = TestClient::get(format!("{BASE}/healthcheck"))
        .send(&app.service)
        .await;

    assert_eq!(res.status_code, Some(StatusCode::OK));
    assert_eq!(res.take_string().await.unwrap(), "OK");
}

#[test_log::test(tokio::test)]
async fn missing_bearer_is_unauthorized() {
    let app = TestApp::start(vec![]).await;
    let mut res = TestClient::get(format!("{BASE}/portfolios/permitted"))
        .send(&app.service)
        .await;

    assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));
    let body: Value = res.take_json().await.unwrap();
    assert_eq!(body["error"], "Authentication required");
}

#[test_log::test(tokio::test)]
async fn unknown_collection_is_not_found() {
    let app = TestApp::start(vec![]).await;
    let res = TestClient::get(format!("{BASE}/widgets/permitted"))
        .add_header("authorization", BEARER, true)
        .send(&app.service)
        .await;

    assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));
}

#[test_log::test(tokio::test)]
async fn permitted_reports_wildcard() {
    let app = TestApp::start(vec![]).await;
    app.expect_permissions(json!([
        {"rsname": "portfolio:7", "scopes": ["portfolio:read"]},
        {"rsname": "portfolio:all", "scopes": ["portfolio:read"]},
    ]));

    let mut res = TestClient::get(format!("{BASE}/portfolios/permitted"))
        .add_header("authorization", BEARER, true)
        .send(&app.service)
        .await;

    assert_eq!(res.status_code, Some(StatusCode::OK));
    let body: Value = res.take_json().await.unwrap();
    assert_eq!(body, json!({"is_wildcard": true}));
}

#[test_log::test(tokio::test)]
async fn permitted_lists_ids_of_requested_kind() {
    let app = TestApp::start(vec![]).await;
    app.expect_permissions(json!([
        {"rsname": "portfolio_item:9", "scopes": ["portfolio_item:read"]},
        {"rsname": "portfolio:2", "scopes": ["portfolio:read"]},
        {"rsname": "portfolio:1", "scopes": ["portfolio:read"]},
        {"rsname": "portfolio:2", "scopes": ["portfolio:read"]},
    ]));

    let mut res = TestClient::get(format!("{BASE}/portfolios/permitted"))
        .add_header("authorization", BEARER, true)
        .send(&app.service)
        .await;

    let body: Value = res.take_json().await.unwrap();
    assert_eq!(body, json!({"is_wildcard": false, "items": ["2", "1"]}));
}

#[test_log::test(tokio::test)]
async fn share_requires_update_permission() {
    let app = TestApp::start(vec![]).await;
    seed_admins(&app).await;
    app.expect_decision("portfolio:42#portfolio:update", false);

    let res = TestClient::post(format!("{BASE}/portfolios/42/share"))
        .add_header("authorization", BEARER, true)
        .json(&json!({"group_ids": ["g1"], "permissions": ["read"]}))
        .send(&app.service)
        .await;

    assert_eq!(res.status_code, Some(StatusCode::FORBIDDEN));
    assert!(app.registry.resource("portfolio:42").is_none());
}

#[test_log::test(tokio::test)]
async fn rejected_caller_token_is_unauthorized() {
    let app = TestApp::start(vec![]).await;
    app.server.expect(
        Expectation::matching(request::method_path("POST", TOKEN_PATH)).respond_with(
            status_code(401)
                .append_header("Content-Type", "application/json")
                .body(json!({"error": "invalid_grant"}).to_string()),
        ),
    );

    let res = TestClient::post(format!("{BASE}/portfolios/42/share"))
        .add_header("authorization", BEARER, true)
        .json(&json!({"group_ids": ["g1"], "permissions": ["read"]}))
        .send(&app.service)
        .await;

    assert_eq!(res.status_code, Some(StatusCode::UNAUTHORIZED));
}

#[test_log::test(tokio::test)]
async fn share_then_unshare_round_trip() {
    let app = TestApp::start(vec![]).await;
    seed_admins(&app).await;
    app.expect_decision("portfolio:42#portfolio:update", true);
    app.expect_decision("portfolio:42#portfolio:read", true);

    let res = TestClient::post(format!("{BASE}/portfolios/42/share"))
        .add_header("authorization", BEARER, true)
        .json(&json!({"group_ids": ["g1"], "permissions": ["read", "order"]}))
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::NO_CONTENT));

    let resource = app.registry.resource("portfolio:42").unwrap();
    assert_eq!(resource.resource_type.as_deref(), Some("portfolio"));
    assert_eq!(resource.scopes.len(), 4);
    let policy = app.registry.policy("portfolio:42/group:g1").unwrap();
    assert_eq!(
        policy.scopes,
        BTreeSet::from(["portfolio:order".to_string(), "portfolio:read".to_string()])
    );
    assert_eq!(policy.groups, BTreeSet::from(["/Admins".to_string()]));

    let mut res = TestClient::get(format!("{BASE}/portfolios/42/share_info"))
        .add_header("authorization", BEARER, true)
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
    let body: Value = res.take_json().await.unwrap();
    assert_eq!(
        body,
        json!([{
            "group_id": "g1",
            "group_name": "Admins",
            "group_path": "/Admins",
            "permissions": ["order", "read"],
        }])
    );

    let res = TestClient::post(format!("{BASE}/portfolios/42/unshare"))
        .add_header("authorization", BEARER, true)
        .json(&json!({"group_ids": ["g1"], "permissions": ["order", "read"]}))
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::NO_CONTENT));
    assert!(app.registry.policy("portfolio:42/group:g1").is_none());
    // The resource itself outlives its shares.
    assert!(app.registry.resource("portfolio:42").is_some());
}

#[test_log::test(tokio::test)]
async fn share_rejects_bad_requests() {
    let app = TestApp::start(vec![]).await;
    seed_admins(&app).await;
    app.expect_decision("portfolio:42#portfolio:update", true);

    let res = TestClient::post(format!("{BASE}/portfolios/42/share"))
        .add_header("authorization", BEARER, true)
        .json(&json!({"group_ids": ["g1"], "permissions": ["delete"]}))
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));

    let res = TestClient::post(format!("{BASE}/portfolios/42/share"))
        .add_header("authorization", BEARER, true)
        .json(&json!({"group_ids": ["g1", "nope"], "permissions": ["read"]}))
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::NOT_FOUND));

    assert!(app.registry.resource("portfolio:42").is_none());
}

#[test_log::test(tokio::test)]
async fn wildcard_object_is_not_shareable() {
    let app = TestApp::start(vec![]).await;
    seed_admins(&app).await;
    app.expect_decision("portfolio:all#portfolio:update", true);

    let res = TestClient::post(format!("{BASE}/portfolios/all/share"))
        .add_header("authorization", BEARER, true)
        .json(&json!({"group_ids": ["g1"], "permissions": ["read"]}))
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::BAD_REQUEST));
    assert!(app.registry.policy("portfolio:all/group:g1").is_none());
    assert!(app.registry.resource("portfolio:all").is_none());
}

#[test_log::test(tokio::test)]
async fn group_listing_requires_wildcard_read() {
    let app = TestApp::start(vec![]).await;
    seed_admins(&app).await;
    app.expect_decision("group:all#group:read", false);

    let res = TestClient::get(format!("{BASE}/groups"))
        .add_header("authorization", BEARER, true)
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::FORBIDDEN));
}

#[test_log::test(tokio::test)]
async fn triggered_sync_populates_group_listing() {
    let app = TestApp::start(vec![
        group("g1", "Admins", &["approver"]),
        group("g2", "Buyers", &[]),
    ])
    .await;
    app.expect_decision("group:all#group:sync", true);
    app.expect_decision("group:all#group:read", true);

    let mut res = TestClient::post(format!("{BASE}/groups/sync"))
        .add_header("authorization", BEARER, true)
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::ACCEPTED));
    assert_eq!(
        res.headers().get("location").and_then(|v| v.to_str().ok()),
        Some("/api/v1/groups/sync")
    );
    let body: Value = res.take_json().await.unwrap();
    assert_eq!(body, json!({"queued": true}));

    let mut state = Value::Null;
    for _ in 0..200 {
        let mut res = TestClient::get(format!("{BASE}/groups/sync"))
            .add_header("authorization", BEARER, true)
            .send(&app.service)
            .await;
        let body: Value = res.take_json().await.unwrap();
        state = body["state"].clone();
        if state == "succeeded" {
            assert_eq!(body["summary"]["created"], 2);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(state, "succeeded");

    let mut res = TestClient::get(format!("{BASE}/groups"))
        .add_header("authorization", BEARER, true)
        .send(&app.service)
        .await;
    assert_eq!(res.status_code, Some(StatusCode::OK));
    let groups: Vec<Value> = res.take_json().await.unwrap();
    let listed: Vec<(&str, &Value)> = groups
        .iter()
        .map(|g| (g["path"].as_str().unwrap(), &g["roles"]))
        .collect();
    assert_eq!(
        listed,
        vec![("/Admins", &json!(["approver"])), ("/Buyers", &json!([]))]
    );
}
