//! API endpoint integration tests

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use herald_gateway::api::{self, ApiState};
use herald_gateway::broadcast::{BroadcastExecutor, Throttle};
use herald_gateway::db::Repositories;
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;
use common::{dispatcher, setup_repos, RecordingTransport};

const WEBHOOK_SECRET: &str = "hook-secret";
const CRON_SECRET: &str = "cron-secret";
const API_KEY: &str = "test-api-key";

struct TestApp {
    router: Router,
    repos: Repositories,
    transport: Arc<RecordingTransport>,
}

fn secret(value: &str) -> Option<SecretString> {
    Some(SecretString::from(value.to_string()))
}

/// Build a test API router
fn build_test_app(cron_secret: Option<&str>) -> TestApp {
    build_test_app_with(Some(WEBHOOK_SECRET), cron_secret)
}

fn build_test_app_with(webhook_secret: Option<&str>, cron_secret: Option<&str>) -> TestApp {
    let repos = setup_repos();
    let transport = RecordingTransport::new();
    let dispatcher = Arc::new(dispatcher(&repos, transport.clone(), None));
    let executor = Arc::new(BroadcastExecutor::new(
        &repos,
        transport.clone(),
        Throttle::default(),
    ));

    let state = Arc::new(ApiState {
        repos: repos.clone(),
        dispatcher,
        executor,
        webhook_secret: webhook_secret.and_then(secret),
        api_key: secret(API_KEY),
        cron_secret: cron_secret.and_then(secret),
    });

    TestApp {
        router: api::router(state),
        repos,
        transport,
    }
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn webhook(secret: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/webhooks/telegram")
        .header("content-type", "application/json");
    if let Some(secret) = secret {
        builder = builder.header("x-telegram-bot-api-secret-token", secret);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn admin(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {API_KEY}"))
        .header("content-type", "application/json");
    match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn cron(token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/api/cron");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

const START: &str = r#"{"update_id":1,"message":{"message_id":1,"date":0,
    "from":{"id":42,"is_bot":false,"first_name":"Ana"},
    "chat":{"id":42,"type":"private","first_name":"Ana"},"text":"/start"}}"#;

#[tokio::test]
async fn test_health_endpoint() {
    let app = build_test_app(None);

    let (status, json) = call(
        &app.router,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn webhook_rejects_bad_secret_without_side_effects() {
    let app = build_test_app(None);

    let (status, json) = call(&app.router, webhook(Some("wrong"), START)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["ok"], false);

    let (status, _) = call(&app.router, webhook(None, START)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert!(app.repos.leads.find(42).unwrap().is_none());
    assert!(app.transport.sent().is_empty());
}

#[tokio::test]
async fn webhook_without_configured_secret_refuses_updates() {
    let app = build_test_app_with(None, None);

    let (status, json) = call(&app.router, webhook(None, START)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["ok"], false);

    let (status, _) = call(&app.router, webhook(Some(WEBHOOK_SECRET), START)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert!(app.repos.leads.find(42).unwrap().is_none());
    assert_eq!(app.repos.leads.count().unwrap(), 0);
    assert!(app.transport.sent().is_empty());
}

#[tokio::test]
async fn webhook_processes_authenticated_update() {
    let app = build_test_app(None);

    let (status, json) = call(&app.router, webhook(Some(WEBHOOK_SECRET), START)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    assert!(app.repos.leads.find(42).unwrap().is_some());
    assert_eq!(app.transport.sent().len(), 1);
}

#[tokio::test]
async fn webhook_acknowledges_unparseable_body() {
    let app = build_test_app(None);

    let (status, json) = call(&app.router, webhook(Some(WEBHOOK_SECRET), "not json")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
}

#[tokio::test]
async fn cron_requires_secret() {
    let app = build_test_app(Some(CRON_SECRET));

    let (status, _) = call(&app.router, cron(None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app.router, cron(Some("guess"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = call(&app.router, cron(Some(CRON_SECRET))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["due"], 0);
    assert_eq!(json["failed"], 0);
}

#[tokio::test]
async fn cron_without_configured_secret_refuses_everyone() {
    let app = build_test_app(None);

    let (status, _) = call(&app.router, cron(Some(CRON_SECRET))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn cron_runs_due_broadcasts() {
    let app = build_test_app(Some(CRON_SECRET));
    call(&app.router, webhook(Some(WEBHOOK_SECRET), START)).await;

    let (status, _) = call(
        &app.router,
        admin(
            "POST",
            "/api/admin/broadcasts",
            Some(json!({
                "message": "Hello leads",
                "scope": "private",
                "scheduled_at": "2020-01-01T00:00:00Z"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = call(&app.router, cron(Some(CRON_SECRET))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["due"], 1);
    assert_eq!(json["completed"], 1);

    // Welcome plus the broadcast
    let sent = app.transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].text(), Some("Hello leads"));
}

#[tokio::test]
async fn admin_requires_api_key() {
    let app = build_test_app(None);

    let (status, _) = call(
        &app.router,
        Request::builder()
            .uri("/api/admin/broadcasts")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_broadcast_validation_is_unprocessable() {
    let app = build_test_app(None);

    let (status, json) = call(
        &app.router,
        admin(
            "POST",
            "/api/admin/broadcasts",
            Some(json!({ "message": "   ", "scheduled_at": "2026-01-01T00:00:00Z" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"]["code"], "validation_error");

    let (status, _) = call(
        &app.router,
        admin(
            "POST",
            "/api/admin/broadcasts",
            Some(json!({ "message": "No date" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(
        &app.router,
        admin(
            "POST",
            "/api/admin/broadcasts",
            Some(json!({
                "message": "Custom",
                "frequency": "custom",
                "scheduled_at": "2026-01-01T00:00:00Z"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn admin_lists_and_fetches_broadcasts() {
    let app = build_test_app(None);

    let (status, created) = call(
        &app.router,
        admin(
            "POST",
            "/api/admin/broadcasts",
            Some(json!({
                "message": "Weekly news",
                "frequency": "weekly",
                "scheduled_at": "2030-01-01T10:00:00Z"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "pending");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, list) = call(&app.router, admin("GET", "/api/admin/broadcasts", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, task) = call(
        &app.router,
        admin("GET", &format!("/api/admin/broadcasts/{id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["message"], "Weekly news");

    let (status, _) = call(
        &app.router,
        admin("GET", "/api/admin/broadcasts/missing", None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_send_now_reports_reached() {
    let app = build_test_app(None);
    call(&app.router, webhook(Some(WEBHOOK_SECRET), START)).await;

    let (status, json) = call(
        &app.router,
        admin(
            "POST",
            "/api/admin/broadcasts/send",
            Some(json!({ "message": "Flash sale" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["reached"], 1);
}

#[tokio::test]
async fn admin_authorizes_known_groups_only() {
    let app = build_test_app(None);

    let (status, _) = call(
        &app.router,
        admin(
            "PUT",
            "/api/admin/groups/-100/authorization",
            Some(json!({ "authorized": true })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    call(
        &app.router,
        webhook(
            Some(WEBHOOK_SECRET),
            r#"{"update_id":2,"message":{"message_id":2,"date":0,
                "from":{"id":7,"is_bot":false,"first_name":"Bo"},
                "chat":{"id":-100,"type":"group","title":"Deals"},"text":"hi"}}"#,
        ),
    )
    .await;

    let (status, _) = call(
        &app.router,
        admin(
            "PUT",
            "/api/admin/groups/-100/authorization",
            Some(json!({ "authorized": true })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(app.repos.groups.is_authorized(-100).unwrap());
}

#[tokio::test]
async fn admin_rejects_invalid_regex_automation() {
    let app = build_test_app(None);

    let (status, _) = call(
        &app.router,
        admin(
            "POST",
            "/api/admin/automations",
            Some(json!({ "trigger": "(unclosed", "response": "x", "match_type": "regex" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, rule) = call(
        &app.router,
        admin(
            "POST",
            "/api/admin/automations",
            Some(json!({ "trigger": "^(hi|hello)$", "response": "Hey!", "match_type": "regex" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(rule["match_type"], "regex");
    assert_eq!(app.repos.automations.list_active().unwrap().len(), 1);
}

#[tokio::test]
async fn settings_update_reaches_dispatcher() {
    let app = build_test_app(None);

    // Warm the settings cache with defaults
    call(&app.router, webhook(Some(WEBHOOK_SECRET), START)).await;

    let (status, _) = call(
        &app.router,
        admin(
            "PUT",
            "/api/admin/settings",
            Some(json!({ "welcome_message": "Welcome to Herald Shop!" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    call(
        &app.router,
        webhook(
            Some(WEBHOOK_SECRET),
            r#"{"update_id":3,"message":{"message_id":3,"date":0,
                "from":{"id":43,"is_bot":false,"first_name":"Cy"},
                "chat":{"id":43,"type":"private","first_name":"Cy"},"text":"/start"}}"#,
        ),
    )
    .await;

    let sent = app.transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].text(), Some("Welcome to Herald Shop!"));

    let (status, stats) = call(&app.router, admin("GET", "/api/admin/stats", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["leads"], 2);
    assert_eq!(stats["total_messages"], 2);
}
