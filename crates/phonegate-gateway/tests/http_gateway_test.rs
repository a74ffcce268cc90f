//! HTTP Gateway Integration Tests
//!
//! Serves the full gateway on a random port and drives it with reqwest, once
//! against an in-memory dispatcher and once end to end against a mock
//! registry and mock workers.

mod common;

use std::sync::Arc;

use common::{MockRegistry, MockWorker};
use phonegate_gateway::{
    Gateway, GatewayConfig, HttpServer, InMemoryDispatcher, ScriptedHealth, StaticRegistry,
};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;

struct TestGateway {
    base: String,
    gateway: Arc<Gateway>,
    _handle: tokio::task::JoinHandle<()>,
}

impl TestGateway {
    async fn serve(gateway: Gateway) -> Self {
        let gateway = Arc::new(gateway);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let server = HttpServer::new(gateway.clone());
        let handle = tokio::spawn(async move {
            server.serve(listener).await.unwrap();
        });
        Self {
            base,
            gateway,
            _handle: handle,
        }
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let response = reqwest::Client::new()
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        reqwest::get(format!("{}{}", self.base, path)).await.unwrap()
    }
}

struct InMemory {
    server: TestGateway,
    health: Arc<ScriptedHealth>,
    dispatcher: Arc<InMemoryDispatcher>,
}

async fn in_memory(workers: &[&str]) -> InMemory {
    let health = Arc::new(ScriptedHealth::new());
    let dispatcher = Arc::new(InMemoryDispatcher::new());
    let registry = Arc::new(StaticRegistry::new(
        workers.iter().map(|w| w.to_string()).collect(),
    ));
    let gateway = Gateway::new(registry, health.clone(), dispatcher.clone());
    InMemory {
        server: TestGateway::serve(gateway).await,
        health,
        dispatcher,
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let env = in_memory(&["A"]).await;
    let response = env.server.get("/__health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_request_id_is_returned() {
    let env = in_memory(&["A"]).await;
    let response = env.server.get("/__health").await;
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_register_returns_worker_reply() {
    let env = in_memory(&["A", "B"]).await;

    let (status, body) = env
        .server
        .post("/phones/register", json!({"identity": "alice", "metadata": {"realm": "example.com"}}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"identity": "alice", "registered": true}));
    assert_eq!(env.dispatcher.calls()[0].0, "A");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let env = in_memory(&["A"]).await;

    let (status, body) = env.server.post("/phones/register", json!({"wrong": 1})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    assert!(env.dispatcher.calls().is_empty());
}

#[tokio::test]
async fn test_list_requires_identity() {
    let env = in_memory(&["A"]).await;

    assert_eq!(env.server.get("/phones/list").await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        env.server.get("/phones/list?identity=").await.status(),
        StatusCode::BAD_REQUEST
    );

    let response = env.server.get("/phones/list?identity=alice").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"identities": []}));
}

#[tokio::test]
async fn test_no_workers_is_service_unavailable() {
    let env = in_memory(&[]).await;

    let (status, body) = env.server.post("/phones/answer/c1", json!({})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "no healthy workers available");
}

#[tokio::test]
async fn test_stale_binding_is_service_unavailable() {
    let env = in_memory(&["A", "B"]).await;
    env.server.post("/phones/register", json!({"identity": "alice"})).await;
    env.health.set_down("A");

    let (status, body) = env
        .server
        .post("/phones/call", json!({"from_identity": "alice", "destination": "bob"}))
        .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("phone not ready"));
}

#[tokio::test]
async fn test_dispatch_failure_is_bad_gateway() {
    let env = in_memory(&["A"]).await;
    env.dispatcher.fail_worker("A");

    let (status, _) = env.server.post("/phones/hold/c1", json!({})).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_unregister_releases_binding() {
    let env = in_memory(&["A"]).await;
    env.server.post("/phones/register", json!({"identity": "alice"})).await;
    assert_eq!(env.server.gateway.directory().binding_count().await, 1);

    let (status, body) = env
        .server
        .post("/phones/unregister", json!({"identity": "alice"}))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
    assert_eq!(env.server.gateway.directory().binding_count().await, 0);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let env = in_memory(&["A", "B"]).await;
    env.server.post("/phones/register", json!({"identity": "alice"})).await;
    env.server.post("/phones/register", json!({"identity": "bob"})).await;

    let metrics: Value = env.server.get("/__metrics").await.json().await.unwrap();
    assert_eq!(metrics["total_requests"], 2);
    assert_eq!(metrics["bindings"]["active"], 2);
    assert_eq!(metrics["workers"]["A"]["active_bindings"], 1);
    assert_eq!(metrics["actions"]["register"]["success_count"], 2);
}

#[tokio::test]
async fn test_end_to_end_with_registry_and_workers() {
    let worker_a = MockWorker::start().await;
    let worker_b = MockWorker::start().await;
    let registry = MockRegistry::start(json!([worker_a.addr, worker_b.addr])).await;

    let config = GatewayConfig {
        registry_url: Some(registry.url.clone()),
        ..Default::default()
    };
    let env = TestGateway::serve(Gateway::from_config(&config).await.unwrap()).await;

    let (status, _) = env.post("/phones/register", json!({"identity": "alice"})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = env.post("/phones/register", json!({"identity": "bob"})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = env
        .post("/phones/call", json!({"from_identity": "alice", "destination": "carol"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["call_id"], "call-1");

    assert_eq!(worker_a.methods(), vec!["register_identity", "place_call"]);
    assert_eq!(worker_b.methods(), vec!["register_identity"]);

    // Alice's worker goes away: she is told to re-register, nothing is sent.
    worker_a.set_healthy(false);
    let (status, _) = env
        .post("/phones/call", json!({"from_identity": "alice", "destination": "dave"}))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(worker_a.methods().len(), 2);
}

#[tokio::test]
async fn test_end_to_end_registry_down() {
    let registry = MockRegistry::start(json!([])).await;
    registry.set_status(500);

    let config = GatewayConfig {
        registry_url: Some(registry.url.clone()),
        ..Default::default()
    };
    let env = TestGateway::serve(Gateway::from_config(&config).await.unwrap()).await;

    let (status, body) = env.post("/phones/register", json!({"identity": "alice"})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "no healthy workers available");
}

#[tokio::test]
async fn test_concurrent_registrations_balance() {
    let env = in_memory(&["A", "B"]).await;
    let base = env.server.base.clone();

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..10 {
        let url = format!("{}/phones/register", base);
        tasks.spawn(async move {
            reqwest::Client::new()
                .post(url)
                .json(&json!({"identity": format!("user{}", i)}))
                .send()
                .await
                .unwrap()
                .status()
        });
    }
    while let Some(status) = tasks.join_next().await {
        assert_eq!(status.unwrap(), StatusCode::OK);
    }

    let usage = env.server.gateway.directory().usage_snapshot().await;
    assert_eq!(usage["A"], 5);
    assert_eq!(usage["B"], 5);
}
