//! Mock softphone workers and registries shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use phonegate_common::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub async fn spawn(app: Router) -> (String, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, handle)
}

/// An address nothing listens on.
pub async fn dead_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);
    addr
}

#[derive(Default)]
struct WorkerState {
    healthy: AtomicBool,
    calls: Mutex<Vec<JsonRpcRequest>>,
    failing_method: Mutex<Option<String>>,
}

/// A softphone worker: `/healthcheck` plus JSON-RPC at `/`.
pub struct MockWorker {
    pub addr: String,
    state: Arc<WorkerState>,
    _handle: tokio::task::JoinHandle<()>,
}

async fn worker_health(State(state): State<Arc<WorkerState>>) -> impl IntoResponse {
    if state.healthy.load(Ordering::SeqCst) {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Unhealthy")
    }
}

async fn worker_jsonrpc(State(state): State<Arc<WorkerState>>, body: Bytes) -> impl IntoResponse {
    let req: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(_) => return (StatusCode::BAD_REQUEST, Vec::new()),
    };
    state.calls.lock().unwrap().push(req.clone());

    let failing = state.failing_method.lock().unwrap().clone();
    if failing.as_deref() == Some(req.method.as_str()) {
        let response = JsonRpcResponse::error(req.id, JsonRpcError::server_error("line busy"));
        return (StatusCode::OK, serde_json::to_vec(&response).unwrap());
    }

    let result = match req.method.as_str() {
        "register_identity" => json!({
            "identity": req.params["identity"],
            "registered": true,
        }),
        "list_identities" => json!({ "identities": [req.params["owner_identity"]] }),
        "place_call" => json!({ "success": true, "call_id": "call-1" }),
        "unregister_identity" | "answer_call" | "hangup_call" | "hold_call" | "resume_call" => {
            json!({ "success": true })
        }
        _ => {
            let response = JsonRpcResponse::error(req.id, JsonRpcError::method_not_found());
            return (StatusCode::OK, serde_json::to_vec(&response).unwrap());
        }
    };

    let response = JsonRpcResponse::success(req.id, result);
    (StatusCode::OK, serde_json::to_vec(&response).unwrap())
}

impl MockWorker {
    pub async fn start() -> Self {
        let state = Arc::new(WorkerState::default());
        state.healthy.store(true, Ordering::SeqCst);

        let app = Router::new()
            .route("/", post(worker_jsonrpc))
            .route("/healthcheck", get(worker_health))
            .with_state(state.clone());
        let (addr, handle) = spawn(app).await;

        Self {
            addr,
            state,
            _handle: handle,
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.state.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Makes `method` answer with a JSON-RPC error.
    pub fn fail_method(&self, method: &str) {
        *self.state.failing_method.lock().unwrap() = Some(method.to_string());
    }

    pub fn methods(&self) -> Vec<String> {
        self.state
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|req| req.method.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<JsonRpcRequest> {
        self.state.calls.lock().unwrap().clone()
    }
}

#[derive(Default)]
struct RegistryState {
    workers: Mutex<Value>,
    status: AtomicU16,
}

/// A worker registry serving `/workers/healthy`.
pub struct MockRegistry {
    pub url: String,
    state: Arc<RegistryState>,
    _handle: tokio::task::JoinHandle<()>,
}

async fn registry_workers(State(state): State<Arc<RegistryState>>) -> impl IntoResponse {
    let status = StatusCode::from_u16(state.status.load(Ordering::SeqCst)).unwrap();
    let body = state.workers.lock().unwrap().clone();
    (status, Json(body))
}

impl MockRegistry {
    pub async fn start(workers: Value) -> Self {
        let state = Arc::new(RegistryState {
            workers: Mutex::new(workers),
            status: AtomicU16::new(200),
        });

        let app = Router::new()
            .route("/workers/healthy", get(registry_workers))
            .with_state(state.clone());
        let (addr, handle) = spawn(app).await;

        Self {
            url: format!("http://{}", addr),
            state,
            _handle: handle,
        }
    }

    pub fn set_workers(&self, workers: Value) {
        *self.state.workers.lock().unwrap() = workers;
    }

    pub fn set_status(&self, status: u16) {
        self.state.status.store(status, Ordering::SeqCst);
    }
}
