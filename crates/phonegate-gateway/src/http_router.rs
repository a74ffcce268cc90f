//! HTTP Router for the Gateway
//!
//! Maps the public `/phones/...` surface onto [`Gateway`] actions and gateway
//! errors onto HTTP statuses:
//!
//! | error                                             | status |
//! |---------------------------------------------------|--------|
//! | malformed body, missing parameter                 | 400    |
//! | `Registry`, `NoHealthyWorkers`, `StaleBinding`    | 503    |
//! | `Dispatch`, `Timeout`, `Transport`, `Remote`      | 502    |
//! | anything else                                     | 500    |

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use phonegate_common::protocol::error::GatewayError;
use phonegate_common::protocol::{
    PlaceCallRequest, RegisterIdentityRequest, UnregisterIdentityRequest, WorkerReply,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::gateway::{CallAction, Gateway};

/// Error returned by a handler, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// HTTP status for a gateway error.
pub fn status_for(err: &GatewayError) -> StatusCode {
    match err {
        e if e.is_selection_error() => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::Dispatch { .. }
        | GatewayError::Timeout(_)
        | GatewayError::Transport(_)
        | GatewayError::Remote(_) => StatusCode::BAD_GATEWAY,
        GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self {
            status: status_for(&err),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult = Result<Json<WorkerReply>, ApiError>;

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::bad_request(format!("Invalid request: {}", e)))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    identity: Option<String>,
}

/// Builds the axum router for `gateway`, without middleware layers.
pub fn build_router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/phones/register", post(register))
        .route("/phones/unregister", post(unregister))
        .route("/phones/call", post(place_call))
        .route("/phones/answer/{call_id}", post(answer))
        .route("/phones/hangup/{call_id}", post(hangup))
        .route("/phones/hold/{call_id}", post(hold))
        .route("/phones/resume/{call_id}", post(resume))
        .route("/phones/list", get(list))
        .route("/__health", get(health_check))
        .route("/__metrics", get(metrics))
        .with_state(gateway)
}

async fn register(State(gateway): State<Arc<Gateway>>, body: Bytes) -> ApiResult {
    let req: RegisterIdentityRequest = parse_body(&body)?;
    Ok(Json(gateway.register(req).await?))
}

async fn unregister(State(gateway): State<Arc<Gateway>>, body: Bytes) -> ApiResult {
    let req: UnregisterIdentityRequest = parse_body(&body)?;
    Ok(Json(gateway.unregister(req).await?))
}

async fn place_call(State(gateway): State<Arc<Gateway>>, body: Bytes) -> ApiResult {
    let req: PlaceCallRequest = parse_body(&body)?;
    Ok(Json(gateway.place_call(req).await?))
}

async fn answer(State(gateway): State<Arc<Gateway>>, Path(call_id): Path<String>) -> ApiResult {
    Ok(Json(gateway.call_action(CallAction::Answer, call_id).await?))
}

async fn hangup(State(gateway): State<Arc<Gateway>>, Path(call_id): Path<String>) -> ApiResult {
    Ok(Json(gateway.call_action(CallAction::Hangup, call_id).await?))
}

async fn hold(State(gateway): State<Arc<Gateway>>, Path(call_id): Path<String>) -> ApiResult {
    Ok(Json(gateway.call_action(CallAction::Hold, call_id).await?))
}

async fn resume(State(gateway): State<Arc<Gateway>>, Path(call_id): Path<String>) -> ApiResult {
    Ok(Json(gateway.call_action(CallAction::Resume, call_id).await?))
}

async fn list(State(gateway): State<Arc<Gateway>>, Query(params): Query<ListParams>) -> ApiResult {
    let identity = params
        .identity
        .filter(|identity| !identity.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing identity parameter"))?;
    Ok(Json(gateway.list_identities(identity).await?))
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn metrics(State(gateway): State<Arc<Gateway>>) -> impl IntoResponse {
    Json(gateway.metrics_snapshot().await)
}
