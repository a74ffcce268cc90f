//! HTTP Server for the Gateway
//!
//! Wraps the router from [`crate::http_router`] in CORS, tracing and
//! request-id middleware and serves it with axum.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderName;
use phonegate_common::protocol::error::GatewayError;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::gateway::Gateway;
use crate::http_router::build_router;

/// Header carrying the per-request correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// HTTP server for the gateway.
///
/// - `/phones/...`: gateway actions
/// - `/__health`: liveness, always `OK`
/// - `/__metrics`: metrics snapshot
pub struct HttpServer {
    gateway: Arc<Gateway>,
}

impl HttpServer {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// The fully layered router.
    pub fn router(&self) -> axum::Router {
        let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

        // Layers run outermost-last: the id is set before tracing sees the
        // request and copied onto the response on the way out.
        build_router(self.gateway.clone())
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
            .layer(CorsLayer::permissive())
    }

    /// Binds `addr` and serves until the process stops.
    pub async fn run(self, addr: SocketAddr) -> Result<(), GatewayError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Transport(format!("Failed to bind to {}: {}", addr, e)))?;
        self.serve(listener).await
    }

    /// Serves on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<(), GatewayError> {
        let local_addr = listener
            .local_addr()
            .map_err(|e| GatewayError::Transport(format!("Failed to get local addr: {}", e)))?;
        info!("Gateway HTTP server listening on {}", local_addr);

        axum::serve(listener, self.router())
            .await
            .map_err(|e| GatewayError::Transport(format!("Server error: {}", e)))?;

        Ok(())
    }
}
