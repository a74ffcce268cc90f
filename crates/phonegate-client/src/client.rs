use std::time::Duration;

use phonegate_common::protocol::error::{GatewayError, Result};
use phonegate_common::protocol::{JsonRpcRequest, JsonRpcResponse};
use phonegate_common::transport::HttpTransport;
use serde_json::Value;
use tracing::debug;

/// Default bound on a single worker call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON-RPC client for one softphone worker.
///
/// Opens a fresh HTTP connection for each call, so concurrent calls to the
/// same worker never queue behind each other and nothing has to be closed.
#[derive(Debug, Clone)]
pub struct WorkerClient {
    worker_addr: String,
    timeout: Duration,
}

impl WorkerClient {
    /// Create a client for the worker at `worker_addr` (`host:port` or URL)
    pub fn new(worker_addr: impl Into<String>) -> Self {
        Self {
            worker_addr: worker_addr.into(),
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn worker_addr(&self) -> &str {
        &self.worker_addr
    }

    /// Call a worker method and return its JSON-RPC `result`.
    ///
    /// Fails with `Transport`/`Timeout` if the worker cannot be reached,
    /// `Remote` if it answers with a non-2xx status or a JSON-RPC error
    /// object, and `JsonSerialization` if the body is not a JSON-RPC response.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let request = JsonRpcRequest::new(method, params);
        let url = HttpTransport::worker_url(&self.worker_addr, "/");

        debug!("Calling {} on worker {}", method, self.worker_addr);
        let reply = HttpTransport::post_json(&url, &request, self.timeout).await?;

        if !reply.is_success() {
            return Err(GatewayError::Remote(format!(
                "worker answered {} to {}",
                reply.status, method
            )));
        }

        let response: JsonRpcResponse = serde_json::from_slice(&reply.body)?;

        if let Some(error) = response.error {
            return Err(GatewayError::Remote(error.to_string()));
        }

        response.result.ok_or_else(|| {
            GatewayError::Remote(format!("worker response to {} is missing a result", method))
        })
    }
}
