//! HTTP Transport Utilities
//!
//! One-shot HTTP exchanges built on the hyper-util legacy client. Each call
//! builds a fresh client, so no connection outlives the exchange it was opened
//! for. The whole exchange (connect, send, read body) is bounded by the
//! caller's timeout.
//!
//! # Example
//!
//! ```no_run
//! use phonegate_common::transport::HttpTransport;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let url = HttpTransport::worker_url("10.0.0.7:7000", "/healthcheck");
//! let reply = HttpTransport::get(&url, Duration::from_secs(2)).await?;
//! println!("healthy: {}", reply.is_success());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Method, Request, StatusCode};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::Serialize;

use crate::protocol::error::{GatewayError, Result};

/// Status and fully-read body of an HTTP response.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: StatusCode,
    pub body: Bytes,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// HTTP transport utility functions
pub struct HttpTransport;

impl HttpTransport {
    /// Turns an opaque worker or registry address into a URL for `path`.
    ///
    /// Addresses that already carry an `http://` or `https://` scheme are kept,
    /// bare `host:port` addresses get `http://`. A trailing `/` on the address
    /// is dropped so the result never contains `//` before `path`.
    ///
    /// ```
    /// use phonegate_common::transport::HttpTransport;
    ///
    /// assert_eq!(
    ///     HttpTransport::worker_url("127.0.0.1:7000", "/healthcheck"),
    ///     "http://127.0.0.1:7000/healthcheck"
    /// );
    /// assert_eq!(
    ///     HttpTransport::worker_url("http://registry:8500/", "/workers/healthy"),
    ///     "http://registry:8500/workers/healthy"
    /// );
    /// ```
    pub fn worker_url(address: &str, path: &str) -> String {
        let base = address.trim_end_matches('/');
        if base.starts_with("http://") || base.starts_with("https://") {
            format!("{}{}", base, path)
        } else {
            format!("http://{}{}", base, path)
        }
    }

    /// Performs a GET request.
    pub async fn get(url: &str, timeout: Duration) -> Result<HttpReply> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(url)
            .body(Full::new(Bytes::new()))
            .map_err(|e| GatewayError::Transport(format!("Failed to build request: {}", e)))?;

        Self::exchange(request, timeout).await
    }

    /// Performs a POST request with a JSON body.
    pub async fn post_json<T: Serialize>(url: &str, body: &T, timeout: Duration) -> Result<HttpReply> {
        let body = serde_json::to_vec(body)?;

        let request = Request::builder()
            .method(Method::POST)
            .uri(url)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| GatewayError::Transport(format!("Failed to build request: {}", e)))?;

        Self::exchange(request, timeout).await
    }

    async fn exchange(request: Request<Full<Bytes>>, timeout: Duration) -> Result<HttpReply> {
        if request.uri().scheme_str() == Some("https") {
            return Err(GatewayError::Transport(format!(
                "https is not supported: {}",
                request.uri()
            )));
        }

        let client = Client::builder(TokioExecutor::new()).build_http();

        let exchange = async move {
            let response = client
                .request(request)
                .await
                .map_err(|e| GatewayError::Transport(format!("HTTP request failed: {}", e)))?;

            let status = response.status();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| GatewayError::Transport(format!("Failed to read response: {}", e)))?
                .to_bytes();

            Ok(HttpReply { status, body })
        };

        tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| GatewayError::Timeout(timeout.as_millis() as u64))?
    }
}
