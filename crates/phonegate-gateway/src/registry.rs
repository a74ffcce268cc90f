//! Worker registry sources
//!
//! The binding directory asks a [`RegistrySource`] for the workers it may bind
//! new sessions to. Order matters: it is the tie-break order for equally used
//! workers.

use std::time::Duration;

use async_trait::async_trait;
use phonegate_common::protocol::error::{GatewayError, Result};
use phonegate_common::transport::HttpTransport;
use tracing::debug;

/// Default bound on a registry fetch
pub const DEFAULT_REGISTRY_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of the current healthy-worker set.
#[async_trait]
pub trait RegistrySource: Send + Sync {
    /// Returns the healthy workers in registry order. An empty list is a valid
    /// answer and is not an error.
    async fn healthy_workers(&self) -> Result<Vec<String>>;
}

/// Registry client that fetches `GET <base>/workers/healthy`.
#[derive(Debug, Clone)]
pub struct HttpRegistryClient {
    base_url: String,
    timeout: Duration,
}

impl HttpRegistryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_REGISTRY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RegistrySource for HttpRegistryClient {
    async fn healthy_workers(&self) -> Result<Vec<String>> {
        let url = HttpTransport::worker_url(&self.base_url, "/workers/healthy");
        debug!("Fetching healthy workers from {}", url);

        let reply = HttpTransport::get(&url, self.timeout)
            .await
            .map_err(|e| GatewayError::Registry(format!("{} unreachable: {}", url, e)))?;

        if !reply.is_success() {
            return Err(GatewayError::Registry(format!(
                "{} answered {}",
                url, reply.status
            )));
        }

        serde_json::from_slice::<Vec<String>>(&reply.body).map_err(|e| {
            GatewayError::Registry(format!("malformed worker list from {}: {}", url, e))
        })
    }
}

/// Fixed worker list. Never fails.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    workers: Vec<String>,
}

impl StaticRegistry {
    pub fn new(workers: Vec<String>) -> Self {
        Self { workers }
    }
}

#[async_trait]
impl RegistrySource for StaticRegistry {
    async fn healthy_workers(&self) -> Result<Vec<String>> {
        Ok(self.workers.clone())
    }
}
