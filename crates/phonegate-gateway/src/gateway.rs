use std::sync::Arc;
use std::time::{Duration, Instant};

use phonegate_common::protocol::error::Result;
use phonegate_common::protocol::{
    CallActionRequest, ListIdentitiesRequest, PlaceCallRequest, RegisterIdentityRequest,
    UnregisterIdentityRequest, WorkerCall, WorkerReply,
};
use phonegate_metrics::{GatewayMetrics, MetricsSnapshot};
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::directory::BindingDirectory;
use crate::dispatcher::{Dispatcher, HttpDispatcher};
use crate::health::{CachedHealth, HealthSource, HttpHealthProber};
use crate::registry::{HttpRegistryClient, RegistrySource, StaticRegistry};

/// Per-call actions, routed by call id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallAction {
    Answer,
    Hangup,
    Hold,
    Resume,
}

impl CallAction {
    pub fn name(&self) -> &'static str {
        match self {
            CallAction::Answer => "answer",
            CallAction::Hangup => "hangup",
            CallAction::Hold => "hold",
            CallAction::Resume => "resume",
        }
    }

    fn into_call(self, call_id: String) -> WorkerCall {
        let req = CallActionRequest::new(call_id);
        match self {
            CallAction::Answer => WorkerCall::Answer(req),
            CallAction::Hangup => WorkerCall::Hangup(req),
            CallAction::Hold => WorkerCall::Hold(req),
            CallAction::Resume => WorkerCall::Resume(req),
        }
    }
}

/// Session-affinity gateway in front of the softphone workers.
///
/// Every action resolves its session to a worker through the
/// [`BindingDirectory`] and then forwards one [`WorkerCall`] through the
/// [`Dispatcher`]. Dispatch happens outside the directory lock.
///
/// # Example
/// ```no_run
/// # use phonegate_gateway::{Gateway, GatewayConfig};
/// # use phonegate_common::protocol::RegisterIdentityRequest;
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = GatewayConfig {
///     workers: vec!["127.0.0.1:7000".into()],
///     ..Default::default()
/// };
/// let gateway = Gateway::from_config(&config).await?;
/// let reply = gateway
///     .register(RegisterIdentityRequest::new("sip:alice@example.com"))
///     .await?;
/// println!("{}", serde_json::to_string(&reply)?);
/// # Ok(())
/// # }
/// ```
pub struct Gateway {
    directory: Arc<BindingDirectory>,
    dispatcher: Arc<dyn Dispatcher>,
    metrics: Arc<GatewayMetrics>,
    /// Background health cache refresher, if one is running
    _refresher_handle: Option<tokio::task::JoinHandle<()>>,
}

impl Gateway {
    pub fn new(
        registry: Arc<dyn RegistrySource>,
        health: Arc<dyn HealthSource>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        let metrics = Arc::new(GatewayMetrics::new());
        let directory = BindingDirectory::new(registry, health).with_metrics(metrics.clone());

        Self {
            directory: Arc::new(directory),
            dispatcher,
            metrics,
            _refresher_handle: None,
        }
    }

    /// Builds the network-backed gateway described by `config`.
    ///
    /// Must run inside a tokio runtime when a health cache refresher is
    /// configured.
    pub async fn from_config(config: &GatewayConfig) -> Result<Self> {
        config.validate()?;

        let registry: Arc<dyn RegistrySource> = match &config.registry_url {
            Some(url) => {
                info!("Using worker registry at {}", url);
                Arc::new(HttpRegistryClient::new(url.clone()).with_timeout(config.registry_timeout()))
            }
            None => {
                info!("Using static worker list: {:?}", config.workers);
                Arc::new(StaticRegistry::new(config.workers.clone()))
            }
        };

        let prober: Arc<dyn HealthSource> =
            Arc::new(HttpHealthProber::with_timeout(config.health_check_timeout()));

        let (health, refresher): (Arc<dyn HealthSource>, _) = match &config.health_cache {
            Some(cache) => {
                let cached = Arc::new(CachedHealth::new(
                    prober,
                    Duration::from_millis(cache.max_staleness_ms),
                ));
                let refresher = (cache.refresh_interval_ms > 0).then(|| {
                    cached
                        .clone()
                        .spawn_refresher(Duration::from_millis(cache.refresh_interval_ms))
                });
                let health: Arc<dyn HealthSource> = cached;
                (health, refresher)
            }
            None => (prober, None),
        };

        let dispatcher = Arc::new(HttpDispatcher::with_timeout(config.dispatch_timeout()));

        let mut gateway = Self::new(registry, health, dispatcher);
        gateway._refresher_handle = refresher;
        Ok(gateway)
    }

    pub fn directory(&self) -> &Arc<BindingDirectory> {
        &self.directory
    }

    pub fn metrics(&self) -> &Arc<GatewayMetrics> {
        &self.metrics
    }

    /// Metrics snapshot including the directory's live binding counts.
    pub async fn metrics_snapshot(&self) -> MetricsSnapshot {
        let usage = self.directory.usage_snapshot().await;
        self.metrics.snapshot().with_usage(&usage)
    }

    pub async fn register(&self, req: RegisterIdentityRequest) -> Result<WorkerReply> {
        self.perform("register", WorkerCall::RegisterIdentity(req)).await
    }

    /// Unregisters an identity and, once the worker confirms, releases its
    /// binding. A failed unregister leaves the binding in place.
    pub async fn unregister(&self, req: UnregisterIdentityRequest) -> Result<WorkerReply> {
        let identity = req.identity.clone();
        let reply = self
            .perform("unregister", WorkerCall::UnregisterIdentity(req))
            .await?;

        if let Some(worker) = self.directory.release(&identity).await {
            debug!("Unregistered {} from {}", identity, worker);
        }
        Ok(reply)
    }

    pub async fn list_identities(&self, owner_identity: impl Into<String>) -> Result<WorkerReply> {
        let call = WorkerCall::ListIdentities(ListIdentitiesRequest::new(owner_identity));
        self.perform("list", call).await
    }

    pub async fn place_call(&self, req: PlaceCallRequest) -> Result<WorkerReply> {
        self.perform("call", WorkerCall::PlaceCall(req)).await
    }

    pub async fn call_action(&self, action: CallAction, call_id: impl Into<String>) -> Result<WorkerReply> {
        self.perform(action.name(), action.into_call(call_id.into())).await
    }

    async fn perform(&self, action: &'static str, call: WorkerCall) -> Result<WorkerReply> {
        let start = Instant::now();
        let session = call.routing_key().to_string();

        let worker = match self.directory.select_worker(&session).await {
            Ok(worker) => worker,
            Err(e) => {
                warn!("{} for {} not routed: {}", action, session, e);
                self.metrics.record_action(action, start, false);
                return Err(e);
            }
        };

        self.metrics.record_dispatch(&worker);
        let result = self.dispatcher.invoke(&worker, &call).await;
        self.metrics.record_action(action, start, result.is_ok());

        debug!(
            "{} for {} on {} finished in {:?}",
            action,
            session,
            worker,
            start.elapsed()
        );
        result
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        if let Some(handle) = self._refresher_handle.take() {
            handle.abort();
        }
    }
}
