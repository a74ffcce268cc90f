//! Remote operation dispatch
//!
//! A [`Dispatcher`] carries one [`WorkerCall`] to one worker and brings back
//! its typed reply. It knows nothing about bindings: the caller resolves the
//! worker first. Every failure comes back as [`GatewayError::Dispatch`] naming
//! the worker; there are no retries.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use phonegate_client::client::DEFAULT_CALL_TIMEOUT;
use phonegate_client::WorkerClient;
use phonegate_common::protocol::error::{GatewayError, Result};
use phonegate_common::protocol::{
    ActionResponse, IdentityListResponse, RegisterIdentityResponse, WorkerCall, WorkerReply,
};
use tracing::{debug, warn};

#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Invokes `call` on the worker at `worker`.
    async fn invoke(&self, worker: &str, call: &WorkerCall) -> Result<WorkerReply>;
}

/// JSON-RPC over HTTP, one fresh connection per call.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    timeout: Duration,
}

impl HttpDispatcher {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn call_worker(client: &WorkerClient, call: &WorkerCall) -> Result<WorkerReply> {
        let params = call.params()?;
        let result = client.call(call.method(), params).await?;
        call.decode_reply(result)
    }
}

impl Default for HttpDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn invoke(&self, worker: &str, call: &WorkerCall) -> Result<WorkerReply> {
        let client = WorkerClient::new(worker).with_timeout(self.timeout);

        Self::call_worker(&client, call).await.map_err(|e| {
            warn!("{} on {} failed: {}", call.method(), worker, e);
            GatewayError::dispatch(worker, e)
        })
    }
}

/// In-process dispatcher for tests.
///
/// Records every call, answers with a scripted reply per method (or a
/// successful default), and fails every call aimed at a worker marked down.
#[derive(Debug, Default)]
pub struct InMemoryDispatcher {
    calls: Mutex<Vec<(String, WorkerCall)>>,
    replies: Mutex<HashMap<&'static str, WorkerReply>>,
    failing: Mutex<HashSet<String>>,
}

impl InMemoryDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every call to `method` with `reply`.
    pub fn script(&self, method: &'static str, reply: WorkerReply) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.insert(method, reply);
        }
    }

    /// Makes every call to `worker` fail.
    pub fn fail_worker(&self, worker: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(worker.to_string());
        }
    }

    pub fn restore_worker(&self, worker: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.remove(worker);
        }
    }

    /// Calls received so far, with the worker each was sent to.
    pub fn calls(&self) -> Vec<(String, WorkerCall)> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    fn default_reply(call: &WorkerCall) -> WorkerReply {
        match call {
            WorkerCall::RegisterIdentity(req) => WorkerReply::Registered(RegisterIdentityResponse {
                identity: req.identity.clone(),
                registered: true,
                message: None,
            }),
            WorkerCall::ListIdentities(_) => WorkerReply::Identities(IdentityListResponse::default()),
            _ => WorkerReply::Action(ActionResponse::ok()),
        }
    }
}

#[async_trait]
impl Dispatcher for InMemoryDispatcher {
    async fn invoke(&self, worker: &str, call: &WorkerCall) -> Result<WorkerReply> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((worker.to_string(), call.clone()));
        }
        debug!("In-memory {} on {}", call.method(), worker);

        let failing = self
            .failing
            .lock()
            .map(|failing| failing.contains(worker))
            .unwrap_or(false);
        if failing {
            return Err(GatewayError::dispatch(worker, "connection refused"));
        }

        let scripted = self
            .replies
            .lock()
            .ok()
            .and_then(|replies| replies.get(call.method()).cloned());
        Ok(scripted.unwrap_or_else(|| Self::default_reply(call)))
    }
}
