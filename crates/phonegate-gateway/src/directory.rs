//! Session-to-worker binding directory
//!
//! The directory owns two maps that always change together:
//!
//! - `bindings`: session identity to the worker it is pinned to
//! - `usage`: worker to the number of sessions pinned to it
//!
//! Both live in one [`BindingTable`] behind one async mutex. Selection holds
//! the lock across the health probe and the registry fetch, so concurrent
//! selections and releases are fully serialized and
//! `usage[w] == |{s : bindings[s] == w}|` holds at every point another caller
//! can observe.
//!
//! A binding is never re-pointed. When its worker stops answering health
//! checks, selection fails with [`GatewayError::StaleBinding`] until the
//! caller releases the session and selects again.

use std::collections::HashMap;
use std::sync::Arc;

use phonegate_common::protocol::error::{GatewayError, Result};
use phonegate_metrics::GatewayMetrics;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::health::HealthSource;
use crate::registry::RegistrySource;

#[derive(Debug, Default)]
struct BindingTable {
    bindings: HashMap<String, String>,
    usage: HashMap<String, usize>,
}

impl BindingTable {
    fn bind(&mut self, session: &str, worker: &str) {
        self.bindings.insert(session.to_string(), worker.to_string());
        *self.usage.entry(worker.to_string()).or_insert(0) += 1;
    }

    fn unbind(&mut self, session: &str) -> Option<String> {
        let worker = self.bindings.remove(session)?;
        if let Some(count) = self.usage.get_mut(&worker) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.usage.remove(&worker);
            }
        }
        Some(worker)
    }

    fn usage_of(&self, worker: &str) -> usize {
        self.usage.get(worker).copied().unwrap_or(0)
    }
}

/// Picks the least used worker; the first one wins a tie.
fn least_used<'a>(candidates: &'a [String], table: &BindingTable) -> Option<&'a String> {
    let mut best: Option<(&String, usize)> = None;
    for worker in candidates {
        let usage = table.usage_of(worker);
        match best {
            Some((_, min)) if usage >= min => {}
            _ => best = Some((worker, usage)),
        }
    }
    best.map(|(worker, _)| worker)
}

/// Owner of all session bindings and per-worker usage counters.
pub struct BindingDirectory {
    table: Mutex<BindingTable>,
    registry: Arc<dyn RegistrySource>,
    health: Arc<dyn HealthSource>,
    metrics: Option<Arc<GatewayMetrics>>,
}

impl BindingDirectory {
    pub fn new(registry: Arc<dyn RegistrySource>, health: Arc<dyn HealthSource>) -> Self {
        Self {
            table: Mutex::new(BindingTable::default()),
            registry,
            health,
            metrics: None,
        }
    }

    /// Reports selection outcomes and releases to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<GatewayMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Resolves `session` to a worker, binding it first if needed.
    ///
    /// # Errors
    /// - [`GatewayError::StaleBinding`] when the bound worker fails its health
    ///   probe. The binding is left in place.
    /// - [`GatewayError::NoHealthyWorkers`] when the session is unbound and
    ///   the registry returns no workers or cannot be reached.
    pub async fn select_worker(&self, session: &str) -> Result<String> {
        let mut table = self.table.lock().await;

        if let Some(worker) = table.bindings.get(session).cloned() {
            if self.health.is_healthy(&worker).await {
                debug!("Session {} stays on {}", session, worker);
                self.record(|m| m.record_reused_binding());
                return Ok(worker);
            }

            warn!("Session {} is bound to unhealthy worker {}", session, worker);
            self.record(|m| m.record_stale_binding());
            return Err(GatewayError::StaleBinding {
                session: session.to_string(),
                worker,
            });
        }

        let candidates = match self.registry.healthy_workers().await {
            Ok(workers) => workers,
            Err(e) => {
                warn!("Registry lookup for session {} failed: {}", session, e);
                Vec::new()
            }
        };

        let worker = match least_used(&candidates, &table) {
            Some(worker) => worker.clone(),
            None => {
                self.record(|m| m.record_no_healthy_workers());
                return Err(GatewayError::NoHealthyWorkers);
            }
        };

        table.bind(session, &worker);
        info!(
            "Bound session {} to {} (usage {})",
            session,
            worker,
            table.usage_of(&worker)
        );
        self.record(|m| m.record_new_binding());
        Ok(worker)
    }

    /// Removes the binding for `session`, if any, and returns its worker.
    ///
    /// Releasing an unbound session changes nothing.
    pub async fn release(&self, session: &str) -> Option<String> {
        let mut table = self.table.lock().await;
        let worker = table.unbind(session)?;
        info!("Released session {} from {}", session, worker);
        self.record(|m| m.record_release());
        Some(worker)
    }

    pub async fn binding_for(&self, session: &str) -> Option<String> {
        self.table.lock().await.bindings.get(session).cloned()
    }

    pub async fn usage_of(&self, worker: &str) -> usize {
        self.table.lock().await.usage_of(worker)
    }

    /// Copy of the per-worker usage counters. Workers with no sessions are absent.
    pub async fn usage_snapshot(&self) -> HashMap<String, usize> {
        self.table.lock().await.usage.clone()
    }

    pub async fn binding_count(&self) -> usize {
        self.table.lock().await.bindings.len()
    }

    fn record(&self, f: impl FnOnce(&GatewayMetrics)) {
        if let Some(metrics) = &self.metrics {
            f(metrics);
        }
    }
}
