// Copyright 2025 phonegate Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::snapshot::{ActionMetrics, BindingMetrics, MetricsSnapshot, ServerInfo, WorkerMetrics};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Instant;

#[derive(Debug, Default)]
struct ActionCounters {
    calls: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    total_latency_us: AtomicU64,
}

impl ActionCounters {
    fn to_metrics(&self) -> ActionMetrics {
        let call_count = self.calls.load(Ordering::Relaxed);
        let total = self.total_latency_us.load(Ordering::Relaxed);
        ActionMetrics {
            call_count,
            success_count: self.successes.load(Ordering::Relaxed),
            failure_count: self.failures.load(Ordering::Relaxed),
            avg_latency_us: if call_count == 0 { 0 } else { total / call_count },
        }
    }
}

/// Metrics collector for the gateway.
///
/// Records three families of data:
///
/// - **Actions**: every inbound action (register, call, hold, ...) with its
///   outcome and latency, via [`record_action`](Self::record_action)
/// - **Bindings**: what the binding directory decided for each selection
/// - **Workers**: how many operations were forwarded to each worker
///
/// All methods take `&self`; share the collector with `Arc`.
pub struct GatewayMetrics {
    started_at: Instant,
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    bindings_created: AtomicU64,
    bindings_reused: AtomicU64,
    stale_bindings: AtomicU64,
    no_healthy_workers: AtomicU64,
    bindings_released: AtomicU64,
    actions: RwLock<HashMap<String, ActionCounters>>,
    workers: RwLock<HashMap<String, AtomicU64>>,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_requests: AtomicU64::new(0),
            successful_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            bindings_created: AtomicU64::new(0),
            bindings_reused: AtomicU64::new(0),
            stale_bindings: AtomicU64::new(0),
            no_healthy_workers: AtomicU64::new(0),
            bindings_released: AtomicU64::new(0),
            actions: RwLock::new(HashMap::new()),
            workers: RwLock::new(HashMap::new()),
        }
    }

    pub fn uptime_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    /// Records a completed gateway action with its outcome and latency.
    pub fn record_action(&self, action: &str, start_time: Instant, success: bool) {
        let latency_us = start_time.elapsed().as_micros() as u64;

        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }

        let update = |counters: &ActionCounters| {
            counters.calls.fetch_add(1, Ordering::Relaxed);
            counters.total_latency_us.fetch_add(latency_us, Ordering::Relaxed);
            if success {
                counters.successes.fetch_add(1, Ordering::Relaxed);
            } else {
                counters.failures.fetch_add(1, Ordering::Relaxed);
            }
        };

        // Fast path: action already known, only a read lock is needed.
        if let Ok(actions) = self.actions.read() {
            if let Some(counters) = actions.get(action) {
                update(counters);
                return;
            }
        }

        if let Ok(mut actions) = self.actions.write() {
            update(actions.entry(action.to_string()).or_default());
        }
    }

    /// Records that an operation was forwarded to `worker`.
    pub fn record_dispatch(&self, worker: &str) {
        if let Ok(workers) = self.workers.read() {
            if let Some(count) = workers.get(worker) {
                count.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }

        if let Ok(mut workers) = self.workers.write() {
            workers
                .entry(worker.to_string())
                .or_insert_with(|| AtomicU64::new(0))
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_new_binding(&self) {
        self.bindings_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reused_binding(&self) {
        self.bindings_reused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale_binding(&self) {
        self.stale_bindings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_no_healthy_workers(&self) {
        self.no_healthy_workers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_release(&self) {
        self.bindings_released.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a snapshot of all counters.
    ///
    /// `bindings.active` and `workers[..].active_bindings` are zero here; the
    /// gateway fills them from the binding directory with
    /// [`MetricsSnapshot::with_usage`].
    pub fn snapshot(&self) -> MetricsSnapshot {
        let actions: HashMap<String, ActionMetrics> = self
            .actions
            .read()
            .map(|actions| {
                actions
                    .iter()
                    .map(|(name, counters)| (name.clone(), counters.to_metrics()))
                    .collect()
            })
            .unwrap_or_default();

        let workers: HashMap<String, WorkerMetrics> = self
            .workers
            .read()
            .map(|workers| {
                workers
                    .iter()
                    .map(|(addr, count)| {
                        let metrics = WorkerMetrics {
                            dispatch_count: count.load(Ordering::Relaxed),
                            active_bindings: 0,
                        };
                        (addr.clone(), metrics)
                    })
                    .collect()
            })
            .unwrap_or_default();

        MetricsSnapshot {
            info: ServerInfo::new(self.uptime_ms()),
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            bindings: BindingMetrics {
                created: self.bindings_created.load(Ordering::Relaxed),
                reused: self.bindings_reused.load(Ordering::Relaxed),
                stale: self.stale_bindings.load(Ordering::Relaxed),
                no_healthy_workers: self.no_healthy_workers.load(Ordering::Relaxed),
                released: self.bindings_released.load(Ordering::Relaxed),
                active: 0,
            },
            actions,
            workers,
        }
    }
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_empty_snapshot() {
        let metrics = GatewayMetrics::new();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 0);
        assert!(snapshot.actions.is_empty());
        assert!(snapshot.workers.is_empty());
        assert_eq!(snapshot.bindings, BindingMetrics::default());
    }

    #[test]
    fn test_record_action() {
        let metrics = GatewayMetrics::new();
        let start = Instant::now();
        metrics.record_action("register", start, true);
        metrics.record_action("register", start, false);
        metrics.record_action("hangup", start, true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 3);
        assert_eq!(snapshot.successful_requests, 2);
        assert_eq!(snapshot.failed_requests, 1);

        let register = &snapshot.actions["register"];
        assert_eq!(register.call_count, 2);
        assert_eq!(register.success_count, 1);
        assert_eq!(register.failure_count, 1);
        assert_eq!(snapshot.actions["hangup"].call_count, 1);
    }

    #[test]
    fn test_record_dispatch_per_worker() {
        let metrics = GatewayMetrics::new();
        metrics.record_dispatch("w1");
        metrics.record_dispatch("w1");
        metrics.record_dispatch("w2");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.workers.len(), 2);
        assert_eq!(snapshot.workers["w1"].dispatch_count, 2);
        assert_eq!(snapshot.workers["w2"].dispatch_count, 1);
    }

    #[test]
    fn test_binding_counters() {
        let metrics = GatewayMetrics::new();
        metrics.record_new_binding();
        metrics.record_new_binding();
        metrics.record_reused_binding();
        metrics.record_stale_binding();
        metrics.record_no_healthy_workers();
        metrics.record_release();

        let bindings = metrics.snapshot().bindings;
        assert_eq!(bindings.created, 2);
        assert_eq!(bindings.reused, 1);
        assert_eq!(bindings.stale, 1);
        assert_eq!(bindings.no_healthy_workers, 1);
        assert_eq!(bindings.released, 1);
        assert_eq!(bindings.active, 0);
    }

    #[test]
    fn test_concurrent_recording() {
        let metrics = Arc::new(GatewayMetrics::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let metrics = Arc::clone(&metrics);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        metrics.record_action(&format!("action{}", i % 2), Instant::now(), true);
                        metrics.record_dispatch("w1");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 800);
        assert_eq!(snapshot.actions["action0"].call_count, 400);
        assert_eq!(snapshot.workers["w1"].dispatch_count, 800);
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = GatewayMetrics::new();
        metrics.record_action("list", Instant::now(), true);
        let value = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(value["total_requests"], 1);
        assert!(value["bindings"]["created"].is_number());
    }
}
