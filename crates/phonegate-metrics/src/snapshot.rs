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

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Gateway identification, embedded in every snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub version: String,
    pub uptime_ms: u64,
}

impl ServerInfo {
    pub fn new(uptime_ms: u64) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_ms,
        }
    }
}

/// Metrics for one gateway action (register, call, hangup, ...)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ActionMetrics {
    pub call_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub avg_latency_us: u64,
}

/// Requests forwarded to one worker
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkerMetrics {
    pub dispatch_count: u64,
    pub active_bindings: u64,
}

/// Outcomes of session-to-worker selection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BindingMetrics {
    /// New sessions bound to a worker
    pub created: u64,
    /// Selections answered from an existing, healthy binding
    pub reused: u64,
    /// Selections refused because the bound worker failed its health probe
    pub stale: u64,
    /// Selections refused because no worker was available
    pub no_healthy_workers: u64,
    /// Bindings removed
    pub released: u64,
    /// Bindings alive right now (filled in from the binding directory)
    pub active: u64,
}

/// Complete metrics snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub info: ServerInfo,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub bindings: BindingMetrics,
    pub actions: HashMap<String, ActionMetrics>,
    pub workers: HashMap<String, WorkerMetrics>,
}

impl MetricsSnapshot {
    /// Folds the binding directory's live usage counters into the snapshot.
    pub fn with_usage(mut self, usage: &HashMap<String, usize>) -> Self {
        self.bindings.active = usage.values().map(|n| *n as u64).sum();
        for (worker, count) in usage {
            self.workers.entry(worker.clone()).or_default().active_bindings = *count as u64;
        }
        self
    }
}
