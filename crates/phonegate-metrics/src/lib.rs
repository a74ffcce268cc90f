//! phonegate Metrics Collection
//!
//! Counters for the gateway's routing decisions and worker dispatches.
//!
//! - [`GatewayMetrics`]: thread-safe collector, shared via `Arc`
//! - [`MetricsSnapshot`]: serializable view served at `/__metrics`
//!
//! Hot-path counters are plain atomics; the per-action and per-worker tables
//! sit behind a `RwLock` that is only written when a new key first appears.
//!
//! ```rust
//! use phonegate_metrics::GatewayMetrics;
//! use std::time::Instant;
//!
//! let metrics = GatewayMetrics::new();
//! let start = Instant::now();
//! metrics.record_new_binding();
//! metrics.record_dispatch("10.0.0.1:7000");
//! metrics.record_action("register", start, true);
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.total_requests, 1);
//! assert_eq!(snapshot.bindings.created, 1);
//! ```

mod collector;
mod snapshot;

pub use collector::GatewayMetrics;
pub use snapshot::{ActionMetrics, BindingMetrics, MetricsSnapshot, ServerInfo, WorkerMetrics};
