//! Worker health sources
//!
//! [`HttpHealthProber`] asks the worker itself on every call. [`CachedHealth`]
//! wraps any source and serves remembered verdicts for at most
//! `max_staleness`, optionally kept warm by a background refresher.
//! [`ScriptedHealth`] answers from a mutable down-list.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use phonegate_common::transport::HttpTransport;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Default bound on a single health probe
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

/// Answers whether a worker is responsive right now.
///
/// Implementations never fail: anything short of a positive answer is
/// reported as unhealthy.
#[async_trait]
pub trait HealthSource: Send + Sync {
    async fn is_healthy(&self, worker: &str) -> bool;
}

/// Live prober: `GET <worker>/healthcheck`, healthy on any 2xx.
#[derive(Debug, Clone)]
pub struct HttpHealthProber {
    timeout: Duration,
}

impl HttpHealthProber {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_HEALTH_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpHealthProber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HealthSource for HttpHealthProber {
    async fn is_healthy(&self, worker: &str) -> bool {
        let url = HttpTransport::worker_url(worker, "/healthcheck");
        match HttpTransport::get(&url, self.timeout).await {
            Ok(reply) => {
                if !reply.is_success() {
                    debug!("Health check for {} answered {}", worker, reply.status);
                }
                reply.is_success()
            }
            Err(e) => {
                debug!("Health check for {} failed: {}", worker, e);
                false
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Verdict {
    healthy: bool,
    checked_at: Instant,
}

/// Health source with a bounded-staleness verdict cache.
///
/// A verdict is served only while it is younger than `max_staleness`; older
/// or missing verdicts are re-probed through the inner source before
/// answering.
pub struct CachedHealth {
    inner: Arc<dyn HealthSource>,
    max_staleness: Duration,
    verdicts: RwLock<HashMap<String, Verdict>>,
}

impl CachedHealth {
    pub fn new(inner: Arc<dyn HealthSource>, max_staleness: Duration) -> Self {
        Self {
            inner,
            max_staleness,
            verdicts: RwLock::new(HashMap::new()),
        }
    }

    pub fn max_staleness(&self) -> Duration {
        self.max_staleness
    }

    /// Number of workers with a remembered verdict, fresh or not.
    pub async fn known_workers(&self) -> usize {
        self.verdicts.read().await.len()
    }

    /// Asks the inner source about `worker` and remembers the answer, stamped
    /// with when the check started. A verdict from a later check is kept.
    async fn probe_and_store(&self, worker: &str) -> bool {
        let started = Instant::now();
        let healthy = self.inner.is_healthy(worker).await;
        let fresh = Verdict {
            healthy,
            checked_at: started,
        };

        let mut verdicts = self.verdicts.write().await;
        let verdict = verdicts.entry(worker.to_string()).or_insert(fresh);
        if verdict.checked_at < started {
            *verdict = fresh;
        }
        verdict.healthy
    }

    /// Re-probes every known worker in parallel.
    pub async fn refresh_all(&self) {
        let workers: Vec<String> = self.verdicts.read().await.keys().cloned().collect();
        let probes = workers.iter().map(|worker| self.probe_and_store(worker));
        futures::future::join_all(probes).await;
    }

    /// Starts a task that calls [`refresh_all`](Self::refresh_all) every
    /// `interval`.
    pub fn spawn_refresher(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        info!(
            "Starting health cache refresher (interval {:?}, max staleness {:?})",
            interval,
            self.max_staleness()
        );
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                self.refresh_all().await;
            }
        })
    }
}

#[async_trait]
impl HealthSource for CachedHealth {
    async fn is_healthy(&self, worker: &str) -> bool {
        let cached = self.verdicts.read().await.get(worker).copied();
        if let Some(verdict) = cached {
            if verdict.checked_at.elapsed() < self.max_staleness {
                return verdict.healthy;
            }
        }
        self.probe_and_store(worker).await
    }
}

/// Health source answered from a mutable set of down workers.
///
/// Every worker not marked down is healthy. Counts the probes it answers.
#[derive(Debug, Default)]
pub struct ScriptedHealth {
    down: std::sync::Mutex<HashSet<String>>,
    probes: AtomicUsize,
}

impl ScriptedHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_down(&self, worker: &str) {
        if let Ok(mut down) = self.down.lock() {
            down.insert(worker.to_string());
        }
    }

    pub fn set_up(&self, worker: &str) {
        if let Ok(mut down) = self.down.lock() {
            down.remove(worker);
        }
    }

    /// Number of probes answered so far.
    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthSource for ScriptedHealth {
    async fn is_healthy(&self, worker: &str) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.down
            .lock()
            .map(|down| !down.contains(worker))
            .unwrap_or(false)
    }
}
