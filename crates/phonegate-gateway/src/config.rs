//! Gateway configuration
//!
//! Loaded from a JSON file. Every field has a default, so `{}` is a complete
//! file apart from the worker source, which [`GatewayConfig::validate`]
//! insists on.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use phonegate_common::protocol::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Log filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_server_port")]
    pub server_port: String,

    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    /// Base URL of the worker registry; takes precedence over `workers`
    #[serde(default)]
    pub registry_url: Option<String>,

    /// Fixed worker list, used when no registry is configured
    #[serde(default)]
    pub workers: Vec<String>,

    #[serde(default = "default_registry_timeout_ms")]
    pub registry_timeout_ms: u64,

    #[serde(default = "default_health_check_timeout_ms")]
    pub health_check_timeout_ms: u64,

    #[serde(default = "default_dispatch_timeout_ms")]
    pub dispatch_timeout_ms: u64,

    /// Cache health verdicts instead of probing on every selection
    #[serde(default)]
    pub health_cache: Option<HealthCacheConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCacheConfig {
    #[serde(default = "default_max_staleness_ms")]
    pub max_staleness_ms: u64,

    /// Background refresh period; 0 disables the refresher
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_server_port() -> String {
    "8080".to_string()
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_registry_timeout_ms() -> u64 {
    5000
}

fn default_health_check_timeout_ms() -> u64 {
    2000
}

fn default_dispatch_timeout_ms() -> u64 {
    10000
}

fn default_max_staleness_ms() -> u64 {
    1000
}

fn default_refresh_interval_ms() -> u64 {
    500
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            server_port: default_server_port(),
            bind_host: default_bind_host(),
            registry_url: None,
            workers: Vec::new(),
            registry_timeout_ms: default_registry_timeout_ms(),
            health_check_timeout_ms: default_health_check_timeout_ms(),
            dispatch_timeout_ms: default_dispatch_timeout_ms(),
            health_cache: None,
        }
    }
}

impl Default for HealthCacheConfig {
    fn default() -> Self {
        Self {
            max_staleness_ms: default_max_staleness_ms(),
            refresh_interval_ms: default_refresh_interval_ms(),
        }
    }
}

// The transport speaks plain HTTP only, so `https://` is refused here rather
// than failing on every request later.
fn check_url(field: &str, url: &str) -> Result<()> {
    if url.starts_with("https://") {
        Err(GatewayError::Config(format!(
            "{} '{}' uses https://, which is not supported; use http://",
            field, url
        )))
    } else if url.starts_with("http://") {
        Ok(())
    } else {
        Err(GatewayError::Config(format!(
            "{} must start with http://, got '{}'",
            field, url
        )))
    }
}

impl GatewayConfig {
    /// Reads and validates a JSON config file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = Self::load_from_unchecked(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON config file without validating it, for callers that
    /// still have settings to layer on top.
    pub fn load_from_unchecked(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| {
            GatewayError::Config(format!("invalid config file {}: {}", path.display(), e))
        })
    }

    pub fn validate(&self) -> Result<()> {
        match &self.registry_url {
            Some(url) => check_url("registry_url", url)?,
            None if self.workers.is_empty() => {
                return Err(GatewayError::Config(
                    "either registry_url or a non-empty workers list is required".into(),
                ));
            }
            None => {}
        }

        for worker in &self.workers {
            if worker.contains("://") {
                check_url("worker address", worker)?;
            }
        }

        self.bind_addr()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.bind_host, self.server_port);
        addr.parse()
            .map_err(|e| GatewayError::Config(format!("invalid bind address '{}': {}", addr, e)))
    }

    pub fn registry_timeout(&self) -> Duration {
        Duration::from_millis(self.registry_timeout_ms)
    }

    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_millis(self.health_check_timeout_ms)
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }
}
