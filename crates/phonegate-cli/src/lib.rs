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

//! # phonegate CLI
//!
//! Support code for the `phonegate` binary: turning a config file plus
//! command-line overrides into a [`GatewayConfig`], and the one-shot
//! `workers` and `probe` commands.

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Result};
use phonegate_gateway::{
    GatewayConfig, HealthCacheConfig, HealthSource, HttpHealthProber, HttpRegistryClient,
    RegistrySource,
};

/// Validates that a URL string starts with http://
///
/// `https://` is refused: the gateway's HTTP client has no TLS support.
pub fn validate_http_url(url: &str, description: &str) -> Result<()> {
    if url.starts_with("http://") {
        Ok(())
    } else if url.starts_with("https://") {
        Err(anyhow!(
            "Invalid {}: '{}' uses https://, which is not supported; use http://",
            description,
            url
        ))
    } else {
        Err(anyhow!(
            "Invalid {}: '{}' must start with http://",
            description,
            url
        ))
    }
}

/// Command-line settings that take precedence over the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    /// `host:port` to listen on
    pub bind: Option<String>,
    pub registry_url: Option<String>,
    /// Static workers; replace the file's worker source entirely
    pub workers: Vec<String>,
    /// Enables the health cache with this staleness bound
    pub health_cache_ms: Option<u64>,
}

/// Loads `config_path` (or the defaults), applies `overrides` and validates
/// the result.
pub fn resolve_config(config_path: Option<&Path>, overrides: Overrides) -> Result<GatewayConfig> {
    let mut config = match config_path {
        Some(path) => GatewayConfig::load_from_unchecked(path)?,
        None => GatewayConfig::default(),
    };

    if let Some(bind) = overrides.bind {
        let (host, port) = bind
            .rsplit_once(':')
            .ok_or_else(|| anyhow!("Invalid bind address '{}': expected host:port", bind))?;
        config.bind_host = host.to_string();
        config.server_port = port.to_string();
    }

    if let Some(url) = overrides.registry_url {
        validate_http_url(&url, "registry URL")?;
        config.registry_url = Some(url);
    } else if !overrides.workers.is_empty() {
        config.registry_url = None;
    }

    if !overrides.workers.is_empty() {
        config.workers = overrides.workers;
    }

    if let Some(ms) = overrides.health_cache_ms {
        config.health_cache = Some(HealthCacheConfig {
            max_staleness_ms: ms,
            refresh_interval_ms: ms / 2,
        });
    }

    config.validate()?;
    Ok(config)
}

/// Fetches the healthy worker list from the registry at `registry_url`.
pub async fn fetch_workers(registry_url: &str) -> Result<Vec<String>> {
    validate_http_url(registry_url, "registry URL")?;
    Ok(HttpRegistryClient::new(registry_url).healthy_workers().await?)
}

/// Probes one worker's `/healthcheck`.
pub async fn probe_worker(address: &str, timeout: Duration) -> bool {
    HttpHealthProber::with_timeout(timeout).is_healthy(address).await
}
