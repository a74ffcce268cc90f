//! # phonegate CLI Entry Point
//!
//! ## Usage
//!
//! ```bash
//! # Start the gateway from a config file
//! phonegate gateway -c phonegate.json
//!
//! # Start the gateway against a fixed pair of workers
//! phonegate gateway -b 0.0.0.0:8080 -w 10.0.0.1:7000 -w 10.0.0.2:7000
//!
//! # Ask the registry which workers are healthy (raw JSON on stdout)
//! phonegate workers http://127.0.0.1:8500
//!
//! # Check one worker
//! phonegate probe 10.0.0.1:7000
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use argh::FromArgs;
use phonegate_cli::{fetch_workers, probe_worker, resolve_config, Overrides};
use phonegate_gateway::{Gateway, HttpServer};

#[derive(FromArgs)]
/// phonegate - session-affinity gateway for softphone workers
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Gateway(GatewayArgs),
    Workers(WorkersArgs),
    Probe(ProbeArgs),
}

/// Arguments for running the gateway.
///
/// Command-line flags win over the config file. Worker flags replace the
/// file's worker source, registry or static list alike.
#[derive(FromArgs)]
#[argh(subcommand, name = "gateway")]
/// start the phonegate HTTP gateway
struct GatewayArgs {
    /// path to a JSON config file
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// address to bind the HTTP server to (host:port)
    #[argh(option, short = 'b')]
    bind: Option<String>,

    /// base URL of the worker registry
    ///
    /// Must include the http:// prefix.
    #[argh(option, long = "registry")]
    registry: Option<String>,

    /// static worker address; can be given multiple times
    #[argh(option, short = 'w', long = "worker")]
    workers: Vec<String>,

    /// cache health verdicts for this many milliseconds
    #[argh(option, long = "health-cache-ms")]
    health_cache_ms: Option<u64>,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "workers")]
/// print the registry's healthy workers as JSON
struct WorkersArgs {
    /// base URL of the worker registry
    #[argh(positional)]
    registry_url: String,
}

/// Arguments for probing one worker.
///
/// Prints `healthy` or `unhealthy`; exits with status 1 when unhealthy.
#[derive(FromArgs)]
#[argh(subcommand, name = "probe")]
/// check whether a worker answers its health check
struct ProbeArgs {
    /// worker address (host:port or URL)
    #[argh(positional)]
    worker: String,

    /// probe timeout in milliseconds
    #[argh(option, long = "timeout-ms", default = "2000")]
    timeout_ms: u64,
}

/// Installs the fmt subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(default_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    match cli.command {
        Commands::Gateway(args) => run_gateway(args).await,
        Commands::Workers(args) => {
            // No tracing: stdout stays clean for piping into jq.
            let workers = fetch_workers(&args.registry_url).await?;
            println!("{}", serde_json::to_string(&workers)?);
            Ok(())
        }
        Commands::Probe(args) => {
            if probe_worker(&args.worker, Duration::from_millis(args.timeout_ms)).await {
                println!("healthy");
                Ok(())
            } else {
                println!("unhealthy");
                std::process::exit(1);
            }
        }
    }
}

async fn run_gateway(args: GatewayArgs) -> Result<()> {
    let overrides = Overrides {
        bind: args.bind,
        registry_url: args.registry,
        workers: args.workers,
        health_cache_ms: args.health_cache_ms,
    };
    let config = resolve_config(args.config.as_deref(), overrides)?;

    init_tracing(&config.log_level);
    tracing::info!("Starting phonegate gateway");
    match &config.registry_url {
        Some(url) => tracing::info!("Worker registry: {}", url),
        None => tracing::info!("Static workers: {:?}", config.workers),
    }
    if let Some(cache) = &config.health_cache {
        tracing::info!(
            "Health cache enabled: max staleness {}ms, refresh every {}ms",
            cache.max_staleness_ms,
            cache.refresh_interval_ms
        );
    }

    let addr = config.bind_addr()?;
    let gateway = Gateway::from_config(&config).await?;
    HttpServer::new(Arc::new(gateway)).run(addr).await?;

    Ok(())
}
