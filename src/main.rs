//! Groupwall DNS filter - Entry point.
//!
//! Loads the configured lists, builds the resolver pipeline (blocking
//! stage in front of the upstream resolver) and serves DNS over UDP until
//! interrupted.

use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use groupwall::blocklist::ListManager;
use groupwall::config::Config;
use groupwall::dns::{BlockingResolver, ChainedResolver, Resolver, UpstreamResolver, chain};
use groupwall::server::{QueryHandler, run_server};

/// Wait for shutdown signal and handle graceful termination.
async fn wait_for_shutdown(running: Arc<AtomicBool>, server_handle: JoinHandle<()>) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down...");
            running.store(false, Ordering::SeqCst);
        }
        result = server_handle => {
            if let Err(err) = result {
                error!("Server task failed: {err}");
            }
        }
    }

    info!("Shutdown complete.");
}

fn log_configuration(stage: &str, resolver: &dyn Resolver) {
    for line in resolver.configuration() {
        info!("{stage}: {line}");
    }
}

async fn run() -> Result<()> {
    let config_path = std::env::var("CONFIG_PATH")
        .map(Cow::Owned)
        .unwrap_or(Cow::Borrowed("config.toml"));
    let config = Config::load(config_path.as_ref()).context("Failed to load configuration")?;

    // Initialize metrics (must be done early, before any metrics are recorded)
    groupwall::metrics::init(&config.metrics).context("Failed to initialize metrics")?;
    if config.metrics.enabled {
        info!("Metrics enabled on {}", config.metrics.listen);
    }

    info!("Starting Groupwall DNS filter...");
    info!("Upstream resolver: {}", config.upstream_resolver);

    let list_manager =
        ListManager::new(&config.blocking).context("Failed to create list manager")?;
    let stats = list_manager.refresh().await;
    if stats.failed_sources > 0 {
        info!(
            failed = stats.failed_sources,
            "some list sources could not be loaded"
        );
    }

    let blocking = BlockingResolver::new(&config.blocking, list_manager.lists())
        .context("Invalid blocking configuration")?;
    log_configuration("blocking", &blocking);

    let upstream = UpstreamResolver::new(config.upstream_resolver);
    log_configuration("upstream", &upstream);

    let stages: Vec<Box<dyn ChainedResolver>> = vec![Box::new(blocking)];
    let pipeline = chain(stages, Arc::new(upstream));
    let handler = QueryHandler::new(pipeline, config.client_names.clone());

    let socket = UdpSocket::bind(config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen))?;
    info!("Listening on {}", config.listen);

    let running = Arc::new(AtomicBool::new(true));
    let server_running = Arc::clone(&running);
    let server_handle = tokio::spawn(async move {
        if let Err(err) = run_server(Arc::new(socket), handler, server_running).await {
            error!("Server error: {err:?}");
        }
    });

    wait_for_shutdown(running, server_handle).await;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    run().await
}
