// kegama-offline - Offline-first caching proxy for the Kegama web app
// Author: kelexine (https://github.com/kelexine)

use anyhow::Result;
use clap::Parser;
use kegama_offline::cache::CacheStorage;
use kegama_offline::cli::Args;
use kegama_offline::config::AppConfig;
use kegama_offline::network::{HttpNetwork, Network};
use kegama_offline::server::create_router;
use kegama_offline::utils::logging;
use kegama_offline::worker::{CacheLifecycleManager, Registration};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Phase 1: Load configuration
    let mut config = AppConfig::load(args.config.as_deref())?;
    config.apply_args(&args)?;

    if args.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.workers.max(1))
        .enable_all()
        .build()?
        .block_on(run(config))
}

async fn run(config: AppConfig) -> Result<()> {
    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    info!("Starting kegama-offline v{}", env!("CARGO_PKG_VERSION"));

    // Phase 3: Open cache storage and the upstream connection
    let caches = Arc::new(match &config.cache.storage_dir {
        Some(dir) => CacheStorage::persistent(dir).await?,
        None => CacheStorage::in_memory(),
    });
    let network: Arc<dyn Network> = Arc::new(HttpNetwork::new(&config.upstream)?);
    info!("Fronting upstream {}", config.upstream.base_url);

    // Phase 4: Install and activate the current cache version
    let registration = Arc::new(Registration::new(caches, network));
    let handler = Arc::new(CacheLifecycleManager::from_config(&config.cache));
    match registration.update(config.cache.name.clone(), handler).await {
        Ok(worker) => info!(
            "Worker #{} ({}) is {}",
            worker.id(),
            worker.version(),
            worker.state()
        ),
        // Same as a browser whose worker failed to install: pages still load
        // from the network, there is just no offline copy
        Err(e) => warn!("Worker not installed, serving pass-through: {}", e),
    }

    // Phase 5: Build and start HTTP server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = create_router(config, registration)?;

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Phase 6: Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
