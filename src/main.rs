//! hireme-auth credential service.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ http layers ──▶ handlers ──▶ TieredStore
//!                                               │
//!              ┌──────────────┬─────────────────┼──────────────┐
//!              ▼              ▼                 ▼              ▼
//!           remote          file             memory          demo
//!     breaker/retry/     mutex + temp        RwLock<Vec>     read-only
//!        timeout         file rename                         lookups
//!
//!   Cross-cutting: config · observability · security · lifecycle
//! ```

use std::path::PathBuf;

use clap::Parser;

use hireme_auth::config::{load_config, load_from_env};
use hireme_auth::http::HttpServer;
use hireme_auth::lifecycle::{self, startup, Shutdown};
use hireme_auth::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "hireme-auth")]
#[command(about = "Credential service with tiered storage fallback", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults plus environment are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "hireme-auth starting");
    tracing::info!(
        environment = ?config.environment,
        bind_address = %config.listener.bind_address,
        remote_configured = config.store.remote.url.is_some(),
        data_path = ?config.store.data_path,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let services = startup::build_state(&config).await?;
    let shutdown = Shutdown::new();
    let sweeper = startup::spawn_pool_sweeper(services.pool.clone(), &config, &shutdown);

    let listener = startup::bind(&config).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(&config, services.store.clone());
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    lifecycle::shutdown_signal().await;
    shutdown.trigger();

    server_task.await??;
    if let Err(e) = sweeper.await {
        tracing::warn!(error = %e, "Pool sweeper task failed");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
