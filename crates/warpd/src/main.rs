//! warpd — the WarpGrid model autoscaling daemon.
//!
//! Single binary that assembles the controller subsystems:
//! - In-memory cluster seeded from the config file
//! - Deployment manager (scalers + model router)
//! - Reconcile loop (change events + periodic resync)
//! - REST API for model lookups and scale intents
//!
//! # Usage
//!
//! ```text
//! warpd standalone --config /etc/warpgrid/warpd.toml --port 8443
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};

use warpgrid_controller::{
    run_reconcile_loop, ControllerConfig, DeploymentManager, InMemoryCluster,
};

#[derive(Parser)]
#[command(name = "warpd", about = "WarpGrid model autoscaling daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run in standalone mode (in-memory cluster, all subsystems in one process).
    Standalone {
        /// Port to listen on.
        #[arg(long, default_value = "8443")]
        port: u16,

        /// Path to warpd.toml. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the scale-to-zero debounce period (e.g., "30s", "5m").
        #[arg(long)]
        scale_down_period: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,warpd=debug,warpgrid=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Standalone {
            port,
            config,
            scale_down_period,
        } => {
            let mut config = match config {
                Some(path) => {
                    info!(path = ?path, "loading config");
                    ControllerConfig::from_file(&path)?
                }
                None => ControllerConfig::default(),
            };
            if let Some(period) = scale_down_period {
                config.scale_down_period = period;
            }
            run_standalone(port, config).await
        }
    }
}

async fn run_standalone(port: u16, config: ControllerConfig) -> anyhow::Result<()> {
    info!(namespace = %config.namespace, "WarpGrid controller starting in standalone mode");

    // ── Initialize subsystems ──────────────────────────────────

    let cluster = InMemoryCluster::new(&config.namespace);
    for workload in &config.workloads {
        cluster.apply(workload.clone());
    }
    info!(workloads = config.workloads.len(), "in-memory cluster seeded");

    let manager = DeploymentManager::new(&config, Arc::new(cluster.clone()));

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start background tasks ─────────────────────────────────

    let reconcile_handle = tokio::spawn(run_reconcile_loop(
        manager.clone(),
        cluster,
        config.resync_interval(),
        shutdown_rx,
    ));

    // ── Start API server ───────────────────────────────────────

    let router = warpgrid_api::build_router(manager);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    if let Err(e) = reconcile_handle.await {
        warn!(error = %e, "reconcile loop ended abnormally");
    }

    info!("WarpGrid controller stopped");
    Ok(())
}
