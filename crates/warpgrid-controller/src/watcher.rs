//! Reconcile loop — delivers cluster changes to the manager.
//!
//! Consumes change notifications from an [`InMemoryCluster`] and runs a
//! full resync on a fixed interval, so a failed reconcile is retried on
//! the next change or the next resync. Errors are logged, never fatal.

use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::cluster::InMemoryCluster;
use crate::config::DEFAULT_RESYNC_INTERVAL;
use crate::manager::DeploymentManager;

/// Run until `shutdown` flips or the cluster's event channel closes.
pub async fn run_reconcile_loop(
    manager: DeploymentManager,
    cluster: InMemoryCluster,
    resync_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let resync_interval = if resync_interval.is_zero() {
        warn!(
            default_ms = DEFAULT_RESYNC_INTERVAL.as_millis() as u64,
            "zero resync interval, using default"
        );
        DEFAULT_RESYNC_INTERVAL
    } else {
        resync_interval
    };
    let mut events = cluster.subscribe();
    let mut resync = tokio::time::interval(resync_interval);

    info!(
        namespace = %cluster.namespace(),
        resync_ms = resync_interval.as_millis() as u64,
        "reconcile loop started"
    );

    loop {
        tokio::select! {
            _ = resync.tick() => {
                resync_all(&manager, &cluster).await;
            }
            event = events.recv() => match event {
                Ok(name) => reconcile_one(&manager, &cluster, &name).await,
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "reconcile loop lagged, resyncing");
                    resync_all(&manager, &cluster).await;
                }
                Err(RecvError::Closed) => {
                    info!("cluster event channel closed");
                    break;
                }
            },
            _ = shutdown.changed() => {
                info!("reconcile loop shutting down");
                break;
            }
        }
    }
}

/// Reconcile every workload in the cluster.
pub async fn resync_all(manager: &DeploymentManager, cluster: &InMemoryCluster) {
    let workloads = cluster.list();
    debug!(count = workloads.len(), "resyncing workloads");

    for workload in &workloads {
        if let Err(e) = manager.reconcile(workload).await {
            error!(workload = %workload.name, error = %e, "reconcile failed");
        }
    }
}

async fn reconcile_one(manager: &DeploymentManager, cluster: &InMemoryCluster, name: &str) {
    let Some(workload) = cluster.get(name) else {
        debug!(workload = %name, "workload gone before reconcile");
        return;
    };

    if let Err(e) = manager.reconcile(&workload).await {
        error!(workload = %name, error = %e, "reconcile failed");
    }
}
