//! warpgrid-controller — scaling and routing control core for model workloads.
//!
//! Reconciles observed workloads into a model routing table and a set of
//! per-workload scalers, and takes traffic and scale intents from the
//! request path.
//!
//! # Architecture
//!
//! ```text
//! workload changed ──▶ ReconciliationHandler
//!                        ├── AnnotationPolicy  (models, min/max)
//!                        ├── ModelRouter.update(models, workload)
//!                        ├── ScaleTarget.get_replicas(workload)
//!                        └── ScalerRegistry.get_or_create(workload).observe_state(..)
//!
//! request path ──▶ DeploymentManager
//!                    ├── resolve_workload(model)
//!                    ├── request_active(workload)
//!                    └── set_desired_scale(workload, n)
//! ```
//!
//! State is never persisted; it is rebuilt from live observation. Only
//! one manager should drive a given namespace at a time.
//!
//! When two workloads declare the same model, the one reconciled last
//! owns it. That order follows event delivery and is not otherwise
//! resolved.

pub mod cluster;
pub mod config;
pub mod error;
pub mod manager;
pub mod reconcile;
pub mod watcher;
pub mod workload;

pub use cluster::InMemoryCluster;
pub use config::ControllerConfig;
pub use error::{ControllerError, ControllerResult};
pub use manager::DeploymentManager;
pub use reconcile::ReconciliationHandler;
pub use watcher::{resync_all, run_reconcile_loop};
pub use workload::Workload;
