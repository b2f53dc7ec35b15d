//! Deployment manager — the controller's public surface.
//!
//! Owns the scaler registry and the model router, and exposes the three
//! operations external collaborators call (resolve a model, signal
//! traffic, set an explicit scale) alongside the reconcile entry point.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use warpgrid_autoscale::{ScaleTarget, ScalerRegistry, ScalerStatus};
use warpgrid_proxy::ModelRouter;

use crate::config::ControllerConfig;
use crate::error::ControllerResult;
use crate::reconcile::ReconciliationHandler;
use crate::workload::Workload;

/// Scaling and routing state for every model workload in one namespace.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct DeploymentManager {
    router: ModelRouter,
    registry: Arc<ScalerRegistry>,
    handler: Arc<ReconciliationHandler>,
}

impl DeploymentManager {
    pub fn new(config: &ControllerConfig, target: Arc<dyn ScaleTarget>) -> Self {
        let router = ModelRouter::new();
        let registry = Arc::new(ScalerRegistry::new(
            target.clone(),
            config.scale_down_period(),
        ));
        let handler = Arc::new(ReconciliationHandler::new(
            config.annotation_policy(),
            router.clone(),
            registry.clone(),
            target,
        ));

        info!(
            namespace = %config.namespace,
            domain = %config.annotation_domain,
            scale_down_period_ms = config.scale_down_period().as_millis() as u64,
            "deployment manager initialized"
        );

        Self {
            router,
            registry,
            handler,
        }
    }

    /// Workload serving `model`, or `None` if no workload declares it.
    pub fn resolve_workload(&self, model: &str) -> Option<String> {
        let workload = self.router.resolve(model);
        if workload.is_none() {
            debug!(%model, "model not found");
        }
        workload
    }

    /// Signal traffic for `workload`: at least one replica is needed.
    pub fn request_active(&self, workload: &str) {
        self.registry.get_or_create(workload).request_active();
    }

    /// Explicit scale command, clamped to the workload's bounds.
    pub fn set_desired_scale(&self, workload: &str, replicas: u32) {
        self.registry.get_or_create(workload).set_desired(replicas);
    }

    /// Reconcile one observed workload.
    pub async fn reconcile(&self, workload: &Workload) -> ControllerResult<()> {
        self.handler.reconcile(workload).await
    }

    /// Status of a tracked workload's scaler. Does not create one.
    pub fn scaler_status(&self, workload: &str) -> Option<ScalerStatus> {
        self.registry.get(workload).map(|s| s.status())
    }

    /// Names of every workload with a scaler.
    pub fn workloads(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Status of every tracked scaler, sorted by workload name.
    pub fn statuses(&self) -> Vec<ScalerStatus> {
        self.registry
            .names()
            .iter()
            .filter_map(|name| self.scaler_status(name))
            .collect()
    }

    /// The model → workload routing table.
    pub fn models(&self) -> BTreeMap<String, String> {
        self.router.models()
    }
}
