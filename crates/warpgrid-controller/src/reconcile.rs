//! Reconciliation — feeds one observed workload into routing and scaling.
//!
//! Safe to call repeatedly, concurrently and with stale snapshots: the
//! replica count always comes from a live read, never from the snapshot.

use std::sync::Arc;

use tracing::{debug, warn};

use warpgrid_autoscale::{read_replicas, AnnotationPolicy, ScaleTarget, ScalerRegistry};
use warpgrid_proxy::ModelRouter;

use crate::error::ControllerResult;
use crate::workload::Workload;

/// Handles "workload changed" notifications.
pub struct ReconciliationHandler {
    policy: AnnotationPolicy,
    router: ModelRouter,
    registry: Arc<ScalerRegistry>,
    target: Arc<dyn ScaleTarget>,
}

impl ReconciliationHandler {
    pub fn new(
        policy: AnnotationPolicy,
        router: ModelRouter,
        registry: Arc<ScalerRegistry>,
        target: Arc<dyn ScaleTarget>,
    ) -> Self {
        Self {
            policy,
            router,
            registry,
            target,
        }
    }

    /// Reconcile one workload.
    ///
    /// Routing is updated before the live read, so a failed read still
    /// leaves the workload's models resolvable. The read failure is
    /// returned; there is nothing to feed the scaler without it.
    pub async fn reconcile(&self, workload: &Workload) -> ControllerResult<()> {
        let models = self.policy.models(&workload.annotations);
        if !models.is_empty() {
            self.router.update(&models, &workload.name);
        }

        let actual = match read_replicas(self.target.as_ref(), &workload.name).await {
            Ok(actual) => actual,
            Err(e) => {
                warn!(workload = %workload.name, error = %e, "failed to read workload scale");
                return Err(e.into());
            }
        };

        let (min, max) = self.policy.bounds(&workload.annotations);
        self.registry
            .get_or_create(&workload.name)
            .observe_state(actual, min, max);

        debug!(
            workload = %workload.name,
            models = models.len(),
            actual,
            min,
            max,
            "workload reconciled"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::cluster::InMemoryCluster;
    use crate::error::ControllerError;

    fn handler(cluster: &InMemoryCluster) -> (ReconciliationHandler, ModelRouter, Arc<ScalerRegistry>) {
        let target: Arc<dyn ScaleTarget> = Arc::new(cluster.clone());
        let router = ModelRouter::new();
        let registry = Arc::new(ScalerRegistry::new(target.clone(), Duration::from_secs(30)));
        let handler = ReconciliationHandler::new(
            AnnotationPolicy::default(),
            router.clone(),
            registry.clone(),
            target,
        );
        (handler, router, registry)
    }

    #[tokio::test]
    async fn routes_models_and_observes_scale() {
        let cluster = InMemoryCluster::new("default");
        let workload = Workload::new("svc-a")
            .with_annotation("warpgrid.dev/models", "alpha, beta")
            .with_annotation("warpgrid.dev/max-replicas", "5")
            .with_replicas(2);
        cluster.apply(workload.clone());
        let (handler, router, registry) = handler(&cluster);

        handler.reconcile(&workload).await.unwrap();

        assert_eq!(router.resolve("beta").as_deref(), Some("svc-a"));
        let status = registry.get("svc-a").unwrap().status();
        assert_eq!((status.desired, status.actual), (2, Some(2)));
        assert_eq!((status.min, status.max), (0, 5));
    }

    #[tokio::test]
    async fn reads_live_scale_not_snapshot() {
        let cluster = InMemoryCluster::new("default");
        cluster.apply(Workload::new("svc-a").with_replicas(3));
        let (handler, _router, registry) = handler(&cluster);

        let stale = Workload::new("svc-a").with_replicas(0);
        handler.reconcile(&stale).await.unwrap();

        assert_eq!(registry.get("svc-a").unwrap().status().actual, Some(3));
    }

    #[tokio::test]
    async fn workload_without_models_is_still_tracked() {
        let cluster = InMemoryCluster::new("default");
        let workload = Workload::new("batch").with_replicas(1);
        cluster.apply(workload.clone());
        let (handler, router, registry) = handler(&cluster);

        handler.reconcile(&workload).await.unwrap();

        assert!(router.is_empty());
        assert_eq!(registry.get("batch").unwrap().desired(), 1);
    }

    #[tokio::test]
    async fn read_failure_is_reported_after_routing() {
        let cluster = InMemoryCluster::new("default");
        let (handler, router, registry) = handler(&cluster);
        let workload = Workload::new("ghost").with_annotation("warpgrid.dev/models", "alpha");

        let err = handler.reconcile(&workload).await.unwrap_err();

        assert!(matches!(err, ControllerError::Scale(_)));
        assert_eq!(router.resolve("alpha").as_deref(), Some("ghost"));
        assert!(registry.get("ghost").is_none());
    }

    #[tokio::test]
    async fn malformed_bounds_use_defaults() {
        let cluster = InMemoryCluster::new("default");
        let workload = Workload::new("svc-a")
            .with_annotation("warpgrid.dev/min-replicas", "one")
            .with_annotation("warpgrid.dev/max-replicas", "-2");
        cluster.apply(workload.clone());
        let (handler, _router, registry) = handler(&cluster);

        handler.reconcile(&workload).await.unwrap();

        let status = registry.get("svc-a").unwrap().status();
        assert_eq!((status.min, status.max), (0, 3));
    }
}
