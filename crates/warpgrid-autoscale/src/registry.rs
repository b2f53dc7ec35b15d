//! Scaler registry — one [`Scaler`] per workload name, created lazily.
//!
//! The map lock only covers create-or-fetch. A returned `Scaler` is a
//! handle to state that lives as long as the registry; callers operate on
//! it without touching the registry again. Entries are never removed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::debug;

use crate::scaler::Scaler;
use crate::target::{bind_apply, ScaleTarget};

/// Owns every scaler, keyed by workload name.
pub struct ScalerRegistry {
    target: Arc<dyn ScaleTarget>,
    scale_down_period: Duration,
    scalers: Mutex<HashMap<String, Scaler>>,
}

impl ScalerRegistry {
    pub fn new(target: Arc<dyn ScaleTarget>, scale_down_period: Duration) -> Self {
        Self {
            target,
            scale_down_period,
            scalers: Mutex::new(HashMap::new()),
        }
    }

    /// Return the scaler for `workload`, creating a cold one if needed.
    ///
    /// At most one scaler is ever constructed per name, however many
    /// callers race on it.
    pub fn get_or_create(&self, workload: &str) -> Scaler {
        let mut scalers = self.scalers.lock().expect("scalers lock");
        if let Some(scaler) = scalers.get(workload) {
            return scaler.clone();
        }

        let apply = bind_apply(self.target.clone(), workload);
        let scaler = Scaler::new(workload, self.scale_down_period, apply);
        scalers.insert(workload.to_string(), scaler.clone());
        debug!(%workload, "scaler created");
        scaler
    }

    /// Look up an existing scaler without creating one.
    pub fn get(&self, workload: &str) -> Option<Scaler> {
        let scalers = self.scalers.lock().expect("scalers lock");
        scalers.get(workload).cloned()
    }

    /// Names of all tracked workloads, sorted.
    pub fn names(&self) -> Vec<String> {
        let scalers = self.scalers.lock().expect("scalers lock");
        let mut names: Vec<String> = scalers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.scalers.lock().expect("scalers lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn scale_down_period(&self) -> Duration {
        self.scale_down_period
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::ScaleFuture;

    struct NoopTarget;

    impl ScaleTarget for NoopTarget {
        fn get_replicas<'a>(&'a self, _workload: &'a str) -> ScaleFuture<'a, u32> {
            Box::pin(async { anyhow::Ok(0) })
        }

        fn set_replicas<'a>(&'a self, _workload: &'a str, _replicas: u32) -> ScaleFuture<'a, ()> {
            Box::pin(async { anyhow::Ok(()) })
        }
    }

    fn registry() -> Arc<ScalerRegistry> {
        Arc::new(ScalerRegistry::new(
            Arc::new(NoopTarget),
            Duration::from_secs(30),
        ))
    }

    #[test]
    fn get_or_create_returns_same_scaler() {
        let registry = registry();

        let a = registry.get_or_create("svc-a");
        let b = registry.get_or_create("svc-a");
        let c = registry.get_or_create("svc-b");

        assert!(Arc::ptr_eq(&a.shared, &b.shared));
        assert!(!Arc::ptr_eq(&a.shared, &c.shared));
        assert_eq!(registry.names(), vec!["svc-a", "svc-b"]);
    }

    #[test]
    fn new_scaler_is_cold_with_registry_period() {
        let registry = registry();
        let scaler = registry.get_or_create("svc-a");

        assert_eq!(scaler.workload(), "svc-a");
        assert_eq!(scaler.desired(), 0);
        assert_eq!(scaler.scale_down_period(), Duration::from_secs(30));
    }

    #[test]
    fn get_does_not_create() {
        let registry = registry();

        assert!(registry.get("svc-a").is_none());
        assert!(registry.is_empty());

        registry.get_or_create("svc-a");
        assert!(registry.get("svc-a").is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn concurrent_get_or_create_builds_one_scaler() {
        let registry = registry();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.get_or_create("svc-a"))
            })
            .collect();
        let scalers: Vec<Scaler> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(registry.len(), 1);
        for scaler in &scalers[1..] {
            assert!(Arc::ptr_eq(&scalers[0].shared, &scaler.shared));
        }
    }
}
