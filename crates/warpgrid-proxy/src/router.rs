//! Model routing — resolves model names to the workload serving them.
//!
//! A workload may serve several models; each model is served by exactly
//! one workload at a time. Updates overwrite: when two workloads declare
//! the same model, whichever was reconciled last owns it.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use tracing::debug;

/// Routing table from model name to workload name.
///
/// Cheap to clone; clones share the table. Lookups take a read lock and
/// never wait on each other.
#[derive(Clone, Default)]
pub struct ModelRouter {
    models: Arc<RwLock<HashMap<String, String>>>,
}

impl ModelRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point every model in `models` at `workload`.
    pub fn update(&self, models: &[String], workload: &str) {
        let mut table = self.models.write().expect("models lock");
        for model in models {
            match table.insert(model.clone(), workload.to_string()) {
                Some(previous) if previous != workload => debug!(
                    %model,
                    %previous,
                    %workload,
                    "model reassigned to another workload"
                ),
                Some(_) => {}
                None => debug!(%model, %workload, "model registered"),
            }
        }
    }

    /// Workload currently serving `model`, if any.
    pub fn resolve(&self, model: &str) -> Option<String> {
        let table = self.models.read().expect("models lock");
        table.get(model).cloned()
    }

    /// Snapshot of the whole table, sorted by model name.
    pub fn models(&self) -> BTreeMap<String, String> {
        let table = self.models.read().expect("models lock");
        table
            .iter()
            .map(|(model, workload)| (model.clone(), workload.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.models.read().expect("models lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(models: &[&str]) -> Vec<String> {
        models.iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn update_then_resolve() {
        let router = ModelRouter::new();
        router.update(&names(&["alpha", "beta"]), "svc-a");

        assert_eq!(router.resolve("alpha").as_deref(), Some("svc-a"));
        assert_eq!(router.resolve("beta").as_deref(), Some("svc-a"));
        assert_eq!(router.len(), 2);
    }

    #[test]
    fn unknown_model_is_not_found() {
        let router = ModelRouter::new();
        assert!(router.resolve("nonexistent").is_none());
        assert!(router.is_empty());
    }

    #[test]
    fn last_writer_wins() {
        let router = ModelRouter::new();
        router.update(&names(&["alpha"]), "svc-a");
        router.update(&names(&["alpha"]), "svc-b");

        assert_eq!(router.resolve("alpha").as_deref(), Some("svc-b"));
        assert_eq!(router.len(), 1);
    }

    #[test]
    fn update_leaves_other_models_alone() {
        let router = ModelRouter::new();
        router.update(&names(&["alpha", "beta"]), "svc-a");
        router.update(&names(&["gamma"]), "svc-b");

        let table = router.models();
        assert_eq!(
            table.into_iter().collect::<Vec<_>>(),
            vec![
                ("alpha".to_string(), "svc-a".to_string()),
                ("beta".to_string(), "svc-a".to_string()),
                ("gamma".to_string(), "svc-b".to_string()),
            ]
        );
    }

    #[test]
    fn clones_share_the_table() {
        let router = ModelRouter::new();
        let reader = router.clone();
        router.update(&names(&["alpha"]), "svc-a");

        assert_eq!(reader.resolve("alpha").as_deref(), Some("svc-a"));
    }

    #[test]
    fn concurrent_readers_and_writers() {
        let router = ModelRouter::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let router = router.clone();
                std::thread::spawn(move || {
                    let model = format!("model-{i}");
                    router.update(&[model.clone()], &format!("svc-{i}"));
                    for _ in 0..100 {
                        assert!(router.resolve(&model).is_some());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(router.len(), 8);
    }
}
