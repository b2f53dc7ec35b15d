//! In-memory cluster — workload objects plus their scale sub-resource.
//!
//! Backs standalone mode and tests. Every change to a workload (annotations or
//! replica count) is announced on a broadcast channel by name, the way a
//! watch would deliver it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::broadcast;
use tracing::debug;

use warpgrid_autoscale::{ScaleError, ScaleFuture, ScaleTarget};

use crate::workload::Workload;

const EVENT_CAPACITY: usize = 256;

/// Workloads of a single namespace, held in memory.
#[derive(Clone)]
pub struct InMemoryCluster {
    namespace: String,
    workloads: Arc<RwLock<HashMap<String, Workload>>>,
    history: Arc<Mutex<Vec<(String, u32)>>>,
    events: broadcast::Sender<String>,
}

impl InMemoryCluster {
    pub fn new(namespace: &str) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            namespace: namespace.to_string(),
            workloads: Arc::new(RwLock::new(HashMap::new())),
            history: Arc::new(Mutex::new(Vec::new())),
            events,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Create or replace a workload and announce the change.
    pub fn apply(&self, workload: Workload) {
        let name = workload.name.clone();
        {
            let mut workloads = self.workloads.write().expect("workloads lock");
            workloads.insert(name.clone(), workload);
        }
        debug!(namespace = %self.namespace, workload = %name, "workload applied");
        self.notify(name);
    }

    pub fn get(&self, name: &str) -> Option<Workload> {
        let workloads = self.workloads.read().expect("workloads lock");
        workloads.get(name).cloned()
    }

    /// All workloads, sorted by name.
    pub fn list(&self) -> Vec<Workload> {
        let workloads = self.workloads.read().expect("workloads lock");
        let mut list: Vec<Workload> = workloads.values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    /// Subscribe to change notifications (workload names).
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.events.subscribe()
    }

    /// Every replica change made through the scale sub-resource, in order.
    pub fn scale_history(&self) -> Vec<(String, u32)> {
        self.history.lock().expect("history lock").clone()
    }

    fn notify(&self, name: String) {
        // No subscribers is fine.
        let _ = self.events.send(name);
    }

    fn replicas(&self, name: &str) -> Result<u32, ScaleError> {
        let workloads = self.workloads.read().expect("workloads lock");
        workloads
            .get(name)
            .map(|w| w.replicas)
            .ok_or_else(|| ScaleError::WorkloadNotFound(name.to_string()))
    }

    fn scale(&self, name: &str, replicas: u32) -> Result<bool, ScaleError> {
        let mut workloads = self.workloads.write().expect("workloads lock");
        let workload = workloads
            .get_mut(name)
            .ok_or_else(|| ScaleError::WorkloadNotFound(name.to_string()))?;

        if workload.replicas == replicas {
            return Ok(false);
        }
        workload.replicas = replicas;
        self.history
            .lock()
            .expect("history lock")
            .push((name.to_string(), replicas));
        Ok(true)
    }
}

impl ScaleTarget for InMemoryCluster {
    fn get_replicas<'a>(&'a self, workload: &'a str) -> ScaleFuture<'a, u32> {
        Box::pin(async move { self.replicas(workload).map_err(anyhow::Error::from) })
    }

    fn set_replicas<'a>(&'a self, workload: &'a str, replicas: u32) -> ScaleFuture<'a, ()> {
        Box::pin(async move {
            if self.scale(workload, replicas)? {
                debug!(namespace = %self.namespace, %workload, replicas, "scale updated");
                self.notify(workload.to_string());
            }
            anyhow::Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_and_set_replicas() {
        let cluster = InMemoryCluster::new("default");
        cluster.apply(Workload::new("svc-a").with_replicas(1));

        assert_eq!(cluster.get_replicas("svc-a").await.unwrap(), 1);
        cluster.set_replicas("svc-a", 3).await.unwrap();
        assert_eq!(cluster.get("svc-a").unwrap().replicas, 3);
        assert_eq!(cluster.scale_history(), vec![("svc-a".to_string(), 3)]);
    }

    #[tokio::test]
    async fn set_replicas_is_idempotent() {
        let cluster = InMemoryCluster::new("default");
        cluster.apply(Workload::new("svc-a").with_replicas(2));
        let mut events = cluster.subscribe();

        cluster.set_replicas("svc-a", 2).await.unwrap();
        cluster.set_replicas("svc-a", 2).await.unwrap();

        assert!(cluster.scale_history().is_empty());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn unknown_workload_is_an_error() {
        let cluster = InMemoryCluster::new("default");

        let err = cluster.get_replicas("missing").await.unwrap_err();
        assert!(err.to_string().contains("missing"));
        assert!(cluster.set_replicas("missing", 1).await.is_err());
    }

    #[tokio::test]
    async fn changes_are_announced() {
        let cluster = InMemoryCluster::new("default");
        let mut events = cluster.subscribe();

        cluster.apply(Workload::new("svc-a"));
        cluster.set_replicas("svc-a", 1).await.unwrap();

        assert_eq!(events.recv().await.unwrap(), "svc-a");
        assert_eq!(events.recv().await.unwrap(), "svc-a");
    }

    #[test]
    fn list_is_sorted() {
        let cluster = InMemoryCluster::new("default");
        cluster.apply(Workload::new("svc-b"));
        cluster.apply(Workload::new("svc-a"));

        let names: Vec<String> = cluster.list().into_iter().map(|w| w.name).collect();
        assert_eq!(names, vec!["svc-a", "svc-b"]);
    }
}
