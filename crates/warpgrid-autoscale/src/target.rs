//! Scale target — the orchestration layer's replica-count sub-resource.
//!
//! The autoscaler never talks to the cluster directly. It reads and writes
//! replica counts through a [`ScaleTarget`], injected for testability, and
//! binds it to one workload name per scaler via [`bind_apply`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{ScaleError, ScaleResult};

/// Boxed future returned by [`ScaleTarget`] operations.
pub type ScaleFuture<'a, T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send + 'a>>;

/// Read and write the replica count of a named workload.
///
/// `set_replicas` must be idempotent: setting the value already in effect
/// is a no-op from the caller's point of view.
pub trait ScaleTarget: Send + Sync {
    /// Current replica count of `workload`.
    fn get_replicas<'a>(&'a self, workload: &'a str) -> ScaleFuture<'a, u32>;

    /// Set the replica count of `workload` to `replicas`.
    fn set_replicas<'a>(&'a self, workload: &'a str, replicas: u32) -> ScaleFuture<'a, ()>;
}

/// Boxed future returned by an [`ApplyFn`].
pub type BoxFuture = Pin<Box<dyn Future<Output = ScaleResult<()>> + Send>>;

/// Apply function for a single workload: called with the target replica count.
pub type ApplyFn = Arc<dyn Fn(u32) -> BoxFuture + Send + Sync>;

/// Bind a scale target to one workload name.
pub fn bind_apply(target: Arc<dyn ScaleTarget>, workload: &str) -> ApplyFn {
    let workload = workload.to_string();
    Arc::new(move |replicas| -> BoxFuture {
        let target = target.clone();
        let workload = workload.clone();
        Box::pin(async move {
            target
                .set_replicas(&workload, replicas)
                .await
                .map_err(|source| ScaleError::SetReplicas {
                    workload,
                    replicas,
                    source,
                })
        })
    })
}

/// Read the live replica count, wrapping failures with the workload name.
pub async fn read_replicas(target: &dyn ScaleTarget, workload: &str) -> ScaleResult<u32> {
    target
        .get_replicas(workload)
        .await
        .map_err(|source| ScaleError::GetReplicas {
            workload: workload.to_string(),
            source,
        })
}
