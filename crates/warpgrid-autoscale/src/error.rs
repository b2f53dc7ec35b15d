//! Autoscaler error types.

use thiserror::Error;

/// Errors surfaced by scale reads and writes against the orchestration layer.
#[derive(Debug, Error)]
pub enum ScaleError {
    #[error("get replicas for {workload}: {source}")]
    GetReplicas {
        workload: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("set replicas for {workload} to {replicas}: {source}")]
    SetReplicas {
        workload: String,
        replicas: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("workload not found: {0}")]
    WorkloadNotFound(String),
}

pub type ScaleResult<T> = Result<T, ScaleError>;
