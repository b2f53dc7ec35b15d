//! warpgrid-proxy — model-aware request routing for WarpGrid.
//!
//! Callers address models, not workloads. The router keeps the table
//! that maps a model name to the workload currently serving it, fed from
//! workload annotations during reconciliation.
//!
//! # Components
//!
//! - **`router`** — model → workload routing table (last writer wins)

pub mod router;

pub use router::ModelRouter;
