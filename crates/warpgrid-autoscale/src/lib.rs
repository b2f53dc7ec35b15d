//! warpgrid-autoscale — traffic-driven replica scaling for model workloads.
//!
//! Keeps one debounced replica target per workload and drives the
//! orchestration layer toward it through a [`ScaleTarget`].
//!
//! # Architecture
//!
//! ```text
//! ScalerRegistry
//!   ├── ScaleTarget (get/set replica count, injected)
//!   └── Per-workload Scaler (lazily created)
//!       ├── desired / actual replicas + bounds  (one lock)
//!       ├── scale-to-zero cooldown timer        (at most one)
//!       └── apply task                          (coalesces changes)
//! ```
//!
//! # Scaling Rules
//!
//! ```text
//! request_active():   desired == 0  → desired = max(1, min), apply now
//!                     desired  > 0  → cancel pending scale-to-zero
//! set_desired(n):     n' = clamp(n, min(min, max), max)
//!                     n' > 0        → apply now, cancel scale-to-zero
//!                     n' == 0       → apply 0 after scale_down_period
//! observe_state(..):  update bounds, re-clamp, log drift
//! ```
//!
//! Scale-up is never debounced. Only the transition to zero waits, since
//! it is the one that flaps when traffic returns right after it.
//!
//! Workload annotations supply model names and bounds; see [`annotations`].

pub mod annotations;
pub mod error;
pub mod registry;
pub mod scaler;
pub mod target;

pub use annotations::{AnnotationPolicy, Annotations};
pub use error::{ScaleError, ScaleResult};
pub use registry::ScalerRegistry;
pub use scaler::{Bounds, Scaler, ScalerStatus};
pub use target::{bind_apply, read_replicas, ApplyFn, ScaleFuture, ScaleTarget};
