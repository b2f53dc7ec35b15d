//! Scaler — per-workload debounced replica target.
//!
//! Each workload gets one `Scaler`. It owns the desired replica count,
//! the last observed replica count, the declared bounds and at most one
//! pending scale-to-zero timer, all behind a single lock. Scaling up is
//! applied immediately; scaling to zero waits for `scale_down_period`
//! without an intervening activity signal.
//!
//! # States
//!
//! ```text
//!            request_active / set_desired(n > 0)
//!   Cold ─────────────────────────────────────────▶ Warm
//!    ▲                                              │  ▲
//!    │ period elapsed              set_desired(0)   │  │ request_active
//!    │ (desired := 0, apply)       (arm timer)      ▼  │ set_desired(n > 0)
//!    └────────────────────────────────────────── Cooling
//! ```
//!
//! Applies run on a background task. While one is in flight, further
//! changes are coalesced: when it completes, the task sends the latest
//! desired value once more if it moved on, and never sends a stale one.
//!
//! A failed apply is not retried by the task. The scaler remembers that
//! desired is not yet in effect, and the next observation or traffic
//! signal sends it again. Once desired is in effect and nothing is in
//! flight, an observed replica count that differs is an external change
//! and becomes the new desired value.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::annotations::{DEFAULT_MAX_REPLICAS, DEFAULT_MIN_REPLICAS};
use crate::target::ApplyFn;

/// Inclusive replica bounds as declared on the workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: u32,
    pub max: u32,
}

impl Bounds {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Lower bound actually enforced. If `min > max`, max wins.
    pub fn effective_min(&self) -> u32 {
        self.min.min(self.max)
    }

    /// Clamp `n` into `[effective_min, max]`.
    pub fn clamp(&self, n: u32) -> u32 {
        n.clamp(self.effective_min(), self.max)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_REPLICAS, DEFAULT_MAX_REPLICAS)
    }
}

/// Point-in-time view of a scaler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScalerStatus {
    pub workload: String,
    pub desired: u32,
    /// Last replica count observed or successfully applied.
    pub actual: Option<u32>,
    pub min: u32,
    pub max: u32,
    pub effective_min: u32,
    /// A scale-to-zero timer is armed.
    pub cooling: bool,
    /// An apply is running on the background task.
    pub applying: bool,
}

struct Cooldown {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct ApplyState {
    /// The apply task is alive.
    running: bool,
    /// Value currently being sent.
    in_flight: Option<u32>,
    /// Desired moved since the last send started.
    pending: bool,
}

struct ScalerState {
    desired: u32,
    actual: Option<u32>,
    bounds: Bounds,
    /// Set by the first observation or local decision.
    seeded: bool,
    /// `desired` is known to be in effect: observed, or applied successfully.
    in_sync: bool,
    cooldown: Option<Cooldown>,
    generation: u64,
    apply: ApplyState,
}

impl ScalerState {
    fn cancel_cooldown(&mut self) -> bool {
        match self.cooldown.take() {
            Some(cooldown) => {
                cooldown.handle.abort();
                true
            }
            None => false,
        }
    }
}

pub(crate) struct Shared {
    workload: String,
    scale_down_period: Duration,
    apply_fn: ApplyFn,
    state: Mutex<ScalerState>,
}

/// Debounced replica target for one workload.
///
/// Cheap to clone; clones share state. Mutating operations spawn Tokio
/// tasks and must be called from within a runtime.
#[derive(Clone)]
pub struct Scaler {
    pub(crate) shared: Arc<Shared>,
}

impl Scaler {
    /// Create a cold scaler with default bounds.
    pub fn new(workload: &str, scale_down_period: Duration, apply_fn: ApplyFn) -> Self {
        Self {
            shared: Arc::new(Shared {
                workload: workload.to_string(),
                scale_down_period,
                apply_fn,
                state: Mutex::new(ScalerState {
                    desired: 0,
                    actual: None,
                    bounds: Bounds::default(),
                    seeded: false,
                    in_sync: true,
                    cooldown: None,
                    generation: 0,
                    apply: ApplyState::default(),
                }),
            }),
        }
    }

    pub fn workload(&self) -> &str {
        &self.shared.workload
    }

    pub fn scale_down_period(&self) -> Duration {
        self.shared.scale_down_period
    }

    pub fn status(&self) -> ScalerStatus {
        let state = self.lock();
        ScalerStatus {
            workload: self.shared.workload.clone(),
            desired: state.desired,
            actual: state.actual,
            min: state.bounds.min,
            max: state.bounds.max,
            effective_min: state.bounds.effective_min(),
            cooling: state.cooldown.is_some(),
            applying: state.apply.running,
        }
    }

    pub fn desired(&self) -> u32 {
        self.lock().desired
    }

    /// Traffic signal: make sure at least one replica is wanted.
    ///
    /// From cold this raises desired to `max(1, effective_min)` and applies
    /// it. A workload already observed with replicas is warm: its count is
    /// adopted rather than replaced. Otherwise this cancels a pending
    /// scale-to-zero and re-sends a desired value that failed to apply.
    /// Never lowers desired.
    pub fn request_active(&self) {
        let mut state = self.lock();
        state.seeded = true;

        if state.desired == 0 && !state.apply.running {
            if let Some(actual) = state.actual.filter(|&n| n > 0) {
                let adopted = state.bounds.clamp(actual);
                debug!(
                    workload = %self.shared.workload,
                    replicas = actual,
                    "workload already has replicas, adopting them"
                );
                state.desired = adopted;
                state.in_sync = adopted == actual;
            }
        }

        if state.desired > 0 {
            if state.cancel_cooldown() {
                debug!(workload = %self.shared.workload, "activity cancelled scale-down");
            }
            if !state.in_sync {
                info!(
                    workload = %self.shared.workload,
                    replicas = state.desired,
                    "re-sending desired replicas"
                );
                self.schedule_apply(&mut state);
            }
            return;
        }

        let target = state.bounds.clamp(state.bounds.effective_min().max(1));
        if target == 0 {
            warn!(
                workload = %self.shared.workload,
                "activity on workload with max-replicas 0, not scaling up"
            );
            return;
        }

        info!(workload = %self.shared.workload, replicas = target, "activating workload");
        state.desired = target;
        self.schedule_apply(&mut state);
    }

    /// Explicit target from an external decision.
    ///
    /// `n` is clamped into the bounds first. A positive result is applied
    /// immediately and cancels any pending scale-down. Zero is debounced:
    /// it arms the scale-down timer and only takes effect if nothing raises
    /// desired before the period elapses.
    pub fn set_desired(&self, n: u32) {
        let mut state = self.lock();
        state.seeded = true;

        let clamped = state.bounds.clamp(n);
        if clamped != n {
            debug!(
                workload = %self.shared.workload,
                requested = n,
                clamped,
                min = state.bounds.effective_min(),
                max = state.bounds.max,
                "clamped desired replicas"
            );
        }

        if clamped == 0 {
            if state.desired == 0 {
                return;
            }
            if state.cooldown.is_none() {
                self.arm_cooldown(&mut state);
            }
            return;
        }

        if state.cancel_cooldown() {
            debug!(workload = %self.shared.workload, "scale-down cancelled by new target");
        }
        state.desired = clamped;
        self.schedule_apply(&mut state);
    }

    /// Reconcile with externally observed replicas and declared bounds.
    ///
    /// The first observation seeds desired from the live count. Later ones
    /// never touch desired while an apply or a scale-down is pending. When
    /// settled, a differing count is adopted if desired was in effect, and
    /// desired is sent again if its last apply failed. A bounds change that
    /// puts desired out of range re-clamps and applies.
    pub fn observe_state(&self, actual: u32, min: u32, max: u32) {
        let mut state = self.lock();

        if min > max {
            warn!(
                workload = %self.shared.workload,
                min,
                max,
                "min-replicas exceeds max-replicas, using max as the minimum"
            );
        }
        state.bounds = Bounds::new(min, max);
        state.actual = Some(actual);

        let settled = !state.apply.running && state.cooldown.is_none();
        if !state.seeded {
            state.seeded = true;
            state.in_sync = true;
            state.desired = actual;
            debug!(workload = %self.shared.workload, replicas = actual, "seeded from observed replicas");
        } else if actual == state.desired {
            if settled {
                state.in_sync = true;
            }
        } else {
            debug!(
                workload = %self.shared.workload,
                desired = state.desired,
                actual,
                applying = state.apply.running,
                cooling = state.cooldown.is_some(),
                "observed replicas differ from desired"
            );
            if settled && state.in_sync {
                info!(
                    workload = %self.shared.workload,
                    from = state.desired,
                    to = actual,
                    "adopting externally changed replicas"
                );
                state.desired = actual;
            } else if settled {
                info!(
                    workload = %self.shared.workload,
                    replicas = state.desired,
                    actual,
                    "re-sending desired replicas"
                );
                self.schedule_apply(&mut state);
            }
        }

        let clamped = state.bounds.clamp(state.desired);
        if clamped != state.desired {
            info!(
                workload = %self.shared.workload,
                from = state.desired,
                to = clamped,
                min = state.bounds.effective_min(),
                max = state.bounds.max,
                "re-clamping desired replicas to bounds"
            );
            state.desired = clamped;
            if clamped == 0 {
                state.cancel_cooldown();
            }
            self.schedule_apply(&mut state);
        }
    }

    fn lock(&self) -> MutexGuard<'_, ScalerState> {
        self.shared.state.lock().expect("scaler state lock")
    }

    fn arm_cooldown(&self, state: &mut ScalerState) {
        state.cancel_cooldown();
        state.generation += 1;
        let generation = state.generation;
        let period = self.shared.scale_down_period;

        let scaler = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(period).await;
            scaler.on_cooldown_elapsed(generation);
        });
        state.cooldown = Some(Cooldown { generation, handle });

        debug!(
            workload = %self.shared.workload,
            period_ms = period.as_millis() as u64,
            "scale-down armed"
        );
    }

    /// Timer callback. Everything is re-checked under the lock: a timer
    /// that was superseded or cancelled after it woke up does nothing.
    fn on_cooldown_elapsed(&self, generation: u64) {
        let mut state = self.lock();
        match &state.cooldown {
            Some(cooldown) if cooldown.generation == generation => {}
            _ => return,
        }
        state.cooldown = None;

        if state.bounds.effective_min() > 0 {
            debug!(
                workload = %self.shared.workload,
                min = state.bounds.effective_min(),
                "scale-down period elapsed but min-replicas is positive"
            );
            return;
        }

        info!(workload = %self.shared.workload, "idle period elapsed, scaling to zero");
        state.desired = 0;
        self.schedule_apply(&mut state);
    }

    fn schedule_apply(&self, state: &mut ScalerState) {
        state.in_sync = false;
        if state.apply.running {
            state.apply.pending = state.apply.in_flight != Some(state.desired);
            return;
        }

        state.apply.running = true;
        state.apply.pending = true;
        let scaler = self.clone();
        tokio::spawn(async move { scaler.run_apply().await });
    }

    async fn run_apply(self) {
        loop {
            let replicas = {
                let mut state = self.lock();
                if !state.apply.pending {
                    state.apply.running = false;
                    return;
                }
                state.apply.pending = false;
                state.apply.in_flight = Some(state.desired);
                state.desired
            };

            info!(workload = %self.shared.workload, replicas, "scaling workload");
            let result = (self.shared.apply_fn)(replicas).await;

            {
                let mut state = self.lock();
                state.apply.in_flight = None;
                match result {
                    Ok(()) => {
                        state.actual = Some(replicas);
                        if state.desired == replicas {
                            state.in_sync = true;
                        }
                    }
                    Err(e) => warn!(
                        workload = %self.shared.workload,
                        replicas,
                        error = %e,
                        "scaling action failed"
                    ),
                }
            }
        }
    }
}

impl std::fmt::Debug for Scaler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scaler")
            .field("workload", &self.shared.workload)
            .field("scale_down_period", &self.shared.scale_down_period)
            .finish_non_exhaustive()
    }
}
