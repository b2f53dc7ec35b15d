//! Controller configuration (`warpd.toml`).
//!
//! ```toml
//! namespace = "models"
//! annotation_domain = "warpgrid.dev"
//! scale_down_period = "30s"
//! resync_interval = "60s"
//!
//! [[workloads]]
//! name = "llama-8b"
//! replicas = 0
//! annotations = { "warpgrid.dev/models" = "llama-3-8b, llama-3-8b-instruct" }
//! ```
//!
//! Every field is optional. `workloads` only seeds the in-memory cluster
//! used by standalone mode.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use warpgrid_autoscale::annotations::{
    AnnotationPolicy, DEFAULT_DOMAIN, DEFAULT_MAX_REPLICAS, DEFAULT_MIN_REPLICAS,
};

use crate::error::{ControllerError, ControllerResult};
use crate::workload::Workload;

const DEFAULT_SCALE_DOWN_PERIOD: Duration = Duration::from_secs(30);
pub(crate) const DEFAULT_RESYNC_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// The single namespace this controller operates in.
    pub namespace: String,
    /// Prefix of the `models`, `min-replicas` and `max-replicas` annotations.
    pub annotation_domain: String,
    /// Quiet period before a scale-to-zero takes effect (e.g., "30s").
    pub scale_down_period: String,
    /// Full reconcile interval for the standalone loop (e.g., "60s").
    pub resync_interval: String,
    pub default_min_replicas: u32,
    pub default_max_replicas: u32,
    pub workloads: Vec<Workload>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            annotation_domain: DEFAULT_DOMAIN.to_string(),
            scale_down_period: "30s".to_string(),
            resync_interval: "60s".to_string(),
            default_min_replicas: DEFAULT_MIN_REPLICAS,
            default_max_replicas: DEFAULT_MAX_REPLICAS,
            workloads: Vec::new(),
        }
    }
}

impl ControllerConfig {
    pub fn from_file(path: &Path) -> ControllerResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ControllerResult<Self> {
        let config: ControllerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ControllerResult<()> {
        if self.namespace.trim().is_empty() {
            return Err(ControllerError::Config("namespace must not be empty".to_string()));
        }
        if self.annotation_domain.trim().is_empty() {
            return Err(ControllerError::Config(
                "annotation_domain must not be empty".to_string(),
            ));
        }
        if self.resync_interval().is_zero() {
            return Err(ControllerError::Config(
                "resync_interval must be greater than zero".to_string(),
            ));
        }
        for workload in &self.workloads {
            if workload.name.trim().is_empty() {
                return Err(ControllerError::Config(
                    "seed workload with empty name".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn scale_down_period(&self) -> Duration {
        parse_duration(&self.scale_down_period, DEFAULT_SCALE_DOWN_PERIOD)
    }

    pub fn resync_interval(&self) -> Duration {
        parse_duration(&self.resync_interval, DEFAULT_RESYNC_INTERVAL)
    }

    pub fn annotation_policy(&self) -> AnnotationPolicy {
        AnnotationPolicy::new(self.annotation_domain.clone())
            .with_defaults(self.default_min_replicas, self.default_max_replicas)
    }
}

/// Parse a duration string like "500ms", "30s", "5m", or bare seconds.
///
/// Unparseable input falls back to `default`.
pub fn parse_duration(s: &str, default: Duration) -> Duration {
    let s = s.trim();
    let parsed = if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().map(|m| Duration::from_secs(m * 60))
    } else {
        s.parse::<u64>().map(Duration::from_secs)
    };

    parsed.unwrap_or_else(|e| {
        warn!(value = s, error = %e, default_ms = default.as_millis() as u64, "invalid duration, using default");
        default
    })
}
