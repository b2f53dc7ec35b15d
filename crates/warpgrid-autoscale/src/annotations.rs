//! Annotation policy — maps workload metadata to served models and bounds.
//!
//! Three keys are recognised under a fixed domain prefix:
//!
//! | Key | Meaning | Default |
//! |---|---|---|
//! | `<domain>/models` | comma-separated model names | none |
//! | `<domain>/min-replicas` | non-negative integer | 0 |
//! | `<domain>/max-replicas` | non-negative integer | 3 |
//!
//! Nothing here fails: absent or malformed values resolve to defaults.

use std::collections::HashMap;

use tracing::warn;

/// Workload annotations (metadata key → value).
pub type Annotations = HashMap<String, String>;

/// Default annotation domain.
pub const DEFAULT_DOMAIN: &str = "warpgrid.dev";

/// Default lower replica bound when the annotation is absent.
pub const DEFAULT_MIN_REPLICAS: u32 = 0;

/// Default upper replica bound when the annotation is absent.
pub const DEFAULT_MAX_REPLICAS: u32 = 3;

/// Reads model names and replica bounds from workload annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationPolicy {
    domain: String,
    default_min: u32,
    default_max: u32,
}

impl AnnotationPolicy {
    /// Create a policy for the given annotation domain with the standard defaults.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            default_min: DEFAULT_MIN_REPLICAS,
            default_max: DEFAULT_MAX_REPLICAS,
        }
    }

    /// Override the defaults used when bound annotations are missing.
    pub fn with_defaults(mut self, min: u32, max: u32) -> Self {
        self.default_min = min;
        self.default_max = max;
        self
    }

    pub fn models_key(&self) -> String {
        format!("{}/models", self.domain)
    }

    pub fn min_replicas_key(&self) -> String {
        format!("{}/min-replicas", self.domain)
    }

    pub fn max_replicas_key(&self) -> String {
        format!("{}/max-replicas", self.domain)
    }

    /// Model names served by a workload, in declaration order.
    pub fn models(&self, annotations: &Annotations) -> Vec<String> {
        parse_models(annotations, &self.models_key())
    }

    /// Declared `(min, max)` replica bounds, defaulted where absent or invalid.
    ///
    /// No reconciliation of min against max happens here; the scaler owns that.
    pub fn bounds(&self, annotations: &Annotations) -> (u32, u32) {
        let min = parse_bound(annotations, &self.min_replicas_key(), self.default_min);
        let max = parse_bound(annotations, &self.max_replicas_key(), self.default_max);
        (min, max)
    }
}

impl Default for AnnotationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_DOMAIN)
    }
}

/// Split a comma-separated model list, trimming whitespace around entries.
///
/// An absent key or an empty value yields no models. Blank entries
/// (`"a,,b"`) are skipped.
pub fn parse_models(annotations: &Annotations, key: &str) -> Vec<String> {
    let Some(csv) = annotations.get(key) else {
        return Vec::new();
    };

    csv.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a non-negative integer annotation, falling back to `default`.
pub fn parse_bound(annotations: &Annotations, key: &str, default: u32) -> u32 {
    let Some(raw) = annotations.get(key) else {
        return default;
    };

    match raw.trim().parse::<u32>() {
        Ok(value) => value,
        Err(e) => {
            warn!(
                annotation = key,
                value = %raw,
                default,
                error = %e,
                "invalid replica bound annotation, using default"
            );
            default
        }
    }
}
