// huntwarden/src/anomaly/features.rs
//
// Feature schemas: which player fields feed a model, their read-time defaults,
// and the range a legitimate player occupies (used to synthesise the training
// baseline).
//
//   ACTIVITY_FEATURES  14 dims: /analyze-behavior, clustering, eval
//   BEHAVIOR_FEATURES   9 dims: comprehensive-verification behavior check

use serde_json::{Map, Value};

use crate::events::PlayerData;

pub struct FeatureSpec {
    pub name:     &'static str,
    pub default:  f64,
    /// Uniform range of the legitimate baseline population.
    pub baseline: (f64, f64),
    get:          fn(&PlayerData) -> Option<f64>,
}

impl FeatureSpec {
    pub fn read(&self, p: &PlayerData) -> f64 {
        (self.get)(p).unwrap_or(self.default)
    }
}

pub type Schema = &'static [FeatureSpec];

// Indexes into ACTIVITY_FEATURES used by the anomaly classifier
pub const IDX_SOLVING_TIME: usize = 0;
pub const IDX_SUCCESS_RATE: usize = 3;
pub const IDX_MOVEMENT:     usize = 6;
pub const IDX_HINT_USAGE:   usize = 9;

pub const ACTIVITY_FEATURES: Schema = &[
    FeatureSpec { name: "avg_solving_time",         default: 180.0,  baseline: (90.0, 420.0),   get: |p| p.mean_solving_time() },
    FeatureSpec { name: "time_variance",            default: 60.0,   baseline: (20.0, 150.0),   get: |p| p.time_variance },
    FeatureSpec { name: "session_duration_avg",     default: 1200.0, baseline: (600.0, 3600.0), get: |p| p.session_duration_avg },
    FeatureSpec { name: "success_rate",             default: 0.5,    baseline: (0.25, 0.85),    get: |p| p.success_rate },
    FeatureSpec { name: "streak_consistency",       default: 0.5,    baseline: (0.2, 0.8),      get: |p| p.streak_consistency },
    FeatureSpec { name: "failure_recovery_time",    default: 300.0,  baseline: (120.0, 900.0),  get: |p| p.failure_recovery_time },
    FeatureSpec { name: "movement_efficiency",      default: 0.5,    baseline: (0.3, 0.85),     get: |p| p.movement_efficiency },
    FeatureSpec { name: "location_accuracy_avg",    default: 0.8,    baseline: (0.6, 0.95),     get: |p| p.location_accuracy_avg },
    FeatureSpec { name: "unusual_movements",        default: 0.0,    baseline: (0.0, 2.0),      get: |p| p.unusual_movements },
    FeatureSpec { name: "hint_usage_rate",          default: 0.3,    baseline: (0.1, 0.6),      get: |p| p.hint_usage_rate },
    FeatureSpec { name: "retry_frequency",          default: 0.2,    baseline: (0.05, 0.45),    get: |p| p.retry_frequency },
    FeatureSpec { name: "exploration_thoroughness", default: 0.6,    baseline: (0.35, 0.9),     get: |p| p.exploration_thoroughness },
    FeatureSpec { name: "device_consistency",       default: 1.0,    baseline: (0.8, 1.0),      get: |p| p.device_consistency },
    FeatureSpec { name: "connection_stability",     default: 0.9,    baseline: (0.7, 1.0),      get: |p| p.connection_stability },
];

pub const BEHAVIOR_FEATURES: Schema = &[
    FeatureSpec { name: "avg_clue_solving_time",    default: 180.0,  baseline: (90.0, 420.0),   get: |p| p.avg_clue_solving_time.or_else(|| p.mean_solving_time()) },
    FeatureSpec { name: "success_rate",             default: 0.5,    baseline: (0.25, 0.85),    get: |p| p.success_rate },
    FeatureSpec { name: "hint_usage_rate",          default: 0.3,    baseline: (0.1, 0.6),      get: |p| p.hint_usage_rate },
    FeatureSpec { name: "movement_efficiency",      default: 0.5,    baseline: (0.3, 0.85),     get: |p| p.movement_efficiency },
    FeatureSpec { name: "session_duration_avg",     default: 1200.0, baseline: (600.0, 3600.0), get: |p| p.session_duration_avg },
    FeatureSpec { name: "streak_length",            default: 1.0,    baseline: (0.0, 6.0),      get: |p| p.streak_length },
    FeatureSpec { name: "location_accuracy",        default: 0.8,    baseline: (0.6, 0.95),     get: |p| p.location_accuracy.or(p.location_accuracy_avg) },
    FeatureSpec { name: "time_between_clues",       default: 300.0,  baseline: (120.0, 900.0),  get: |p| p.time_between_clues },
    FeatureSpec { name: "exploration_thoroughness", default: 0.6,    baseline: (0.35, 0.9),     get: |p| p.exploration_thoroughness },
];

pub fn extract(schema: Schema, p: &PlayerData) -> Vec<f64> {
    schema.iter().map(|f| f.read(p)).collect()
}

/// Name → value map for API responses.
pub fn named(schema: Schema, values: &[f64]) -> Map<String, Value> {
    schema.iter().zip(values)
        .map(|(f, v)| (f.name.to_string(), Value::from(*v)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let v = extract(ACTIVITY_FEATURES, &PlayerData::default());
        assert_eq!(v.len(), 14);
        assert_eq!(v[IDX_SOLVING_TIME], 180.0);
        assert_eq!(v[IDX_HINT_USAGE], 0.3);
        assert_eq!(extract(BEHAVIOR_FEATURES, &PlayerData::default()).len(), 9);
    }

    #[test]
    fn defaults_sit_inside_baseline() {
        for schema in [ACTIVITY_FEATURES, BEHAVIOR_FEATURES] {
            for f in schema {
                assert!(f.default >= f.baseline.0 && f.default <= f.baseline.1, "{}", f.name);
            }
        }
    }
}
