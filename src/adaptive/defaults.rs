//! Named defaults for every weight category and configuration field.
//!
//! Both store bootstrap and state reconstruction resolve missing values
//! through this table, so a partially persisted model always becomes a
//! complete one.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::types::{
    AdaptiveModelState, CategoryWeights, ModelConfig, ModelHistory, ModelWeights, Thresholds,
    WeightDimension,
};

pub const MODEL_VERSION: &str = "1.0.0";

pub const DEFAULT_PATTERN_WEIGHTS: &[(&str, f64)] = &[
    ("altitude", 1.0),
    ("callsign", 1.0),
    ("frequency", 1.0),
    ("heading", 1.0),
    ("readback", 1.0),
    ("runway", 1.0),
    ("speed", 1.0),
    ("squawk", 1.0),
];

pub const DEFAULT_ERROR_WEIGHTS: &[(&str, f64)] = &[
    ("incorrect_value", 1.0),
    ("missing_callsign", 1.0),
    ("non_standard", 0.8),
    ("omission", 1.0),
    ("substitution", 1.0),
    ("transposition", 1.0),
];

pub const DEFAULT_PHASE_WEIGHTS: &[(&str, f64)] = &[
    ("approach", 1.0),
    ("departure", 1.0),
    ("enroute", 1.0),
    ("general", 1.0),
    ("ground", 1.0),
];

pub const DEFAULT_SEVERITY_WEIGHTS: &[(&str, f64)] = &[
    ("critical", 1.5),
    ("high", 1.2),
    ("medium", 1.0),
    ("low", 0.7),
];

pub const DEFAULT_ERROR_DETECTION_THRESHOLD: f64 = 0.65;
pub const DEFAULT_PHASE_CONFIDENCE_THRESHOLD: f64 = 0.70;
pub const DEFAULT_READBACK_ACCURACY_THRESHOLD: f64 = 0.80;

pub const DEFAULT_LEARNING_RATE: f64 = 0.05;
pub const DEFAULT_MOMENTUM: f64 = 0.9;
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.7;
pub const DEFAULT_ADAPTIVE_RATE_ENABLED: bool = true;
pub const DEFAULT_REINFORCEMENT_ENABLED: bool = true;
pub const DEFAULT_MAX_HISTORY_SIZE: usize = 100;

pub fn default_weights_for(dimension: WeightDimension) -> CategoryWeights {
    let table = match dimension {
        WeightDimension::Pattern => DEFAULT_PATTERN_WEIGHTS,
        WeightDimension::Error => DEFAULT_ERROR_WEIGHTS,
        WeightDimension::Phase => DEFAULT_PHASE_WEIGHTS,
        WeightDimension::Severity => DEFAULT_SEVERITY_WEIGHTS,
    };
    table
        .iter()
        .map(|(name, weight)| (name.to_string(), *weight))
        .collect()
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            error_detection: DEFAULT_ERROR_DETECTION_THRESHOLD,
            phase_confidence: DEFAULT_PHASE_CONFIDENCE_THRESHOLD,
            readback_accuracy: DEFAULT_READBACK_ACCURACY_THRESHOLD,
        }
    }
}

impl Default for ModelWeights {
    fn default() -> Self {
        Self {
            pattern: default_weights_for(WeightDimension::Pattern),
            error: default_weights_for(WeightDimension::Error),
            phase: default_weights_for(WeightDimension::Phase),
            severity: default_weights_for(WeightDimension::Severity),
            thresholds: Thresholds::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            learning_rate: DEFAULT_LEARNING_RATE,
            momentum: DEFAULT_MOMENTUM,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            adaptive_rate_enabled: DEFAULT_ADAPTIVE_RATE_ENABLED,
            reinforcement_enabled: DEFAULT_REINFORCEMENT_ENABLED,
            max_history_size: DEFAULT_MAX_HISTORY_SIZE,
        }
    }
}

impl Default for AdaptiveModelState {
    fn default() -> Self {
        Self {
            version: MODEL_VERSION.to_string(),
            updated_at: Utc::now(),
            weights: ModelWeights::default(),
            config: ModelConfig::default(),
            history: ModelHistory::default(),
        }
    }
}

/// Weights as persisted: every category mapping may be absent or partial.
/// Thresholds are fixed and never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredWeights {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<CategoryWeights>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CategoryWeights>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<CategoryWeights>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<CategoryWeights>,
}

impl StoredWeights {
    fn stored(&self, dimension: WeightDimension) -> Option<&CategoryWeights> {
        match dimension {
            WeightDimension::Pattern => self.pattern.as_ref(),
            WeightDimension::Error => self.error.as_ref(),
            WeightDimension::Phase => self.phase.as_ref(),
            WeightDimension::Severity => self.severity.as_ref(),
        }
    }

    pub fn resolve(&self) -> ModelWeights {
        let mut weights = ModelWeights::default();
        for dimension in WeightDimension::ALL {
            if let Some(stored) = self.stored(dimension) {
                let target = weights.dimension_mut(dimension);
                for (name, value) in stored {
                    if value.is_finite() {
                        target.insert(name.clone(), *value);
                    }
                }
            }
        }
        weights
    }
}

impl From<&ModelWeights> for StoredWeights {
    fn from(weights: &ModelWeights) -> Self {
        Self {
            pattern: Some(weights.pattern.clone()),
            error: Some(weights.error.clone()),
            phase: Some(weights.phase.clone()),
            severity: Some(weights.severity.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub momentum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adaptive_rate_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reinforcement_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_history_size: Option<usize>,
}

impl StoredConfig {
    pub fn resolve(&self) -> ModelConfig {
        ModelConfig {
            learning_rate: self.learning_rate.unwrap_or(DEFAULT_LEARNING_RATE),
            momentum: self.momentum.unwrap_or(DEFAULT_MOMENTUM),
            min_confidence: self.min_confidence.unwrap_or(DEFAULT_MIN_CONFIDENCE),
            adaptive_rate_enabled: self
                .adaptive_rate_enabled
                .unwrap_or(DEFAULT_ADAPTIVE_RATE_ENABLED),
            reinforcement_enabled: self
                .reinforcement_enabled
                .unwrap_or(DEFAULT_REINFORCEMENT_ENABLED),
            max_history_size: self.max_history_size.unwrap_or(DEFAULT_MAX_HISTORY_SIZE),
        }
    }
}

impl From<&ModelConfig> for StoredConfig {
    fn from(config: &ModelConfig) -> Self {
        Self {
            learning_rate: Some(config.learning_rate),
            momentum: Some(config.momentum),
            min_confidence: Some(config.min_confidence),
            adaptive_rate_enabled: Some(config.adaptive_rate_enabled),
            reinforcement_enabled: Some(config.reinforcement_enabled),
            max_history_size: Some(config.max_history_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_severity_filled_from_defaults() {
        let stored: StoredWeights =
            serde_json::from_value(serde_json::json!({ "severity": { "critical": 2.0 } })).unwrap();
        let weights = stored.resolve();

        assert_eq!(weights.severity["critical"], 2.0);
        assert_eq!(weights.severity["high"], 1.2);
        assert_eq!(weights.severity["medium"], 1.0);
        assert_eq!(weights.severity["low"], 0.7);
        assert_eq!(weights.pattern, default_weights_for(WeightDimension::Pattern));
    }

    #[test]
    fn test_empty_storage_resolves_to_defaults() {
        assert_eq!(StoredWeights::default().resolve(), ModelWeights::default());
        assert_eq!(StoredConfig::default().resolve(), ModelConfig::default());
    }

    #[test]
    fn test_partial_config_keeps_given_fields() {
        let stored = StoredConfig {
            learning_rate: Some(0.2),
            reinforcement_enabled: Some(false),
            ..Default::default()
        };
        let config = stored.resolve();
        assert_eq!(config.learning_rate, 0.2);
        assert!(!config.reinforcement_enabled);
        assert_eq!(config.momentum, DEFAULT_MOMENTUM);
        assert_eq!(config.max_history_size, DEFAULT_MAX_HISTORY_SIZE);
    }

    #[test]
    fn test_round_trip_through_stored_form() {
        let mut weights = ModelWeights::default();
        weights.phase.insert("approach".to_string(), 1.8);
        weights.error.insert("readback_swap".to_string(), 0.4);

        let resolved = StoredWeights::from(&weights).resolve();
        assert_eq!(resolved, weights);
    }

    #[test]
    fn test_thresholds_fixed() {
        let thresholds = Thresholds::default();
        assert_eq!(thresholds.error_detection, 0.65);
        assert_eq!(thresholds.phase_confidence, 0.70);
        assert_eq!(thresholds.readback_accuracy, 0.80);
    }
}
