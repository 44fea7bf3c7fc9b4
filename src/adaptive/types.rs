use std::collections::{BTreeMap, BTreeSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category name -> multiplicative weight.
pub type CategoryWeights = BTreeMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightDimension {
    Pattern,
    Error,
    Phase,
    Severity,
}

impl WeightDimension {
    pub const ALL: [WeightDimension; 4] = [
        WeightDimension::Pattern,
        WeightDimension::Error,
        WeightDimension::Phase,
        WeightDimension::Severity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pattern => "pattern",
            Self::Error => "error",
            Self::Phase => "phase",
            Self::Severity => "severity",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    pub error_detection: f64,
    pub phase_confidence: f64,
    pub readback_accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelWeights {
    pub pattern: CategoryWeights,
    pub error: CategoryWeights,
    pub phase: CategoryWeights,
    pub severity: CategoryWeights,
    pub thresholds: Thresholds,
}

impl ModelWeights {
    pub fn dimension(&self, dimension: WeightDimension) -> &CategoryWeights {
        match dimension {
            WeightDimension::Pattern => &self.pattern,
            WeightDimension::Error => &self.error,
            WeightDimension::Phase => &self.phase,
            WeightDimension::Severity => &self.severity,
        }
    }

    pub fn dimension_mut(&mut self, dimension: WeightDimension) -> &mut CategoryWeights {
        match dimension {
            WeightDimension::Pattern => &mut self.pattern,
            WeightDimension::Error => &mut self.error,
            WeightDimension::Phase => &mut self.phase,
            WeightDimension::Severity => &mut self.severity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    pub learning_rate: f64,
    pub momentum: f64,
    pub min_confidence: f64,
    pub adaptive_rate_enabled: bool,
    pub reinforcement_enabled: bool,
    pub max_history_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCorrection {
    pub original: String,
    pub corrected: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightUpdateEntry {
    pub timestamp: DateTime<Utc>,
    pub learning_rate: f64,
    pub score: u32,
    pub risk: f64,
    /// Keyed by `dimension:category`.
    pub deltas: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccuracyPoint {
    pub timestamp: DateTime<Utc>,
    pub accuracy: f64,
    pub total_interactions: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelHistory {
    pub total_interactions: u64,
    pub correct_predictions: u64,
    pub incorrect_predictions: u64,
    pub user_corrections: VecDeque<UserCorrection>,
    pub weight_updates: VecDeque<WeightUpdateEntry>,
    pub accuracy_over_time: VecDeque<AccuracyPoint>,
    pub last_training_date: Option<DateTime<Utc>>,
}

impl ModelHistory {
    pub fn recompute_incorrect(&mut self) {
        self.incorrect_predictions = self
            .total_interactions
            .saturating_sub(self.correct_predictions);
    }

    pub fn accuracy(&self) -> f64 {
        if self.total_interactions == 0 {
            return 0.0;
        }
        self.correct_predictions as f64 / self.total_interactions as f64
    }

    /// Delta most recently applied to `key`, or 0 once it has left the ring.
    pub fn previous_delta(&self, key: &str) -> f64 {
        self.weight_updates
            .iter()
            .rev()
            .find_map(|entry| entry.deltas.get(key).copied())
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveModelState {
    pub version: String,
    pub updated_at: DateTime<Utc>,
    pub weights: ModelWeights,
    pub config: ModelConfig,
    pub history: ModelHistory,
}

/// Categories touched by one scored interaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionCategories {
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
}

impl InteractionCategories {
    pub fn involved(&self) -> BTreeSet<(WeightDimension, String)> {
        let mut set = BTreeSet::new();
        if let Some(pattern) = &self.pattern {
            set.insert((WeightDimension::Pattern, pattern.clone()));
        }
        for error in &self.errors {
            set.insert((WeightDimension::Error, error.clone()));
        }
        if let Some(phase) = &self.phase {
            set.insert((WeightDimension::Phase, phase.clone()));
        }
        if let Some(severity) = &self.severity {
            set.insert((WeightDimension::Severity, severity.clone()));
        }
        set
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredInteraction {
    #[serde(default)]
    pub categories: InteractionCategories,
    pub score: u32,
    pub correct: bool,
    #[serde(default)]
    pub user_correction: Option<UserCorrection>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionOutcome {
    pub risk: f64,
    pub predicted_error: bool,
    pub prediction_correct: bool,
    /// False when reinforcement is disabled; `update.deltas` is then empty.
    pub reinforced: bool,
    pub update: WeightUpdateEntry,
    pub accuracy: AccuracyPoint,
}

pub fn category_key(dimension: WeightDimension, name: &str) -> String {
    format!("{}:{}", dimension.as_str(), name)
}
