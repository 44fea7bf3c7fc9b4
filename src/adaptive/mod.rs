//! Adaptive weight model: per-category multipliers, fixed thresholds,
//! hyperparameters and bounded training history.

pub mod defaults;
pub mod reinforcement;
pub mod types;

pub use defaults::{StoredConfig, StoredWeights, MODEL_VERSION};
pub use reinforcement::{clamp_weight, WEIGHT_CAP, WEIGHT_FLOOR};
pub use types::{
    AccuracyPoint, AdaptiveModelState, CategoryWeights, InteractionCategories, InteractionOutcome,
    ModelConfig, ModelHistory, ModelWeights, ScoredInteraction, Thresholds, UserCorrection,
    WeightDimension, WeightUpdateEntry,
};
