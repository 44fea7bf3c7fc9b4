//! Reinforcement update for the adaptive weight model.
//!
//! delta(c) = momentum * prev_delta(c) + (1 - momentum) * lr * (observed - risk)
//! w(c)     = clamp(w(c) + delta(c), WEIGHT_FLOOR, WEIGHT_CAP)
//!
//! `observed` is the error rate implied by the score (1 - score/100) and
//! `risk` is the model's prediction for the same categories, so weights
//! move towards categories the learner struggles with more than expected.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};

use super::types::{
    category_key, AccuracyPoint, AdaptiveModelState, InteractionCategories, InteractionOutcome,
    ScoredInteraction, WeightDimension, WeightUpdateEntry,
};

pub const WEIGHT_FLOOR: f64 = 0.1;
pub const WEIGHT_CAP: f64 = 3.0;
pub const NEUTRAL_WEIGHT: f64 = 1.0;

const MAX_MOMENTUM: f64 = 0.99;
const ADAPTIVE_WINDOW: usize = 10;
const LEARNING_RATE_DECAY: f64 = 0.9;
const LEARNING_RATE_RECOVERY: f64 = 1.1;
const MIN_LEARNING_RATE: f64 = 0.001;
const MAX_LEARNING_RATE: f64 = 0.5;

pub fn clamp_weight(value: f64) -> f64 {
    if !value.is_finite() {
        return NEUTRAL_WEIGHT;
    }
    value.clamp(WEIGHT_FLOOR, WEIGHT_CAP)
}

pub(crate) fn push_bounded<T>(ring: &mut VecDeque<T>, item: T, capacity: usize) {
    let capacity = capacity.max(1);
    ring.push_back(item);
    while ring.len() > capacity {
        ring.pop_front();
    }
}

impl AdaptiveModelState {
    /// Error risk in [0, 1] for an interaction touching `categories`.
    ///
    /// Each dimension contributes the mean weight of its involved categories
    /// (unknown categories count as neutral); the product `m` of those means
    /// maps to `m / (1 + m)`, so an all-neutral interaction sits at 0.5.
    pub fn predict_error_risk(&self, categories: &InteractionCategories) -> f64 {
        let involved = categories.involved();
        let mut product = 1.0;

        for dimension in WeightDimension::ALL {
            let weights = self.weights.dimension(dimension);
            let values: Vec<f64> = involved
                .iter()
                .filter(|(dim, _)| *dim == dimension)
                .map(|(_, name)| clamp_weight(weights.get(name).copied().unwrap_or(NEUTRAL_WEIGHT)))
                .collect();
            if !values.is_empty() {
                product *= values.iter().sum::<f64>() / values.len() as f64;
            }
        }

        product / (1.0 + product)
    }

    /// Records one scored interaction and, when enabled, reinforces the weights.
    /// Every call appends one weight update entry and one accuracy point.
    pub fn apply_interaction(
        &mut self,
        interaction: &ScoredInteraction,
        now: DateTime<Utc>,
    ) -> InteractionOutcome {
        let risk = self.predict_error_risk(&interaction.categories);
        let predicted_error = risk >= self.weights.thresholds.error_detection;
        let prediction_correct = predicted_error != interaction.correct;
        let capacity = self.config.max_history_size;

        let history = &mut self.history;
        history.total_interactions += 1;
        if prediction_correct {
            history.correct_predictions += 1;
        }
        history.recompute_incorrect();
        history.last_training_date = Some(now);

        if let Some(correction) = &interaction.user_correction {
            push_bounded(&mut history.user_corrections, correction.clone(), capacity);
        }

        let reinforced = self.config.reinforcement_enabled;
        let update = if reinforced {
            self.updated_at = now;
            self.reinforce(&interaction.categories, interaction.score, risk, now)
        } else {
            WeightUpdateEntry {
                timestamp: now,
                learning_rate: self.config.learning_rate.max(0.0),
                score: interaction.score.min(100),
                risk,
                deltas: BTreeMap::new(),
            }
        };
        push_bounded(&mut self.history.weight_updates, update.clone(), capacity);

        let accuracy = AccuracyPoint {
            timestamp: now,
            accuracy: self.history.accuracy(),
            total_interactions: self.history.total_interactions,
        };
        push_bounded(&mut self.history.accuracy_over_time, accuracy.clone(), capacity);

        if self.config.adaptive_rate_enabled {
            self.adapt_learning_rate();
        }

        InteractionOutcome {
            risk,
            predicted_error,
            prediction_correct,
            reinforced,
            update,
            accuracy,
        }
    }

    fn reinforce(
        &mut self,
        categories: &InteractionCategories,
        score: u32,
        risk: f64,
        now: DateTime<Utc>,
    ) -> WeightUpdateEntry {
        let learning_rate = self.config.learning_rate.max(0.0);
        let momentum = self.config.momentum.clamp(0.0, MAX_MOMENTUM);
        let observed = 1.0 - f64::from(score.min(100)) / 100.0;
        let raw = (observed - risk) * learning_rate;

        let mut deltas = BTreeMap::new();
        for (dimension, name) in categories.involved() {
            let key = category_key(dimension, &name);
            let delta = momentum * self.history.previous_delta(&key) + (1.0 - momentum) * raw;

            let weight = self
                .weights
                .dimension_mut(dimension)
                .entry(name)
                .or_insert(NEUTRAL_WEIGHT);
            *weight = clamp_weight(*weight + delta);

            deltas.insert(key, delta);
        }

        WeightUpdateEntry {
            timestamp: now,
            learning_rate,
            score: score.min(100),
            risk,
            deltas,
        }
    }

    /// Decays the learning rate once recent accuracy durably exceeds
    /// `min_confidence` and recovers it once it durably falls below.
    fn adapt_learning_rate(&mut self) {
        let points = &self.history.accuracy_over_time;
        if points.len() < ADAPTIVE_WINDOW {
            return;
        }

        let min_confidence = self.config.min_confidence;
        let recent = points.iter().rev().take(ADAPTIVE_WINDOW);
        let (above, below) = recent.fold((true, true), |(above, below), point| {
            (above && point.accuracy > min_confidence, below && point.accuracy < min_confidence)
        });

        // The bounds only stop movement; a synced rate outside them is left alone.
        let rate = self.config.learning_rate;
        if above && rate > MIN_LEARNING_RATE {
            self.config.learning_rate = (rate * LEARNING_RATE_DECAY).max(MIN_LEARNING_RATE);
        } else if below && rate < MAX_LEARNING_RATE {
            self.config.learning_rate = (rate * LEARNING_RATE_RECOVERY).min(MAX_LEARNING_RATE);
        }
    }
}
