//! Reconciles the in-memory adaptive model with the durable store.
//!
//! Every operation is addressed by an explicit model identifier; nothing
//! here caches state between calls, so the store stays the single source
//! of truth.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection};

use crate::adaptive::{
    AdaptiveModelState, InteractionOutcome, ModelHistory, ScoredInteraction, StoredConfig,
    StoredWeights, UserCorrection, WeightUpdateEntry, MODEL_VERSION,
};
use crate::db::operations::{
    self, parse_timestamp, CorpusFilter, CorpusStats, NewTrainingExample, TrainingExample,
    DEFAULT_PHASE, IMPORT_SOURCE,
};
use crate::db::schema::MODEL_TABLES;
use crate::db::DatabaseProxy;

const RECENT_CORRECTIONS: usize = 5;
const RECENT_WEIGHT_UPDATES: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("{0}")]
    Validation(String),
    #[error("{context}: {source}")]
    Persistence {
        context: &'static str,
        source: sqlx::Error,
    },
    #[error("{context}: {source}")]
    Serialization {
        context: &'static str,
        source: serde_json::Error,
    },
}

impl SyncError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

fn persistence(context: &'static str) -> impl FnOnce(sqlx::Error) -> SyncError {
    move |source| SyncError::Persistence { context, source }
}

fn serialization(context: &'static str) -> impl FnOnce(serde_json::Error) -> SyncError {
    move |source| SyncError::Serialization { context, source }
}

/// Model state as submitted by a client. Only `weights` is mandatory;
/// history and thresholds are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStateInput {
    #[serde(default)]
    pub weights: Option<StoredWeights>,
    #[serde(default)]
    pub config: Option<StoredConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusExampleInput {
    pub atc: String,
    pub pilot: String,
    pub is_correct: bool,
    #[serde(default)]
    pub phase: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStats {
    pub total_interactions: u64,
    pub correct_predictions: u64,
    pub incorrect_predictions: u64,
    pub accuracy: f64,
    pub weight_update_count: usize,
    pub user_correction_count: usize,
    pub last_training_date: Option<DateTime<Utc>>,
}

impl ModelStats {
    pub fn from_history(history: &ModelHistory) -> Self {
        Self {
            total_interactions: history.total_interactions,
            correct_predictions: history.correct_predictions,
            incorrect_predictions: history
                .total_interactions
                .saturating_sub(history.correct_predictions),
            accuracy: history.accuracy(),
            weight_update_count: history.weight_updates.len(),
            user_correction_count: history.user_corrections.len(),
            last_training_date: history.last_training_date,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
    pub model_id: String,
    pub version: String,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub stats: ModelStats,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub corrections: Vec<UserCorrection>,
    pub weight_updates: Vec<WeightUpdateEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatus {
    pub corpus: CorpusStats,
    pub model: ModelSummary,
    pub recent: RecentActivity,
}

#[derive(Debug, Clone)]
pub struct InitializeOutcome {
    pub tables: Vec<&'static str>,
    pub installed_defaults: bool,
}

#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub requested: usize,
    pub stored: u64,
    pub corpus_stats: CorpusStats,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedInteraction {
    #[serde(flatten)]
    pub outcome: InteractionOutcome,
    pub stats: ModelStats,
}

#[derive(Clone)]
pub struct ModelSyncService {
    db_proxy: Arc<DatabaseProxy>,
    model_id: String,
}

impl ModelSyncService {
    pub fn new(db_proxy: Arc<DatabaseProxy>, model_id: impl Into<String>) -> Self {
        Self {
            db_proxy,
            model_id: model_id.into(),
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Creates storage when absent and installs default weights and config
    /// when the model has none. Repeated calls change nothing.
    pub async fn initialize(&self) -> Result<InitializeOutcome, SyncError> {
        self.db_proxy
            .ensure_schema()
            .await
            .map_err(persistence("failed to create model storage"))?;

        let defaults = AdaptiveModelState::default();
        let weights = serde_json::to_string(&StoredWeights::from(&defaults.weights))
            .map_err(serialization("failed to encode default weights"))?;
        let config = serde_json::to_string(&StoredConfig::from(&defaults.config))
            .map_err(serialization("failed to encode default config"))?;

        let mut tx = self
            .db_proxy
            .pool()
            .begin()
            .await
            .map_err(persistence("failed to begin transaction"))?;

        let installed_defaults = operations::insert_adaptive_model_if_absent(
            &mut tx,
            &self.model_id,
            &weights,
            &config,
            MODEL_VERSION,
        )
        .await
        .map_err(persistence("failed to install default weights"))?;

        operations::ensure_training_stats(&mut tx, &self.model_id)
            .await
            .map_err(persistence("failed to initialize training stats"))?;

        tx.commit()
            .await
            .map_err(persistence("failed to commit initialization"))?;

        tracing::info!(model_id = %self.model_id, installed_defaults, "adaptive model initialized");

        Ok(InitializeOutcome {
            tables: MODEL_TABLES.to_vec(),
            installed_defaults,
        })
    }

    /// Overwrites the persisted weights and config. History is untouched.
    pub async fn sync(&self, state: &ModelStateInput) -> Result<(), SyncError> {
        let Some(weights) = state.weights.as_ref() else {
            return Err(SyncError::Validation(
                "modelState.weights is required".to_string(),
            ));
        };
        let config = state.config.clone().unwrap_or_default();

        let weights_json =
            serde_json::to_string(weights).map_err(serialization("failed to encode weights"))?;
        let config_json =
            serde_json::to_string(&config).map_err(serialization("failed to encode config"))?;

        let mut conn = self.acquire().await?;
        operations::upsert_adaptive_model(
            &mut conn,
            &self.model_id,
            &weights_json,
            &config_json,
            MODEL_VERSION,
        )
        .await
        .map_err(persistence("failed to sync model state"))?;

        tracing::info!(model_id = %self.model_id, "adaptive model synced");
        Ok(())
    }

    /// Rebuilds the full model from storage, falling back to defaults for
    /// anything missing. Succeeds against empty storage.
    pub async fn load(&self) -> Result<AdaptiveModelState, SyncError> {
        let mut conn = self.acquire().await?;
        self.load_state(&mut conn).await
    }

    /// Applies one scored interaction to the persisted model.
    ///
    /// Load, reinforcement and every write share one transaction, so
    /// concurrent callers are serialized on the SQLite write lock and a
    /// failure leaves nothing behind.
    pub async fn record_interaction(
        &self,
        interaction: &ScoredInteraction,
    ) -> Result<RecordedInteraction, SyncError> {
        if interaction.score > 100 {
            return Err(SyncError::Validation(
                "score must be between 0 and 100".to_string(),
            ));
        }

        let mut tx = self
            .db_proxy
            .pool()
            .begin()
            .await
            .map_err(persistence("failed to begin transaction"))?;

        // The first statement writes, so SQLite takes the write lock before anything is read.
        operations::ensure_training_stats(&mut tx, &self.model_id)
            .await
            .map_err(persistence("failed to lock training stats"))?;

        let mut state = self.load_state(&mut tx).await?;
        let learning_rate_before = state.config.learning_rate;
        let capacity = state.config.max_history_size;

        let outcome = state.apply_interaction(interaction, Utc::now());

        if outcome.reinforced || state.config.learning_rate != learning_rate_before {
            let weights = serde_json::to_string(&StoredWeights::from(&state.weights))
                .map_err(serialization("failed to encode weights"))?;
            let config = serde_json::to_string(&StoredConfig::from(&state.config))
                .map_err(serialization("failed to encode config"))?;
            operations::upsert_adaptive_model(&mut tx, &self.model_id, &weights, &config, &state.version)
                .await
                .map_err(persistence("failed to persist reinforced weights"))?;
        }

        let entry = serde_json::to_string(&outcome.update)
            .map_err(serialization("failed to encode weight update"))?;
        operations::append_weight_update(
            &mut tx,
            &self.model_id,
            &entry,
            outcome.update.timestamp,
            capacity,
        )
        .await
        .map_err(persistence("failed to append weight update"))?;

        operations::increment_training_stats(
            &mut tx,
            &self.model_id,
            outcome.prediction_correct,
            outcome.accuracy.timestamp,
        )
        .await
        .map_err(persistence("failed to update training stats"))?;

        operations::append_accuracy_point(&mut tx, &self.model_id, &outcome.accuracy, capacity)
            .await
            .map_err(persistence("failed to append accuracy point"))?;

        if let Some(correction) = &interaction.user_correction {
            operations::append_user_correction(&mut tx, &self.model_id, correction, capacity)
                .await
                .map_err(persistence("failed to append user correction"))?;
        }

        tx.commit()
            .await
            .map_err(persistence("failed to commit interaction"))?;

        tracing::info!(
            model_id = %self.model_id,
            risk = outcome.risk,
            prediction_correct = outcome.prediction_correct,
            reinforced = outcome.reinforced,
            "interaction recorded"
        );

        Ok(RecordedInteraction {
            stats: ModelStats::from_history(&state.history),
            outcome,
        })
    }

    pub async fn import_corpus(
        &self,
        examples: Vec<CorpusExampleInput>,
    ) -> Result<ImportOutcome, SyncError> {
        if examples.is_empty() {
            return Err(SyncError::Validation(
                "examples must be a non-empty array".to_string(),
            ));
        }

        let requested = examples.len();
        let rows: Vec<NewTrainingExample> = examples
            .into_iter()
            .map(|example| NewTrainingExample {
                atc: example.atc,
                pilot: example.pilot,
                is_correct: example.is_correct,
                phase: example
                    .phase
                    .filter(|phase| !phase.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_PHASE.to_string()),
                explanation: example.explanation,
                source: IMPORT_SOURCE.to_string(),
            })
            .collect();

        let proxy = self.db_proxy.as_ref();
        let stored = operations::insert_corpus_examples(proxy, &self.model_id, &rows)
            .await
            .map_err(persistence("failed to import corpus"))?;
        let corpus_stats = operations::corpus_stats(proxy, &self.model_id)
            .await
            .map_err(persistence("failed to read corpus stats"))?;

        tracing::info!(model_id = %self.model_id, requested, stored, "corpus imported");

        Ok(ImportOutcome {
            requested,
            stored,
            corpus_stats,
        })
    }

    pub async fn get_corpus(
        &self,
        filter: &CorpusFilter,
    ) -> Result<(Vec<TrainingExample>, CorpusStats), SyncError> {
        let proxy = self.db_proxy.as_ref();
        let examples = operations::query_corpus(proxy, &self.model_id, filter)
            .await
            .map_err(persistence("failed to query corpus"))?;
        let stats = operations::corpus_stats(proxy, &self.model_id)
            .await
            .map_err(persistence("failed to read corpus stats"))?;
        Ok((examples, stats))
    }

    pub async fn clear_corpus(&self) -> Result<u64, SyncError> {
        let removed = operations::clear_corpus(self.db_proxy.as_ref(), &self.model_id)
            .await
            .map_err(persistence("failed to clear corpus"))?;
        tracing::info!(model_id = %self.model_id, removed, "corpus cleared");
        Ok(removed)
    }

    pub async fn status(&self) -> Result<ModelStatus, SyncError> {
        let proxy = self.db_proxy.as_ref();
        proxy
            .ping()
            .await
            .map_err(persistence("database unreachable"))?;

        let corpus = operations::corpus_stats(proxy, &self.model_id)
            .await
            .map_err(persistence("failed to read corpus stats"))?;

        let mut conn = self.acquire().await?;
        let state = self.load_state(&mut conn).await?;

        let mut corrections =
            operations::recent_user_corrections(&mut conn, &self.model_id, RECENT_CORRECTIONS)
                .await
                .map_err(persistence("failed to read recent corrections"))?;
        corrections.reverse();
        let mut weight_updates =
            operations::recent_weight_updates(&mut conn, &self.model_id, RECENT_WEIGHT_UPDATES)
                .await
                .map_err(persistence("failed to read recent weight updates"))?;
        weight_updates.reverse();

        Ok(ModelStatus {
            corpus,
            model: ModelSummary {
                model_id: self.model_id.clone(),
                version: state.version.clone(),
                updated_at: state.updated_at,
                stats: ModelStats::from_history(&state.history),
            },
            recent: RecentActivity {
                corrections,
                weight_updates,
            },
        })
    }

    async fn acquire(&self) -> Result<PoolConnection<Sqlite>, SyncError> {
        self.db_proxy
            .pool()
            .acquire()
            .await
            .map_err(persistence("failed to acquire connection"))
    }

    async fn load_state(&self, conn: &mut SqliteConnection) -> Result<AdaptiveModelState, SyncError> {
        let row = operations::get_adaptive_model(conn, &self.model_id)
            .await
            .map_err(persistence("failed to load model weights"))?;

        let (stored_weights, stored_config, version, updated_at) = match row {
            Some(row) => (
                parse_lenient::<StoredWeights>(&row.weights, "weights"),
                parse_lenient::<StoredConfig>(&row.config, "config"),
                row.version,
                parse_timestamp(&row.updated_at).unwrap_or_else(Utc::now),
            ),
            None => (
                StoredWeights::default(),
                StoredConfig::default(),
                MODEL_VERSION.to_string(),
                Utc::now(),
            ),
        };

        let config = stored_config.resolve();
        let capacity = config.max_history_size.max(1);

        let stats = operations::get_training_stats(conn, &self.model_id)
            .await
            .map_err(persistence("failed to load training stats"))?
            .unwrap_or_default();
        let weight_updates = operations::recent_weight_updates(conn, &self.model_id, capacity)
            .await
            .map_err(persistence("failed to load weight updates"))?;
        let accuracy_over_time = operations::recent_accuracy_points(conn, &self.model_id, capacity)
            .await
            .map_err(persistence("failed to load accuracy history"))?;
        let user_corrections = operations::recent_user_corrections(conn, &self.model_id, capacity)
            .await
            .map_err(persistence("failed to load user corrections"))?;

        let mut history = ModelHistory {
            total_interactions: stats.total_interactions.max(0) as u64,
            correct_predictions: stats.correct_predictions.max(0) as u64,
            incorrect_predictions: 0,
            user_corrections: user_corrections.into(),
            weight_updates: weight_updates.into(),
            accuracy_over_time: accuracy_over_time.into(),
            last_training_date: stats.last_training_date.as_deref().and_then(parse_timestamp),
        };
        history.recompute_incorrect();

        Ok(AdaptiveModelState {
            version,
            updated_at,
            weights: stored_weights.resolve(),
            config,
            history,
        })
    }
}

fn parse_lenient<T: serde::de::DeserializeOwned + Default>(raw: &str, field: &'static str) -> T {
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(field, error = %err, "persisted model field unreadable, using defaults");
            T::default()
        }
    }
}
