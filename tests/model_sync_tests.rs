use std::sync::Arc;

use phraseology_trainer::adaptive::{
    InteractionCategories, ScoredInteraction, StoredConfig, StoredWeights, UserCorrection,
    WEIGHT_CAP, WEIGHT_FLOOR,
};
use phraseology_trainer::db::operations::{self, CorpusFilter, HistoryRing};
use phraseology_trainer::services::model_sync::{CorpusExampleInput, ModelStateInput};
use phraseology_trainer::services::{ModelSyncService, SyncError};

mod common;

fn example(atc: &str, pilot: &str, is_correct: bool, phase: Option<&str>) -> CorpusExampleInput {
    CorpusExampleInput {
        atc: atc.to_string(),
        pilot: pilot.to_string(),
        is_correct,
        phase: phase.map(str::to_string),
        explanation: None,
    }
}

fn interaction(score: u32, correct: bool) -> ScoredInteraction {
    ScoredInteraction {
        categories: InteractionCategories {
            pattern: Some("altitude".to_string()),
            errors: vec!["omission".to_string()],
            phase: Some("approach".to_string()),
            severity: Some("high".to_string()),
        },
        score,
        correct,
        user_correction: None,
    }
}

async fn sync_config(service: &ModelSyncService, config: StoredConfig) {
    service
        .sync(&ModelStateInput {
            weights: Some(StoredWeights::default()),
            config: Some(config),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_initialize_installs_defaults_once() {
    let (proxy, _dir) = common::create_test_proxy().await;
    let service = ModelSyncService::new(proxy, "tower");

    let first = service.initialize().await.unwrap();
    let second = service.initialize().await.unwrap();

    assert!(first.installed_defaults);
    assert!(!second.installed_defaults);
    assert_eq!(first.tables.len(), 6);

    let state = service.load().await.unwrap();
    assert_eq!(state.weights.severity["critical"], 1.5);
    assert_eq!(state.weights.error["non_standard"], 0.8);
    assert_eq!(state.version, "1.0.0");
}

#[tokio::test]
async fn test_sync_requires_weights() {
    let (proxy, _dir) = common::create_test_proxy().await;
    let service = ModelSyncService::new(proxy, "tower");

    let err = service.sync(&ModelStateInput::default()).await.unwrap_err();

    assert!(matches!(err, SyncError::Validation(_)));
}

#[tokio::test]
async fn test_load_fills_missing_severity_categories() {
    let (proxy, _dir) = common::create_test_proxy().await;
    let service = ModelSyncService::new(proxy, "tower");
    let weights: StoredWeights =
        serde_json::from_value(serde_json::json!({ "severity": { "high": 2.0 } })).unwrap();

    service
        .sync(&ModelStateInput {
            weights: Some(weights),
            config: None,
        })
        .await
        .unwrap();
    let state = service.load().await.unwrap();

    assert_eq!(state.weights.severity["critical"], 1.5);
    assert_eq!(state.weights.severity["high"], 2.0);
    assert_eq!(state.weights.severity["medium"], 1.0);
    assert_eq!(state.weights.severity["low"], 0.7);
    assert_eq!(state.config.learning_rate, 0.05);
}

#[tokio::test]
async fn test_models_are_isolated_by_id() {
    let (proxy, _dir) = common::create_test_proxy().await;
    let tower = ModelSyncService::new(Arc::clone(&proxy), "tower");
    let ground = ModelSyncService::new(proxy, "ground");

    tower
        .import_corpus(vec![example("a", "b", true, None)])
        .await
        .unwrap();

    let (examples, stats) = ground.get_corpus(&CorpusFilter::default()).await.unwrap();
    assert!(examples.is_empty());
    assert_eq!(stats.total, 0);
    assert_eq!(tower.clear_corpus().await.unwrap(), 1);
}

#[tokio::test]
async fn test_import_empty_issues_no_write() {
    let (proxy, _dir) = common::create_test_proxy().await;
    let service = ModelSyncService::new(proxy, "tower");

    let err = service.import_corpus(Vec::new()).await.unwrap_err();

    assert!(err.is_validation());
    assert_eq!(err.to_string(), "examples must be a non-empty array");
}

#[tokio::test]
async fn test_import_defaults_phase_and_source() {
    let (proxy, _dir) = common::create_test_proxy().await;
    let service = ModelSyncService::new(proxy, "tower");

    let outcome = service
        .import_corpus(vec![
            example("contact ground 121.9", "121.9, BAW12", true, None),
            example("squawk 7000", "squawk 7000, BAW12", true, Some("")),
            example("hold short runway 09", "holding short, BAW12", false, Some("ground")),
        ])
        .await
        .unwrap();

    assert_eq!(outcome.requested, 3);
    assert_eq!(outcome.stored, 3);
    assert_eq!(outcome.corpus_stats.by_phase["general"], 2);
    assert_eq!(outcome.corpus_stats.by_phase["ground"], 1);

    let (examples, _) = service.get_corpus(&CorpusFilter::default()).await.unwrap();
    assert!(examples.iter().all(|e| e.source == "import"));
}

#[tokio::test]
async fn test_record_interaction_grows_history_and_persists_weights() {
    let (proxy, _dir) = common::create_test_proxy().await;
    let service = ModelSyncService::new(Arc::clone(&proxy), "tower");
    service.initialize().await.unwrap();
    let before = service.load().await.unwrap();

    let mut scored = interaction(20, false);
    scored.user_correction = Some(UserCorrection {
        original: "descend 5000".to_string(),
        corrected: "descend and maintain 5000 feet".to_string(),
        phase: Some("approach".to_string()),
        error_type: Some("omission".to_string()),
        timestamp: chrono::Utc::now(),
    });
    let recorded = service.record_interaction(&scored).await.unwrap();

    assert!(recorded.outcome.reinforced);
    assert!(!recorded.outcome.update.deltas.is_empty());
    assert_eq!(recorded.stats.total_interactions, 1);

    let after = service.load().await.unwrap();
    assert_eq!(after.history.total_interactions, 1);
    assert_eq!(
        after.history.incorrect_predictions,
        1 - after.history.correct_predictions
    );
    assert_eq!(after.history.weight_updates.len(), 1);
    assert_eq!(after.history.accuracy_over_time.len(), 1);
    assert_eq!(after.history.user_corrections.len(), 1);
    assert!(after.history.last_training_date.is_some());
    // a low score on a neutral-risk interaction raises the involved weights
    assert!(after.weights.pattern["altitude"] > before.weights.pattern["altitude"]);
    assert_eq!(after.weights.pattern["runway"], before.weights.pattern["runway"]);
}

#[tokio::test]
async fn test_record_interaction_without_reinforcement_keeps_weights() {
    let (proxy, _dir) = common::create_test_proxy().await;
    let service = ModelSyncService::new(Arc::clone(&proxy), "tower");
    sync_config(
        &service,
        StoredConfig {
            reinforcement_enabled: Some(false),
            ..StoredConfig::default()
        },
    )
    .await;
    let before = service.load().await.unwrap();

    let recorded = service.record_interaction(&interaction(0, false)).await.unwrap();

    assert!(!recorded.outcome.reinforced);
    let after = service.load().await.unwrap();
    assert_eq!(after.weights, before.weights);
    assert_eq!(after.history.total_interactions, 1);
    assert_eq!(after.history.accuracy_over_time.len(), 1);
    assert_eq!(after.history.weight_updates.len(), 1);
    assert!(after.history.weight_updates[0].deltas.is_empty());
    assert_eq!(after.history.weight_updates[0].score, 0);
}

#[tokio::test]
async fn test_history_rings_are_bounded_by_max_history_size() {
    let (proxy, _dir) = common::create_test_proxy().await;
    let service = ModelSyncService::new(Arc::clone(&proxy), "tower");
    sync_config(
        &service,
        StoredConfig {
            max_history_size: Some(3),
            adaptive_rate_enabled: Some(false),
            ..StoredConfig::default()
        },
    )
    .await;

    for score in [0, 10, 20, 30, 40] {
        service.record_interaction(&interaction(score, false)).await.unwrap();
    }

    for ring in [HistoryRing::WeightUpdates, HistoryRing::AccuracyHistory] {
        let count = operations::count_ring(&proxy, ring, "tower").await.unwrap();
        assert_eq!(count, 3, "{} should be trimmed", ring.table());
    }

    let state = service.load().await.unwrap();
    assert_eq!(state.history.total_interactions, 5);
    assert_eq!(state.history.accuracy_over_time.len(), 3);
    let totals: Vec<u64> = state
        .history
        .accuracy_over_time
        .iter()
        .map(|point| point.total_interactions)
        .collect();
    assert_eq!(totals, vec![3, 4, 5]);
    for weight in state.weights.pattern.values() {
        assert!((WEIGHT_FLOOR..=WEIGHT_CAP).contains(weight));
    }
}

#[tokio::test]
async fn test_record_interaction_rejects_out_of_range_score() {
    let (proxy, _dir) = common::create_test_proxy().await;
    let service = ModelSyncService::new(proxy, "tower");

    let err = service
        .record_interaction(&interaction(101, true))
        .await
        .unwrap_err();

    assert!(err.is_validation());
}

#[tokio::test]
async fn test_status_limits_recent_activity() {
    let (proxy, _dir) = common::create_test_proxy().await;
    let service = ModelSyncService::new(proxy, "tower");
    service.initialize().await.unwrap();

    for i in 0..12 {
        let mut scored = interaction(50, true);
        scored.user_correction = Some(UserCorrection {
            original: format!("readback {i}"),
            corrected: format!("corrected {i}"),
            phase: None,
            error_type: None,
            timestamp: chrono::Utc::now(),
        });
        service.record_interaction(&scored).await.unwrap();
    }

    let status = service.status().await.unwrap();
    assert_eq!(status.recent.corrections.len(), 5);
    assert_eq!(status.recent.weight_updates.len(), 10);
    assert_eq!(status.recent.corrections[0].original, "readback 11");
    assert_eq!(status.model.stats.total_interactions, 12);
}

#[tokio::test]
async fn test_concurrent_interactions_do_not_lose_updates() {
    let (proxy, _dir) = common::create_test_proxy().await;
    let service = ModelSyncService::new(proxy, "tower");
    sync_config(
        &service,
        StoredConfig {
            momentum: Some(0.0),
            adaptive_rate_enabled: Some(false),
            ..StoredConfig::default()
        },
    )
    .await;

    let approach = ScoredInteraction {
        categories: InteractionCategories {
            phase: Some("approach".to_string()),
            ..InteractionCategories::default()
        },
        score: 0,
        correct: false,
        user_correction: None,
    };

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let service = service.clone();
            let approach = approach.clone();
            tokio::spawn(async move { service.record_interaction(&approach).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let state = service.load().await.unwrap();
    assert_eq!(state.history.total_interactions, 16);
    assert_eq!(state.history.accuracy_over_time.len(), 16);
    assert_eq!(state.history.weight_updates.len(), 16);

    // Every logged delta must be reflected in the persisted weight.
    let expected = state
        .history
        .weight_updates
        .iter()
        .fold(1.0, |weight, entry| weight + entry.deltas["phase:approach"]);
    assert!((state.weights.phase["approach"] - expected).abs() < 1e-9);
    assert!(state.weights.phase["approach"] > 1.3);
}
