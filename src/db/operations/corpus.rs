use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use crate::db::operations::model::format_timestamp;
use crate::db::DatabaseProxy;

pub const DEFAULT_PHASE: &str = "general";
pub const IMPORT_SOURCE: &str = "import";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingExample {
    pub id: String,
    pub atc: String,
    pub pilot: String,
    pub is_correct: bool,
    pub phase: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub source: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewTrainingExample {
    pub atc: String,
    pub pilot: String,
    pub is_correct: bool,
    pub phase: String,
    pub explanation: Option<String>,
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct CorpusFilter {
    pub phase: Option<String>,
    pub is_correct: Option<bool>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for CorpusFilter {
    fn default() -> Self {
        Self {
            phase: None,
            is_correct: None,
            limit: 100,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusStats {
    pub total: i64,
    pub correct: i64,
    pub incorrect: i64,
    pub by_phase: BTreeMap<String, i64>,
}

/// Appends examples in one transaction. Duplicates of an existing
/// (atc, pilot, phase) triple are skipped; returns the number stored.
pub async fn insert_corpus_examples(
    proxy: &DatabaseProxy,
    model_id: &str,
    examples: &[NewTrainingExample],
) -> Result<u64, sqlx::Error> {
    let now = format_timestamp(Utc::now());
    let mut stored = 0;

    let mut tx = proxy.pool().begin().await?;
    for example in examples {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO "training_corpus" (
                "id", "modelId", "atc", "pilot", "isCorrect", "phase", "explanation", "source", "createdAt"
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(model_id)
        .bind(&example.atc)
        .bind(&example.pilot)
        .bind(example.is_correct)
        .bind(&example.phase)
        .bind(&example.explanation)
        .bind(&example.source)
        .bind(&now)
        .execute(&mut *tx)
        .await?;
        stored += result.rows_affected();
    }
    tx.commit().await?;

    Ok(stored)
}

pub async fn query_corpus(
    proxy: &DatabaseProxy,
    model_id: &str,
    filter: &CorpusFilter,
) -> Result<Vec<TrainingExample>, sqlx::Error> {
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(r#"SELECT * FROM "training_corpus" WHERE "modelId" = "#);
    builder.push_bind(model_id.to_string());

    if let Some(phase) = &filter.phase {
        builder.push(r#" AND "phase" = "#).push_bind(phase.clone());
    }
    if let Some(is_correct) = filter.is_correct {
        builder.push(r#" AND "isCorrect" = "#).push_bind(is_correct);
    }

    builder
        .push(r#" ORDER BY rowid ASC LIMIT "#)
        .push_bind(filter.limit.max(0))
        .push(" OFFSET ")
        .push_bind(filter.offset.max(0));

    let rows = builder.build().fetch_all(proxy.pool()).await?;
    rows.iter().map(map_training_example).collect()
}

pub async fn corpus_stats(proxy: &DatabaseProxy, model_id: &str) -> Result<CorpusStats, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT "phase", "isCorrect", COUNT(*) AS "count"
        FROM "training_corpus"
        WHERE "modelId" = ?
        GROUP BY "phase", "isCorrect"
        "#,
    )
    .bind(model_id)
    .fetch_all(proxy.pool())
    .await?;

    let mut stats = CorpusStats::default();
    for row in rows {
        let phase: String = row.try_get("phase")?;
        let is_correct: bool = row.try_get("isCorrect")?;
        let count: i64 = row.try_get("count")?;

        stats.total += count;
        if is_correct {
            stats.correct += count;
        } else {
            stats.incorrect += count;
        }
        *stats.by_phase.entry(phase).or_insert(0) += count;
    }
    Ok(stats)
}

pub async fn clear_corpus(proxy: &DatabaseProxy, model_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM "training_corpus" WHERE "modelId" = ?"#)
        .bind(model_id)
        .execute(proxy.pool())
        .await?;
    Ok(result.rows_affected())
}

fn map_training_example(row: &SqliteRow) -> Result<TrainingExample, sqlx::Error> {
    Ok(TrainingExample {
        id: row.try_get("id")?,
        atc: row.try_get("atc")?,
        pilot: row.try_get("pilot")?,
        is_correct: row.try_get("isCorrect")?,
        phase: row.try_get("phase")?,
        explanation: row.try_get("explanation")?,
        source: row.try_get("source")?,
        created_at: row.try_get("createdAt")?,
    })
}
