use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};


#[derive(Debug, Clone)]
pub struct AdaptiveModelRow {
    pub weights: String,
    pub config: String,
    pub version: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct TrainingStatsRow {
    pub total_interactions: i64,
    pub correct_predictions: i64,
    pub last_training_date: Option<String>,
}

pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub async fn get_adaptive_model(
    conn: &mut SqliteConnection,
    model_id: &str,
) -> Result<Option<AdaptiveModelRow>, sqlx::Error> {
    let row = sqlx::query(r#"SELECT "weights", "config", "version", "updatedAt" FROM "adaptive_model" WHERE "modelId" = ?"#)
        .bind(model_id)
        .fetch_optional(&mut *conn)
        .await?;
    row.map(|r| map_adaptive_model(&r)).transpose()
}

/// Inserts the record only when none exists. Returns whether a row was written.
pub async fn insert_adaptive_model_if_absent(
    conn: &mut SqliteConnection,
    model_id: &str,
    weights: &str,
    config: &str,
    version: &str,
) -> Result<bool, sqlx::Error> {
    let now = format_timestamp(Utc::now());
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO "adaptive_model" (
            "modelId", "weights", "config", "version", "createdAt", "updatedAt"
        ) VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(model_id)
    .bind(weights)
    .bind(config)
    .bind(version)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Overwrites weights and config as one record.
pub async fn upsert_adaptive_model(
    conn: &mut SqliteConnection,
    model_id: &str,
    weights: &str,
    config: &str,
    version: &str,
) -> Result<(), sqlx::Error> {
    let now = format_timestamp(Utc::now());
    sqlx::query(
        r#"
        INSERT INTO "adaptive_model" (
            "modelId", "weights", "config", "version", "createdAt", "updatedAt"
        ) VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT ("modelId") DO UPDATE SET
            "weights" = excluded."weights",
            "config" = excluded."config",
            "version" = excluded."version",
            "updatedAt" = excluded."updatedAt"
        "#,
    )
    .bind(model_id)
    .bind(weights)
    .bind(config)
    .bind(version)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn get_training_stats(
    conn: &mut SqliteConnection,
    model_id: &str,
) -> Result<Option<TrainingStatsRow>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT "totalInteractions", "correctPredictions", "lastTrainingDate"
        FROM "training_stats"
        WHERE "modelId" = ?
        "#,
    )
    .bind(model_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(|r| -> Result<TrainingStatsRow, sqlx::Error> {
        Ok(TrainingStatsRow {
            total_interactions: r.try_get("totalInteractions")?,
            correct_predictions: r.try_get("correctPredictions")?,
            last_training_date: r.try_get("lastTrainingDate")?,
        })
    })
    .transpose()
}

pub async fn ensure_training_stats(conn: &mut SqliteConnection, model_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query(r#"INSERT OR IGNORE INTO "training_stats" ("modelId") VALUES (?)"#)
        .bind(model_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Adds one interaction to the aggregates in a single statement.
pub async fn increment_training_stats(
    conn: &mut SqliteConnection,
    model_id: &str,
    prediction_correct: bool,
    at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    let correct: i64 = if prediction_correct { 1 } else { 0 };
    sqlx::query(
        r#"
        INSERT INTO "training_stats" (
            "modelId", "totalInteractions", "correctPredictions", "lastTrainingDate"
        ) VALUES (?, 1, ?, ?)
        ON CONFLICT ("modelId") DO UPDATE SET
            "totalInteractions" = "training_stats"."totalInteractions" + 1,
            "correctPredictions" = "training_stats"."correctPredictions" + excluded."correctPredictions",
            "lastTrainingDate" = excluded."lastTrainingDate"
        "#,
    )
    .bind(model_id)
    .bind(correct)
    .bind(format_timestamp(at))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn map_adaptive_model(row: &SqliteRow) -> Result<AdaptiveModelRow, sqlx::Error> {
    Ok(AdaptiveModelRow {
        weights: row.try_get("weights")?,
        config: row.try_get("config")?,
        version: row.try_get("version")?,
        updated_at: row.try_get("updatedAt")?,
    })
}
