//! Bounded history rings: weight updates, accuracy points and user corrections.
//!
//! Each append trims the ring back to `capacity` rows per model, dropping the
//! oldest rows by insertion order. Appends run on the caller's connection and
//! do not open their own transaction.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};

use crate::adaptive::{AccuracyPoint, UserCorrection, WeightUpdateEntry};
use crate::db::operations::model::{format_timestamp, parse_timestamp};
use crate::db::DatabaseProxy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRing {
    WeightUpdates,
    AccuracyHistory,
    UserCorrections,
}

impl HistoryRing {
    pub fn table(&self) -> &'static str {
        match self {
            Self::WeightUpdates => "weight_updates",
            Self::AccuracyHistory => "accuracy_history",
            Self::UserCorrections => "user_corrections",
        }
    }
}

async fn trim_ring(
    conn: &mut SqliteConnection,
    ring: HistoryRing,
    model_id: &str,
    capacity: usize,
) -> Result<u64, sqlx::Error> {
    let table = ring.table();
    let sql = format!(
        r#"
        DELETE FROM "{table}"
        WHERE "modelId" = ?
          AND "id" NOT IN (
            SELECT "id" FROM "{table}" WHERE "modelId" = ? ORDER BY "id" DESC LIMIT ?
          )
        "#
    );
    let result = sqlx::query(&sql)
        .bind(model_id)
        .bind(model_id)
        .bind(capacity.max(1) as i64)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Appends a serialized weight-update entry. Runs on the caller's
/// connection so it can share a transaction with the weight write.
pub async fn append_weight_update(
    conn: &mut SqliteConnection,
    model_id: &str,
    entry_json: &str,
    recorded_at: DateTime<Utc>,
    capacity: usize,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO "weight_updates" ("modelId", "entry", "createdAt") VALUES (?, ?, ?)"#,
    )
    .bind(model_id)
    .bind(entry_json)
    .bind(format_timestamp(recorded_at))
    .execute(&mut *conn)
    .await?;
    trim_ring(conn, HistoryRing::WeightUpdates, model_id, capacity).await?;
    Ok(())
}

pub async fn append_accuracy_point(
    conn: &mut SqliteConnection,
    model_id: &str,
    point: &AccuracyPoint,
    capacity: usize,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "accuracy_history" ("modelId", "accuracy", "totalInteractions", "recordedAt")
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(model_id)
    .bind(point.accuracy)
    .bind(point.total_interactions as i64)
    .bind(format_timestamp(point.timestamp))
    .execute(&mut *conn)
    .await?;
    trim_ring(conn, HistoryRing::AccuracyHistory, model_id, capacity).await?;
    Ok(())
}

pub async fn append_user_correction(
    conn: &mut SqliteConnection,
    model_id: &str,
    correction: &UserCorrection,
    capacity: usize,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "user_corrections" (
            "modelId", "original", "corrected", "phase", "errorType", "createdAt"
        ) VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(model_id)
    .bind(&correction.original)
    .bind(&correction.corrected)
    .bind(&correction.phase)
    .bind(&correction.error_type)
    .bind(format_timestamp(correction.timestamp))
    .execute(&mut *conn)
    .await?;
    trim_ring(conn, HistoryRing::UserCorrections, model_id, capacity).await?;
    Ok(())
}

/// Most recent weight updates, oldest first.
pub async fn recent_weight_updates(
    conn: &mut SqliteConnection,
    model_id: &str,
    limit: usize,
) -> Result<Vec<WeightUpdateEntry>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT "id", "entry" FROM "weight_updates" WHERE "modelId" = ? ORDER BY "id" DESC LIMIT ?"#,
    )
    .bind(model_id)
    .bind(limit as i64)
    .fetch_all(&mut *conn)
    .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in rows.iter().rev() {
        let id: i64 = row.try_get("id")?;
        let raw: String = row.try_get("entry")?;
        match serde_json::from_str::<WeightUpdateEntry>(&raw) {
            Ok(entry) => entries.push(entry),
            Err(err) => tracing::warn!(id, error = %err, "skipping malformed weight update entry"),
        }
    }
    Ok(entries)
}

/// Most recent accuracy points, oldest first.
pub async fn recent_accuracy_points(
    conn: &mut SqliteConnection,
    model_id: &str,
    limit: usize,
) -> Result<Vec<AccuracyPoint>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT "accuracy", "totalInteractions", "recordedAt"
        FROM "accuracy_history"
        WHERE "modelId" = ?
        ORDER BY "id" DESC
        LIMIT ?
        "#,
    )
    .bind(model_id)
    .bind(limit as i64)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .rev()
        .map(|row| {
            let recorded_at: String = row.try_get("recordedAt")?;
            let total: i64 = row.try_get("totalInteractions")?;
            Ok(AccuracyPoint {
                timestamp: parse_timestamp(&recorded_at).unwrap_or_else(Utc::now),
                accuracy: row.try_get("accuracy")?,
                total_interactions: total.max(0) as u64,
            })
        })
        .collect()
}

/// Most recent user corrections, oldest first.
pub async fn recent_user_corrections(
    conn: &mut SqliteConnection,
    model_id: &str,
    limit: usize,
) -> Result<Vec<UserCorrection>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT "original", "corrected", "phase", "errorType", "createdAt"
        FROM "user_corrections"
        WHERE "modelId" = ?
        ORDER BY "id" DESC
        LIMIT ?
        "#,
    )
    .bind(model_id)
    .bind(limit as i64)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .rev()
        .map(|row| {
            let created_at: String = row.try_get("createdAt")?;
            Ok(UserCorrection {
                original: row.try_get("original")?,
                corrected: row.try_get("corrected")?,
                phase: row.try_get("phase")?,
                error_type: row.try_get("errorType")?,
                timestamp: parse_timestamp(&created_at).unwrap_or_else(Utc::now),
            })
        })
        .collect()
}

pub async fn count_ring(
    proxy: &DatabaseProxy,
    ring: HistoryRing,
    model_id: &str,
) -> Result<i64, sqlx::Error> {
    let sql = format!(r#"SELECT COUNT(*) FROM "{}" WHERE "modelId" = ?"#, ring.table());
    sqlx::query_scalar(&sql)
        .bind(model_id)
        .fetch_one(proxy.pool())
        .await
}
