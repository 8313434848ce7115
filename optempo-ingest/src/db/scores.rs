//! Tempo score persistence and scorer inputs
//!
//! One score row per whole-hour bucket (`ts_hour` is the bucket start in
//! unix seconds). Recomputing a bucket overwrites the prior row. The
//! `notices` and `exercises` tables are populated by external
//! collaborators; this module only counts interval overlaps.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

/// Per-category sub-scores backing one composite score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoDrivers {
    pub flights: f64,
    pub ships: f64,
    pub notices: f64,
    pub exercises: f64,
}

/// One composite activity measurement for one hour bucket
#[derive(Debug, Clone, PartialEq)]
pub struct TempoScore {
    /// Bucket start (unix seconds, truncated to the hour)
    pub ts_hour: i64,
    /// Composite score in [0, 100]
    pub score: f64,
    pub drivers: TempoDrivers,
    pub flight_count: i64,
    pub ship_count: i64,
    pub notice_count: i64,
    pub exercise_count: i64,
}

/// Upsert the score for one hour bucket (idempotent recompute)
///
/// Stores only content columns, so recomputing a bucket with unchanged
/// counts leaves the row byte-identical.
pub async fn upsert_tempo_score(pool: &SqlitePool, score: &TempoScore) -> Result<()> {
    let drivers = serde_json::to_string(&score.drivers)?;

    sqlx::query(
        r#"
        INSERT INTO tempo_scores (
            ts_hour, score, drivers, flight_count, ship_count,
            notice_count, exercise_count
        ) VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(ts_hour) DO UPDATE SET
            score = excluded.score,
            drivers = excluded.drivers,
            flight_count = excluded.flight_count,
            ship_count = excluded.ship_count,
            notice_count = excluded.notice_count,
            exercise_count = excluded.exercise_count
        "#,
    )
    .bind(score.ts_hour)
    .bind(score.score)
    .bind(drivers)
    .bind(score.flight_count)
    .bind(score.ship_count)
    .bind(score.notice_count)
    .bind(score.exercise_count)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load the score for one hour bucket
pub async fn load_tempo_score(pool: &SqlitePool, ts_hour: i64) -> Result<Option<TempoScore>> {
    let row = sqlx::query(
        r#"
        SELECT ts_hour, score, drivers, flight_count, ship_count,
               notice_count, exercise_count
        FROM tempo_scores
        WHERE ts_hour = ?
        "#,
    )
    .bind(ts_hour)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let drivers: String = row.get("drivers");
            Ok(Some(TempoScore {
                ts_hour: row.get("ts_hour"),
                score: row.get("score"),
                drivers: serde_json::from_str(&drivers)?,
                flight_count: row.get("flight_count"),
                ship_count: row.get("ship_count"),
                notice_count: row.get("notice_count"),
                exercise_count: row.get("exercise_count"),
            }))
        }
        None => Ok(None),
    }
}

/// Count score rows (tests: idempotency across recomputes)
pub async fn count_tempo_scores(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tempo_scores")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Notices whose interval overlaps `now_ts`
pub async fn count_active_notices(pool: &SqlitePool, now_ts: i64) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM notices WHERE starts_at <= ? AND ends_at >= ?")
            .bind(now_ts)
            .bind(now_ts)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

/// Exercises whose interval overlaps `now_ts`
pub async fn count_active_exercises(pool: &SqlitePool, now_ts: i64) -> Result<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM exercises WHERE starts_at <= ? AND ends_at >= ?")
            .bind(now_ts)
            .bind(now_ts)
            .fetch_one(pool)
            .await?;
    Ok(count)
}
