//! Position event persistence
//!
//! Kinematic observations keyed by (asset, observation timestamp). A key
//! collision overwrites every kinematic field — last write wins — so
//! re-ingesting an identical snapshot never duplicates rows.

use crate::services::normalizer::CanonicalRecord;
use anyhow::Result;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Upsert one position event
pub async fn upsert_position_event(
    conn: &mut SqliteConnection,
    asset_id: Uuid,
    record: &CanonicalRecord,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO position_events (
            asset_id, ts, lat, lon, alt, velocity, heading, vertical_rate, on_ground, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(asset_id, ts) DO UPDATE SET
            lat = excluded.lat,
            lon = excluded.lon,
            alt = excluded.alt,
            velocity = excluded.velocity,
            heading = excluded.heading,
            vertical_rate = excluded.vertical_rate,
            on_ground = excluded.on_ground
        "#,
    )
    .bind(asset_id.to_string())
    .bind(record.ts)
    .bind(record.lat)
    .bind(record.lon)
    .bind(record.altitude)
    .bind(record.velocity)
    .bind(record.heading)
    .bind(record.vertical_rate)
    .bind(record.on_ground)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Count events for assets of one kind observed at or after `since_ts`
pub async fn count_events_by_kind_since(
    pool: &SqlitePool,
    kind: &str,
    since_ts: i64,
) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM position_events pe
        JOIN assets a ON a.guid = pe.asset_id
        WHERE a.kind = ? AND pe.ts >= ?
        "#,
    )
    .bind(kind)
    .bind(since_ts)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Count all position events (diagnostics and tests)
pub async fn count_events(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM position_events")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
