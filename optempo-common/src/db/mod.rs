//! Database initialization and schema
//!
//! The ingestion core consumes this store but does not manage retention;
//! deletion/compression of old rows is an external concern. Schema creation
//! is idempotent and safe to run on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection pool and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL mode: concurrent readers (status surface, scorer) with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    initialize_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent)
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    create_assets_table(pool).await?;
    create_position_events_table(pool).await?;
    create_tempo_scores_table(pool).await?;

    // Consumed-not-owned inputs to the tempo scorer; populated by
    // external collaborators, created here so overlap queries always run.
    create_notices_table(pool).await?;
    create_exercises_table(pool).await?;

    Ok(())
}

/// Create the assets table
///
/// One row per tracked entity. `code` is the stable external identifier
/// (ICAO24 hex for aircraft, MMSI for ships) and is immutable once created.
async fn create_assets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS assets (
            guid TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            callsign TEXT,
            country_code TEXT,
            kind TEXT NOT NULL DEFAULT 'aircraft' CHECK (kind IN ('aircraft', 'ship')),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_assets_code ON assets(code)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_assets_kind ON assets(kind)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the position_events table
///
/// One row per (asset, observation timestamp); a later ingestion of the
/// same pair overwrites the kinematic fields rather than duplicating.
async fn create_position_events_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS position_events (
            asset_id TEXT NOT NULL REFERENCES assets(guid) ON DELETE CASCADE,
            ts INTEGER NOT NULL,
            lat REAL NOT NULL,
            lon REAL NOT NULL,
            alt REAL,
            velocity REAL,
            heading REAL,
            vertical_rate REAL,
            on_ground INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (asset_id, ts),
            CHECK (lat >= -90.0 AND lat <= 90.0),
            CHECK (lon >= -180.0 AND lon <= 180.0),
            CHECK (ts > 0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_position_events_ts ON position_events(ts)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_position_events_asset ON position_events(asset_id, ts)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the tempo_scores table
///
/// One row per whole-hour bucket; recomputation overwrites in place.
/// No bookkeeping timestamp column: recomputing a bucket with unchanged
/// counts must store an identical row.
async fn create_tempo_scores_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tempo_scores (
            ts_hour INTEGER PRIMARY KEY,
            score REAL NOT NULL,
            drivers TEXT NOT NULL,
            flight_count INTEGER NOT NULL DEFAULT 0,
            ship_count INTEGER NOT NULL DEFAULT 0,
            notice_count INTEGER NOT NULL DEFAULT 0,
            exercise_count INTEGER NOT NULL DEFAULT 0,
            CHECK (score >= 0.0 AND score <= 100.0)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_notices_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notices (
            guid TEXT PRIMARY KEY,
            title TEXT,
            starts_at INTEGER NOT NULL,
            ends_at INTEGER NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (ends_at >= starts_at)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_notices_window ON notices(starts_at, ends_at)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_exercises_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS exercises (
            guid TEXT PRIMARY KEY,
            name TEXT,
            starts_at INTEGER NOT NULL,
            ends_at INTEGER NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (ends_at >= starts_at)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_exercises_window ON exercises(starts_at, ends_at)")
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database")
    }

    #[tokio::test]
    async fn test_schema_initialization_is_idempotent() {
        let pool = memory_pool().await;
        initialize_schema(&pool).await.expect("first init failed");
        initialize_schema(&pool).await.expect("second init failed");

        let tables: Vec<String> = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap()
        .iter()
        .map(|row| row.get::<String, _>("name"))
        .collect();

        for expected in [
            "assets",
            "exercises",
            "notices",
            "position_events",
            "tempo_scores",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing {expected}");
        }
    }

    #[tokio::test]
    async fn test_init_database_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("optempo.db");

        let pool = init_database(&db_path).await.expect("init failed");
        assert!(db_path.exists());

        sqlx::query("SELECT COUNT(*) FROM assets")
            .fetch_one(&pool)
            .await
            .expect("assets table missing");
    }
}
