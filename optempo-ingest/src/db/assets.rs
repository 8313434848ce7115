//! Asset persistence
//!
//! One row per tracked entity, keyed by its stable external code. The
//! code is immutable once created; the callsign is refreshed by any
//! later sighting that supplies a non-empty value; the country code is
//! never overwritten after creation.

use anyhow::Result;
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Kind of tracked entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Aircraft,
    Ship,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Aircraft => "aircraft",
            AssetKind::Ship => "ship",
        }
    }
}

/// Asset record
#[derive(Debug, Clone)]
pub struct Asset {
    pub guid: Uuid,
    pub code: String,
    pub callsign: Option<String>,
    pub country_code: Option<String>,
    pub kind: String,
}

/// Resolve an external code to an asset guid, creating the asset on
/// first sight
///
/// The upsert keys on the unique `code` column, so two near-simultaneous
/// resolutions of the same new code cannot create two rows. A non-empty
/// callsign on a later sighting overwrites the stored one and bumps
/// `updated_at`; empty callsigns and the country code leave existing
/// values untouched.
pub async fn resolve_asset(
    conn: &mut SqliteConnection,
    code: &str,
    callsign: Option<&str>,
    country_code: Option<&str>,
    kind: AssetKind,
) -> Result<Uuid> {
    sqlx::query(
        r#"
        INSERT INTO assets (guid, code, callsign, country_code, kind, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        ON CONFLICT(code) DO UPDATE SET
            callsign = CASE
                WHEN excluded.callsign IS NOT NULL AND excluded.callsign != ''
                THEN excluded.callsign
                ELSE assets.callsign
            END,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(code)
    .bind(callsign)
    .bind(country_code)
    .bind(kind.as_str())
    .execute(&mut *conn)
    .await?;

    let guid: String = sqlx::query_scalar("SELECT guid FROM assets WHERE code = ?")
        .bind(code)
        .fetch_one(&mut *conn)
        .await?;

    Ok(Uuid::parse_str(&guid)?)
}

/// Load an asset by its external code
pub async fn load_asset_by_code(pool: &SqlitePool, code: &str) -> Result<Option<Asset>> {
    let row = sqlx::query(
        "SELECT guid, code, callsign, country_code, kind FROM assets WHERE code = ?",
    )
    .bind(code)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let guid: String = row.get("guid");
            Ok(Some(Asset {
                guid: Uuid::parse_str(&guid)?,
                code: row.get("code"),
                callsign: row.get("callsign"),
                country_code: row.get("country_code"),
                kind: row.get("kind"),
            }))
        }
        None => Ok(None),
    }
}

/// Count all assets (diagnostics and tests)
pub async fn count_assets(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM assets")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        optempo_common::db::initialize_schema(&pool)
            .await
            .expect("Schema initialization failed");
        pool
    }

    #[tokio::test]
    async fn test_resolve_creates_then_reuses_asset() {
        let pool = test_pool().await;

        let mut conn = pool.acquire().await.unwrap();
        let first = resolve_asset(&mut conn, "43c123", Some("RRR4421"), Some("GB"), AssetKind::Aircraft)
            .await
            .unwrap();
        let second = resolve_asset(&mut conn, "43c123", Some("RRR9"), Some("FR"), AssetKind::Aircraft)
            .await
            .unwrap();
        drop(conn);

        // Same code resolves to the same asset, however many times
        assert_eq!(first, second);
        assert_eq!(count_assets(&pool).await.unwrap(), 1);

        let asset = load_asset_by_code(&pool, "43c123").await.unwrap().unwrap();
        // Callsign refreshed by the later sighting; country never overwritten
        assert_eq!(asset.callsign.as_deref(), Some("RRR9"));
        assert_eq!(asset.country_code.as_deref(), Some("GB"));
        assert_eq!(asset.kind, "aircraft");
    }

    #[tokio::test]
    async fn test_empty_callsign_does_not_clobber() {
        let pool = test_pool().await;

        let mut conn = pool.acquire().await.unwrap();
        resolve_asset(&mut conn, "ae0123", Some("RCH285"), Some("US"), AssetKind::Aircraft)
            .await
            .unwrap();
        resolve_asset(&mut conn, "ae0123", Some(""), None, AssetKind::Aircraft)
            .await
            .unwrap();
        resolve_asset(&mut conn, "ae0123", None, None, AssetKind::Aircraft)
            .await
            .unwrap();
        drop(conn);

        let asset = load_asset_by_code(&pool, "ae0123").await.unwrap().unwrap();
        assert_eq!(asset.callsign.as_deref(), Some("RCH285"));
    }
}
