//! Ingestion pipeline integration tests
//!
//! Drive the cycle controller's batch path directly against an
//! in-memory database, with raw snapshots shaped exactly like the
//! upstream `states` payload.

use chrono::Utc;
use optempo_ingest::db::{assets, events};
use optempo_ingest::services::{FeedClient, IngestService, TokenManager};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

async fn memory_pool() -> SqlitePool {
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

fn service(pool: SqlitePool) -> IngestService {
    // Endpoints are never contacted by process_batch
    let feed = FeedClient::new("http://127.0.0.1:1/api".to_string()).unwrap();
    let tokens = TokenManager::new("http://127.0.0.1:1/token".to_string(), None, None).unwrap();
    let bounds = optempo_common::models::BoundingBox::new(49.0, -8.5, 61.0, 3.5);
    IngestService::new(pool, feed, tokens, bounds)
}

/// Full-width state vector as delivered by the feed
fn raw_state(icao24: &str, callsign: &str, last_contact: i64, lon: f64, lat: f64) -> Vec<Value> {
    vec![
        json!(icao24),
        json!(callsign),
        json!("United Kingdom"),
        Value::Null,
        json!(last_contact),
        json!(lon),
        json!(lat),
        json!(10972.8),
        json!(false),
        json!(231.5),
        json!(184.2),
        json!(-4.55),
        Value::Null,
        Value::Null,
        Value::Null,
        json!(false),
        json!(0),
    ]
}

#[tokio::test]
async fn test_end_to_end_military_kept_civilian_dropped() {
    let pool = memory_pool().await;
    let service = service(pool.clone());
    let now = Utc::now();

    let states = vec![
        raw_state("43C001", "RRR4421", now.timestamp() - 5, -0.1, 51.5),
        raw_state("AABBCC", "SPEEDBIRD123", now.timestamp() - 5, -0.2, 51.6),
    ];

    let summary = service.process_batch(&states, now).await;
    assert_eq!(summary.fetched, 2);
    assert_eq!(summary.upserted, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.rejected, 0);
    assert_eq!(summary.failed, 0);

    // Exactly one asset and one event, both for the military aircraft.
    // Civilian records are not stored at all, not merely unflagged.
    assert_eq!(assets::count_assets(&pool).await.unwrap(), 1);
    assert_eq!(events::count_events(&pool).await.unwrap(), 1);

    let asset = assets::load_asset_by_code(&pool, "43c001")
        .await
        .unwrap()
        .expect("military asset should exist");
    assert_eq!(asset.callsign.as_deref(), Some("RRR4421"));
    assert_eq!(asset.country_code.as_deref(), Some("GB"));
    assert!(assets::load_asset_by_code(&pool, "aabbcc").await.unwrap().is_none());
}

#[tokio::test]
async fn test_reingesting_identical_snapshot_is_idempotent() {
    let pool = memory_pool().await;
    let service = service(pool.clone());
    let now = Utc::now();
    let ts = now.timestamp() - 10;

    let states = vec![raw_state("43C123", "RRR1", ts, -0.1, 51.5)];

    service.process_batch(&states, now).await;
    let first_events = events::count_events(&pool).await.unwrap();

    let summary = service.process_batch(&states, now).await;
    assert_eq!(summary.upserted, 1); // upsert path, still a success

    assert_eq!(assets::count_assets(&pool).await.unwrap(), 1);
    assert_eq!(events::count_events(&pool).await.unwrap(), first_events);
}

#[tokio::test]
async fn test_one_malformed_record_does_not_poison_the_batch() {
    let pool = memory_pool().await;
    let service = service(pool.clone());
    let now = Utc::now();

    let mut states = Vec::new();
    for i in 0..50 {
        if i == 25 {
            // Stale record: last contact 25 hours old
            states.push(raw_state(
                "43C0FF",
                "RRR9",
                now.timestamp() - 25 * 3600,
                -0.1,
                51.0,
            ));
        } else {
            states.push(raw_state(
                &format!("43C{:03X}", i),
                &format!("RRR{}", i),
                now.timestamp() - 5,
                -0.1,
                51.0 + i as f64 * 0.01,
            ));
        }
    }

    let summary = service.process_batch(&states, now).await;
    assert_eq!(summary.fetched, 50);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.upserted, 49);
    assert_eq!(summary.failed, 0);
    assert_eq!(events::count_events(&pool).await.unwrap(), 49);
}

#[tokio::test]
async fn test_later_sighting_refreshes_callsign_only() {
    let pool = memory_pool().await;
    let service = service(pool.clone());
    let now = Utc::now();

    let first = vec![raw_state("43C123", "RRR1", now.timestamp() - 60, -0.1, 51.5)];
    service.process_batch(&first, now).await;

    // Second cycle: new callsign, new timestamp
    let second = vec![raw_state("43C123", "RRR2", now.timestamp() - 5, -0.3, 51.7)];
    service.process_batch(&second, now).await;

    let asset = assets::load_asset_by_code(&pool, "43c123")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(asset.callsign.as_deref(), Some("RRR2"));

    // Distinct timestamps produce distinct events for one asset
    assert_eq!(assets::count_assets(&pool).await.unwrap(), 1);
    assert_eq!(events::count_events(&pool).await.unwrap(), 2);
}

#[tokio::test]
async fn test_status_updates_are_visible_without_running_cycle() {
    let pool = memory_pool().await;
    let service = service(pool);

    let status = service.status().await;
    assert!(!status.running);
    assert!(status.last_run.is_none());
    assert_eq!(status.auth_mode, optempo_common::models::AuthMode::Anonymous);
}
