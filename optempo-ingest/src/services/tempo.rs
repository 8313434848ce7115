//! Operational tempo scoring
//!
//! Aggregates recent activity counts per category into one composite
//! score per hour bucket. The formula is an explicit deterministic
//! weighting, not an inferred model: each category's count is compared
//! against its fixed baseline, the positive excess becomes a sub-score,
//! and the weighted sum plus a flat offset is clamped to the upper
//! bound. Recomputing a bucket with unchanged counts stores an
//! identical row.

use crate::db::events::count_events_by_kind_since;
use crate::db::scores::{
    count_active_exercises, count_active_notices, upsert_tempo_score, TempoDrivers, TempoScore,
};
use chrono::{DateTime, Utc};
use optempo_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::info;

/// Lookback window for flight events
const FLIGHT_WINDOW_SECS: i64 = 3600;
/// Ship sightings arrive with hours of feed latency, so the window is wider
const SHIP_WINDOW_SECS: i64 = 6 * 3600;

/// Expected quiet-period count per category
const FLIGHT_BASELINE: f64 = 12.0;
const SHIP_BASELINE: f64 = 5.0;
const NOTICE_BASELINE: f64 = 3.0;
const EXERCISE_BASELINE: f64 = 1.0;

/// Category weights in the composite
const FLIGHT_WEIGHT: f64 = 0.40;
const SHIP_WEIGHT: f64 = 0.25;
const NOTICE_WEIGHT: f64 = 0.20;
const EXERCISE_WEIGHT: f64 = 0.15;

/// Flat offset representing routine background activity
const BASE_OFFSET: f64 = 10.0;
const MAX_SCORE: f64 = 100.0;

/// Computes and persists the hourly composite score
pub struct TempoScorer {
    db: SqlitePool,
}

impl TempoScorer {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Compute the score for the hour bucket containing `now` and store it
    ///
    /// Idempotent per bucket: a recompute overwrites the existing row.
    /// Counts are read without coordination with concurrent ingestion;
    /// this is an activity index, not a ledger.
    pub async fn compute_and_store(&self, now: DateTime<Utc>) -> Result<TempoScore> {
        let now_ts = now.timestamp();
        let ts_hour = now_ts - now_ts.rem_euclid(3600);

        let flight_count =
            count_events_by_kind_since(&self.db, "aircraft", now_ts - FLIGHT_WINDOW_SECS)
                .await
                .map_err(|e| Error::Internal(e.to_string()))?;
        let ship_count = count_events_by_kind_since(&self.db, "ship", now_ts - SHIP_WINDOW_SECS)
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;
        let notice_count = count_active_notices(&self.db, now_ts)
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;
        let exercise_count = count_active_exercises(&self.db, now_ts)
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        let drivers = TempoDrivers {
            flights: sub_score(flight_count, FLIGHT_BASELINE),
            ships: sub_score(ship_count, SHIP_BASELINE),
            notices: sub_score(notice_count, NOTICE_BASELINE),
            exercises: sub_score(exercise_count, EXERCISE_BASELINE),
        };

        let score = composite(&drivers);

        let result = TempoScore {
            ts_hour,
            score,
            drivers,
            flight_count,
            ship_count,
            notice_count,
            exercise_count,
        };

        upsert_tempo_score(&self.db, &result)
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        info!(
            ts_hour = ts_hour,
            score = score,
            flights = flight_count,
            ships = ship_count,
            notices = notice_count,
            exercises = exercise_count,
            "Tempo score stored"
        );

        Ok(result)
    }
}

/// Percentage excess of `count` over its baseline, floored at zero
fn sub_score(count: i64, baseline: f64) -> f64 {
    ((count as f64 - baseline) / baseline * 100.0).max(0.0)
}

/// Weighted sum of sub-scores plus the flat offset, clamped to the bound
fn composite(drivers: &TempoDrivers) -> f64 {
    let weighted = BASE_OFFSET
        + FLIGHT_WEIGHT * drivers.flights
        + SHIP_WEIGHT * drivers.ships
        + NOTICE_WEIGHT * drivers.notices
        + EXERCISE_WEIGHT * drivers.exercises;
    weighted.min(MAX_SCORE)
}
