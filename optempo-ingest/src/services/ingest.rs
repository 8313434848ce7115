//! Ingestion cycle controller
//!
//! One cycle runs fetch → normalize → classify → resolve → upsert over a
//! single snapshot. Cycles are single-flight: an overlapping trigger is
//! a logged no-op. Each record is processed inside its own transaction,
//! so one malformed or failing record never affects its siblings; only a
//! failure of the fetch itself ends the cycle early.

use crate::db::assets::{resolve_asset, AssetKind};
use crate::db::events::upsert_position_event;
use crate::services::classifier;
use crate::services::feed::{FeedClient, FeedError};
use crate::services::normalizer::{self, CanonicalRecord, RejectReason};
use crate::services::token::TokenManager;
use chrono::{DateTime, Utc};
use optempo_common::config::IngestConfig;
use optempo_common::models::{AuthMode, BoundingBox, CycleSummary, IngestStatus};
use optempo_common::{Error, Result};
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Outcome of processing one raw record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Persisted (asset resolved, position event upserted)
    Upserted,
    /// Dropped by the normalizer
    Rejected(RejectReason),
    /// Normalized cleanly but not of military interest
    Skipped,
    /// Persistence failed; isolated to this record and logged
    Failed,
}

/// Clears the single-flight flag on every exit path, including panics
/// and early returns mid-cycle.
struct RunFlagGuard<'a>(&'a AtomicBool);

impl Drop for RunFlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owns all cross-cycle mutable state of the ingestion path: the token
/// cache (inside [`TokenManager`]) and the single-flight run flag.
pub struct IngestService {
    db: SqlitePool,
    feed: FeedClient,
    tokens: TokenManager,
    bounds: BoundingBox,
    running: AtomicBool,
    last_run: RwLock<Option<DateTime<Utc>>>,
    /// Auth mode the most recent cycle actually used; the configured
    /// mode until the first cycle runs. A failed token exchange shows
    /// up here as anonymous even when credentials are configured.
    effective_auth: RwLock<AuthMode>,
}

impl IngestService {
    pub fn new(db: SqlitePool, feed: FeedClient, tokens: TokenManager, bounds: BoundingBox) -> Self {
        let effective_auth = RwLock::new(tokens.auth_mode());
        Self {
            db,
            feed,
            tokens,
            bounds,
            running: AtomicBool::new(false),
            last_run: RwLock::new(None),
            effective_auth,
        }
    }

    /// Build the service and its clients from resolved configuration
    pub fn from_config(db: SqlitePool, config: &IngestConfig) -> Result<Self> {
        let feed = FeedClient::new(config.feed_url.clone())
            .map_err(|e| Error::Config(format!("feed client: {e}")))?;
        let tokens = TokenManager::new(
            config.token_url.clone(),
            config.client_id.clone(),
            config.client_secret.clone(),
        )
        .map_err(|e| Error::Config(format!("token client: {e}")))?;

        Ok(Self::new(db, feed, tokens, config.bounds))
    }

    /// Run one ingestion cycle
    ///
    /// Returns the per-record tallies. An overlapping trigger returns an
    /// empty summary immediately. A rate-limited fetch ends the cycle
    /// early with zero records and no error; any other fetch failure is
    /// an error for this cycle only — the next scheduled trigger is the
    /// retry mechanism.
    pub async fn run_cycle(&self) -> Result<CycleSummary> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("Ingestion cycle already running, skipping overlapping trigger");
            return Ok(CycleSummary::default());
        }
        let _guard = RunFlagGuard(&self.running);

        // A failed token exchange degrades to anonymous access for this
        // cycle instead of aborting ingestion.
        let bearer = match self.tokens.bearer_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!("Token exchange failed, proceeding anonymously: {}", e);
                None
            }
        };
        *self.effective_auth.write().await = if bearer.is_some() {
            AuthMode::OAuth2
        } else {
            AuthMode::Anonymous
        };

        let states = match self.feed.fetch_snapshot(&self.bounds, bearer.as_deref()).await {
            Ok(states) => states,
            Err(FeedError::RateLimited) => {
                info!("Feed rate limited, ending cycle early");
                return Ok(CycleSummary::default());
            }
            Err(FeedError::Unauthorized) => {
                self.tokens.invalidate().await;
                return Err(Error::Feed("credentials rejected by feed".to_string()));
            }
            Err(e) => return Err(Error::Feed(e.to_string())),
        };

        let summary = self.process_batch(&states, Utc::now()).await;

        // Fetch succeeded, so this counts as a successful run even if
        // individual records failed.
        *self.last_run.write().await = Some(Utc::now());

        info!(
            fetched = summary.fetched,
            upserted = summary.upserted,
            skipped = summary.skipped,
            rejected = summary.rejected,
            failed = summary.failed,
            "Ingestion cycle complete"
        );

        Ok(summary)
    }

    /// Process one snapshot's records in upstream delivery order
    ///
    /// Public so tests can drive the pipeline without a live feed.
    pub async fn process_batch(&self, states: &[Vec<Value>], now: DateTime<Utc>) -> CycleSummary {
        let mut summary = CycleSummary {
            fetched: states.len(),
            ..CycleSummary::default()
        };

        for raw in states {
            match self.process_record(raw, now).await {
                RecordOutcome::Upserted => summary.upserted += 1,
                RecordOutcome::Rejected(_) => summary.rejected += 1,
                RecordOutcome::Skipped => summary.skipped += 1,
                RecordOutcome::Failed => summary.failed += 1,
            }
        }

        summary
    }

    async fn process_record(&self, raw: &[Value], now: DateTime<Utc>) -> RecordOutcome {
        let record = match normalizer::normalize(raw, now) {
            Ok(record) => record,
            Err(reason) => {
                debug!(reason = %reason, "Rejected raw record");
                return RecordOutcome::Rejected(reason);
            }
        };

        let Some(rule) =
            classifier::classify(Some(&record.icao24), record.callsign.as_deref())
        else {
            return RecordOutcome::Skipped;
        };

        match self.persist_record(&record).await {
            Ok(()) => {
                debug!(
                    icao24 = %record.icao24,
                    tag = rule.tag,
                    ts = record.ts,
                    "Stored military sighting"
                );
                RecordOutcome::Upserted
            }
            Err(e) => {
                warn!(
                    icao24 = %record.icao24,
                    ts = record.ts,
                    error = %e,
                    "Record persistence failed, continuing with batch"
                );
                RecordOutcome::Failed
            }
        }
    }

    /// Persist one record in its own transaction
    ///
    /// The transaction bounds the blast radius of a failure to this one
    /// record; a rollback leaves sibling records untouched.
    async fn persist_record(&self, record: &CanonicalRecord) -> anyhow::Result<()> {
        let mut tx = self.db.begin().await?;

        let asset_id = resolve_asset(
            &mut *tx,
            &record.icao24,
            record.callsign.as_deref(),
            record.country_code.as_deref(),
            AssetKind::Aircraft,
        )
        .await?;

        upsert_position_event(&mut *tx, asset_id, record).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Read-only status snapshot for the HTTP surface
    pub async fn status(&self) -> IngestStatus {
        IngestStatus {
            running: self.running.load(Ordering::SeqCst),
            last_run: *self.last_run.read().await,
            bounds: self.bounds,
            auth_mode: *self.effective_auth.read().await,
        }
    }
}
