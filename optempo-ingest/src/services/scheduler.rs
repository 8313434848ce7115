//! Recurring trigger scheduling
//!
//! Two cooperative cadences on the tokio runtime: a sub-minute ingestion
//! trigger and an hourly scoring trigger. Missed ticks are skipped, not
//! replayed, so a slow cycle never causes a burst of catch-up cycles.
//! Both loops stop when the cancellation token fires; tests bypass the
//! scheduler entirely and drive the services synchronously.

use crate::services::ingest::IngestService;
use crate::services::tempo::TempoScorer;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const SCORING_INTERVAL: Duration = Duration::from_secs(3600);

/// Drives the ingestion and scoring services on their cadences
pub struct Scheduler {
    ingest: Arc<IngestService>,
    scorer: Arc<TempoScorer>,
    ingest_interval: Duration,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(
        ingest: Arc<IngestService>,
        scorer: Arc<TempoScorer>,
        ingest_interval_secs: u64,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            ingest,
            scorer,
            ingest_interval: Duration::from_secs(ingest_interval_secs),
            cancel,
        }
    }

    /// Spawn both trigger loops as background tasks
    ///
    /// Errors from a cycle or a scoring pass are logged and absorbed;
    /// the next tick is the retry mechanism. Nothing here can terminate
    /// the process.
    pub fn spawn(self) {
        info!(
            ingest_interval_secs = self.ingest_interval.as_secs(),
            "Starting scheduler"
        );

        let ingest = self.ingest;
        let ingest_cancel = self.cancel.clone();
        let ingest_interval = self.ingest_interval;
        tokio::spawn(async move {
            let mut timer = interval(ingest_interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ingest_cancel.cancelled() => {
                        info!("Ingestion trigger loop stopped");
                        break;
                    }
                    _ = timer.tick() => {
                        if let Err(e) = ingest.run_cycle().await {
                            error!("Ingestion cycle failed: {}", e);
                        }
                    }
                }
            }
        });

        let scorer = self.scorer;
        let scoring_cancel = self.cancel;
        tokio::spawn(async move {
            let mut timer = interval(SCORING_INTERVAL);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = scoring_cancel.cancelled() => {
                        info!("Scoring trigger loop stopped");
                        break;
                    }
                    _ = timer.tick() => {
                        if let Err(e) = scorer.compute_and_store(Utc::now()).await {
                            error!("Tempo scoring failed: {}", e);
                        }
                    }
                }
            }
        });
    }
}
