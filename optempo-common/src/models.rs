//! Shared domain models
//!
//! Types exchanged between the ingestion services and the status surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Authentication mode in use against the upstream feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthMode {
    /// OAuth2 client-credentials bearer token
    #[serde(rename = "oauth2")]
    OAuth2,
    /// No credentials configured (or token exchange failed this cycle)
    #[serde(rename = "anonymous")]
    Anonymous,
}

impl std::fmt::Display for AuthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMode::OAuth2 => write!(f, "oauth2"),
            AuthMode::Anonymous => write!(f, "anonymous"),
        }
    }
}

/// Geographic bounding box for the snapshot request
///
/// Field names follow the upstream feed's query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum latitude (southern edge)
    pub lamin: f64,
    /// Minimum longitude (western edge)
    pub lomin: f64,
    /// Maximum latitude (northern edge)
    pub lamax: f64,
    /// Maximum longitude (eastern edge)
    pub lomax: f64,
}

impl BoundingBox {
    pub fn new(lamin: f64, lomin: f64, lamax: f64, lomax: f64) -> Self {
        Self {
            lamin,
            lomin,
            lamax,
            lomax,
        }
    }
}

/// Per-cycle processing tallies
///
/// Aggregated from per-record outcomes; one summary per ingestion cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    /// Raw records returned by the feed
    pub fetched: usize,
    /// Records rejected by the normalizer (malformed or stale)
    pub rejected: usize,
    /// Records that normalized cleanly but are not of interest
    pub skipped: usize,
    /// Records persisted (asset resolved + position event upserted)
    pub upserted: usize,
    /// Records whose persistence failed (isolated, logged)
    pub failed: usize,
}

/// Read-only snapshot of the ingestion service state
#[derive(Debug, Clone, Serialize)]
pub struct IngestStatus {
    pub running: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub bounds: BoundingBox,
    pub auth_mode: AuthMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_mode_display() {
        assert_eq!(AuthMode::OAuth2.to_string(), "oauth2");
        assert_eq!(AuthMode::Anonymous.to_string(), "anonymous");
    }

    #[test]
    fn test_auth_mode_serializes_lowercase() {
        let json = serde_json::to_string(&AuthMode::OAuth2).unwrap();
        assert_eq!(json, "\"oauth2\"");
    }

    #[test]
    fn test_cycle_summary_default_is_zeroed() {
        let summary = CycleSummary::default();
        assert_eq!(summary.fetched, 0);
        assert_eq!(summary.upserted, 0);
        assert_eq!(summary.failed, 0);
    }
}
