//! Upstream feed client
//!
//! Issues the bounded-region snapshot request against the broadcast
//! surveillance feed and normalizes transport/HTTP failures into
//! [`FeedError`]. The controller decides what each variant means for the
//! cycle: 429 ends the cycle early without error, 401 invalidates the
//! cached token, anything else is fatal for this cycle only.

use optempo_common::models::BoundingBox;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

const FEED_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = "optempo/0.1.0 (+https://github.com/optempo/optempo)";

/// Feed request errors
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Feed unreachable: {0}")]
    Transport(String),

    /// Credential rejected; the cached token must be invalidated
    #[error("Feed rejected credentials (401)")]
    Unauthorized,

    /// Throttled; a signal, not a failure — the cycle ends early
    #[error("Feed rate limited (429)")]
    RateLimited,

    #[error("Feed returned {0}: {1}")]
    Api(u16, String),

    #[error("Malformed feed payload: {0}")]
    Parse(String),
}

/// Client for the bounded-region state snapshot endpoint
pub struct FeedClient {
    http: reqwest::Client,
    base_url: String,
}

impl FeedClient {
    pub fn new(base_url: String) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(FEED_TIMEOUT)
            .build()
            .map_err(|e| FeedError::Transport(e.to_string()))?;

        Ok(Self { http, base_url })
    }

    /// Fetch one snapshot of raw state vectors for the region
    ///
    /// A well-formed payload with no traffic yields an empty vector, not
    /// an error. Entries that are not arrays are skipped.
    pub async fn fetch_snapshot(
        &self,
        bounds: &BoundingBox,
        bearer: Option<&str>,
    ) -> Result<Vec<Vec<Value>>, FeedError> {
        let url = format!(
            "{}/states/all?lamin={}&lomin={}&lamax={}&lomax={}",
            self.base_url, bounds.lamin, bounds.lomin, bounds.lamax, bounds.lomax
        );

        let mut request = self.http.get(&url);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        tracing::debug!(url = %url, authenticated = bearer.is_some(), "Fetching feed snapshot");

        let response = request
            .send()
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))?;

        let status = response.status();
        match status.as_u16() {
            401 | 403 => return Err(FeedError::Unauthorized),
            429 => return Err(FeedError::RateLimited),
            _ if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(FeedError::Api(status.as_u16(), body));
            }
            _ => {}
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| FeedError::Parse(e.to_string()))?;

        Ok(extract_states(&payload))
    }
}

/// Pull the `states` array out of the payload
///
/// Absent or null `states` means no traffic in the region.
pub fn extract_states(payload: &Value) -> Vec<Vec<Value>> {
    let Some(states) = payload.get("states").and_then(Value::as_array) else {
        return Vec::new();
    };

    states
        .iter()
        .filter_map(|entry| entry.as_array().cloned())
        .collect()
}
