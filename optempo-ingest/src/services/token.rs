//! Upstream feed credential management
//!
//! OAuth2 client-credentials exchange with a single cached-token slot.
//! A cached token is reused until expiry minus a safety margin. Absent
//! client credentials the manager reports anonymous mode and the feed is
//! queried without a bearer; a failed exchange clears the cache and the
//! caller falls back to anonymous for the cycle rather than aborting.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use optempo_common::models::AuthMode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

const TOKEN_TIMEOUT: Duration = Duration::from_secs(15);

/// Do not use a token within this many seconds of its expiry
const EXPIRY_MARGIN_SECS: i64 = 300;

/// Token exchange errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token endpoint unreachable: {0}")]
    Transport(String),

    #[error("Malformed token response: {0}")]
    BadResponse(String),

    #[error("Token endpoint returned {0}: {1}")]
    Api(u16, String),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - ChronoDuration::seconds(EXPIRY_MARGIN_SECS)
    }
}

/// Manages the single cached bearer credential for the upstream feed
pub struct TokenManager {
    http: reqwest::Client,
    token_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenManager {
    pub fn new(
        token_url: String,
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> Result<Self, TokenError> {
        let http = reqwest::Client::builder()
            .timeout(TOKEN_TIMEOUT)
            .build()
            .map_err(|e| TokenError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            token_url,
            client_id,
            client_secret,
            cached: Mutex::new(None),
        })
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) if !id.trim().is_empty() && !secret.trim().is_empty() => {
                Some((id, secret))
            }
            _ => None,
        }
    }

    /// Authentication mode this manager can offer
    pub fn auth_mode(&self) -> AuthMode {
        if self.credentials().is_some() {
            AuthMode::OAuth2
        } else {
            AuthMode::Anonymous
        }
    }

    /// Current bearer token, requesting a new one if needed
    ///
    /// Returns `Ok(None)` when no client credentials are configured
    /// (signal: proceed unauthenticated). Safe to call repeatedly; a
    /// valid cached token is reused without a network request.
    pub async fn bearer_token(&self) -> Result<Option<String>, TokenError> {
        let Some((client_id, client_secret)) = self.credentials() else {
            return Ok(None);
        };

        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.is_valid(Utc::now()) {
                return Ok(Some(token.access_token.clone()));
            }
        }

        // Expired or absent: exchange client credentials for a new token.
        // On failure the cache is cleared so the next cycle retries.
        match self.request_token(client_id, client_secret).await {
            Ok(token) => {
                tracing::info!(
                    expires_at = %token.expires_at,
                    "Obtained new feed access token"
                );
                let access_token = token.access_token.clone();
                *cached = Some(token);
                Ok(Some(access_token))
            }
            Err(e) => {
                *cached = None;
                Err(e)
            }
        }
    }

    /// Drop the cached token so the next cycle re-authenticates
    ///
    /// Called when the feed answers 401 with a token we believed valid.
    pub async fn invalidate(&self) {
        let mut cached = self.cached.lock().await;
        if cached.take().is_some() {
            tracing::warn!("Cached feed token invalidated by upstream 401");
        }
    }

    async fn request_token(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<CachedToken, TokenError> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| TokenError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TokenError::Api(status.as_u16(), body));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| TokenError::BadResponse(e.to_string()))?;

        if token.access_token.is_empty() || token.expires_in <= 0 {
            return Err(TokenError::BadResponse(
                "empty access_token or non-positive expires_in".to_string(),
            ));
        }

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Utc::now() + ChronoDuration::seconds(token.expires_in),
        })
    }
}
