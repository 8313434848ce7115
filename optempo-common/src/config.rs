//! Configuration loading and resolution
//!
//! Settings are resolved in priority order:
//! 1. Environment variables (`OPTEMPO_*`, highest priority)
//! 2. TOML config file (`$OPTEMPO_CONFIG`, else `~/.config/optempo/optempo.toml`)
//! 3. Compiled defaults (fallback)
//!
//! Invalid values in any tier fall back to the next tier with a warning;
//! configuration loading never fails the process.

use crate::models::BoundingBox;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Default region: UK and surrounding waters (North Sea / Channel)
const DEFAULT_BOUNDS: BoundingBox = BoundingBox {
    lamin: 49.0,
    lomin: -8.5,
    lamax: 61.0,
    lomax: 3.5,
};

const DEFAULT_FEED_URL: &str = "https://opensky-network.org/api";
const DEFAULT_TOKEN_URL: &str =
    "https://auth.opensky-network.org/auth/realms/opensky-network/protocol/openid-connect/token";
const DEFAULT_HTTP_PORT: u16 = 5780;
const DEFAULT_INGEST_INTERVAL_SECS: u64 = 30;

/// Optional overrides read from the TOML config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub feed_url: Option<String>,
    pub token_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub database_path: Option<PathBuf>,
    pub http_port: Option<u16>,
    pub ingest_interval_secs: Option<u64>,
    pub bounds: Option<BoundingBox>,
}

/// Resolved ingestion service configuration
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Base URL of the upstream feed API
    pub feed_url: String,
    /// Token endpoint for the client-credentials exchange
    pub token_url: String,
    /// OAuth2 client id; absent means anonymous access
    pub client_id: Option<String>,
    /// OAuth2 client secret; absent means anonymous access
    pub client_secret: Option<String>,
    /// SQLite database file path
    pub database_path: PathBuf,
    /// Port for the status HTTP surface
    pub http_port: u16,
    /// Ingestion cadence in seconds
    pub ingest_interval_secs: u64,
    /// Region bounds for the snapshot request
    pub bounds: BoundingBox,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            client_id: None,
            client_secret: None,
            database_path: default_database_path(),
            http_port: DEFAULT_HTTP_PORT,
            ingest_interval_secs: DEFAULT_INGEST_INTERVAL_SECS,
            bounds: DEFAULT_BOUNDS,
        }
    }
}

impl IngestConfig {
    /// Resolve configuration from all tiers
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(toml_config) = read_toml_config() {
            config.apply_toml(toml_config);
        }
        config.apply_env();

        config
    }

    fn apply_toml(&mut self, toml: TomlConfig) {
        if let Some(url) = toml.feed_url {
            self.feed_url = url;
        }
        if let Some(url) = toml.token_url {
            self.token_url = url;
        }
        if toml.client_id.is_some() {
            self.client_id = toml.client_id;
        }
        if toml.client_secret.is_some() {
            self.client_secret = toml.client_secret;
        }
        if let Some(path) = toml.database_path {
            self.database_path = path;
        }
        if let Some(port) = toml.http_port {
            self.http_port = port;
        }
        if let Some(secs) = toml.ingest_interval_secs {
            self.ingest_interval_secs = secs;
        }
        if let Some(bounds) = toml.bounds {
            self.bounds = bounds;
        }
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("OPTEMPO_FEED_URL") {
            self.feed_url = url;
        }
        if let Ok(url) = std::env::var("OPTEMPO_TOKEN_URL") {
            self.token_url = url;
        }
        if let Ok(id) = std::env::var("OPTEMPO_CLIENT_ID") {
            self.client_id = Some(id);
        }
        if let Ok(secret) = std::env::var("OPTEMPO_CLIENT_SECRET") {
            self.client_secret = Some(secret);
        }
        if let Ok(path) = std::env::var("OPTEMPO_DB_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Ok(port) = std::env::var("OPTEMPO_HTTP_PORT") {
            match port.parse::<u16>() {
                Ok(port) => self.http_port = port,
                Err(_) => warn!("Ignoring invalid OPTEMPO_HTTP_PORT: {}", port),
            }
        }
        if let Ok(secs) = std::env::var("OPTEMPO_INGEST_INTERVAL_SECS") {
            match secs.parse::<u64>() {
                Ok(secs) if secs > 0 => self.ingest_interval_secs = secs,
                _ => warn!("Ignoring invalid OPTEMPO_INGEST_INTERVAL_SECS: {}", secs),
            }
        }
        if let Ok(raw) = std::env::var("OPTEMPO_BOUNDS") {
            match parse_bounds(&raw) {
                Some(bounds) => self.bounds = bounds,
                None => warn!(
                    "Ignoring invalid OPTEMPO_BOUNDS (expected lamin,lomin,lamax,lomax): {}",
                    raw
                ),
            }
        }
    }

    /// True when a full client-credentials pair is configured
    pub fn has_client_credentials(&self) -> bool {
        matches!(
            (self.client_id.as_deref(), self.client_secret.as_deref()),
            (Some(id), Some(secret)) if !id.trim().is_empty() && !secret.trim().is_empty()
        )
    }
}

/// Parse `"lamin,lomin,lamax,lomax"` into a bounding box
fn parse_bounds(raw: &str) -> Option<BoundingBox> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    if parts.len() != 4 {
        return None;
    }
    Some(BoundingBox::new(parts[0], parts[1], parts[2], parts[3]))
}

/// Config file path: `$OPTEMPO_CONFIG` override, else platform config dir
fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("OPTEMPO_CONFIG") {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join("optempo").join("optempo.toml"))
}

fn read_toml_config() -> Option<TomlConfig> {
    let path = config_file_path()?;
    if !path.exists() {
        return None;
    }
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return None;
        }
    };
    match toml::from_str::<TomlConfig>(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!("Failed to parse config file {}: {}", path.display(), e);
            None
        }
    }
}

/// OS-dependent default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("optempo").join("optempo.db"))
        .unwrap_or_else(|| PathBuf::from("./optempo.db"))
}
