//! Raw state-vector normalization
//!
//! The upstream feed delivers each record as a fixed-order tuple of
//! heterogeneous JSON values; numeric fields arrive as numbers, strings,
//! or null depending on the reporting sensor. This module coerces them
//! into the canonical record or rejects the record with an explicit
//! reason. Position and observation time are mandatory; kinematic fields
//! are optional and unparsable values degrade to None.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Tuple indices in the upstream `states` array
const IDX_ICAO24: usize = 0;
const IDX_CALLSIGN: usize = 1;
const IDX_ORIGIN_COUNTRY: usize = 2;
const IDX_LAST_CONTACT: usize = 4;
const IDX_LONGITUDE: usize = 5;
const IDX_LATITUDE: usize = 6;
const IDX_BARO_ALTITUDE: usize = 7;
const IDX_ON_GROUND: usize = 8;
const IDX_VELOCITY: usize = 9;
const IDX_TRUE_TRACK: usize = 10;
const IDX_VERTICAL_RATE: usize = 11;

/// Observation time freshness window, relative to ingestion wall clock.
/// Protects the time-series from clock skew and corrupted feed data.
const MAX_FUTURE_SKEW_SECS: i64 = 60;
const MAX_AGE_SECS: i64 = 24 * 3600;

/// One validated, coerced observation
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    /// Lower-cased hex identifier (stable external code)
    pub icao24: String,
    /// Trimmed callsign; None when absent or blank
    pub callsign: Option<String>,
    /// Two-letter country code, best effort
    pub country_code: Option<String>,
    /// Feed's authoritative last-contact time (unix seconds)
    pub ts: i64,
    pub lat: f64,
    pub lon: f64,
    pub altitude: Option<f64>,
    pub velocity: Option<f64>,
    pub heading: Option<f64>,
    pub vertical_rate: Option<f64>,
    pub on_ground: bool,
}

/// Why a raw record was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// No identifier, no asset to attach the observation to
    MissingIdentifier,
    /// No latitude or longitude, no position fix
    MissingPosition,
    /// Missing or non-positive last-contact time
    MissingTimestamp,
    /// Last-contact more than a minute ahead of wall clock
    FutureTimestamp,
    /// Last-contact more than 24 hours old
    StaleTimestamp,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            RejectReason::MissingIdentifier => "missing identifier",
            RejectReason::MissingPosition => "missing position fix",
            RejectReason::MissingTimestamp => "missing last-contact time",
            RejectReason::FutureTimestamp => "last-contact in the future",
            RejectReason::StaleTimestamp => "last-contact too old",
        };
        write!(f, "{}", reason)
    }
}

/// Validate and coerce one raw state vector
pub fn normalize(raw: &[Value], now: DateTime<Utc>) -> Result<CanonicalRecord, RejectReason> {
    let icao24 = field_str(raw, IDX_ICAO24)
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .ok_or(RejectReason::MissingIdentifier)?;

    let lat = field_f64(raw, IDX_LATITUDE).ok_or(RejectReason::MissingPosition)?;
    let lon = field_f64(raw, IDX_LONGITUDE).ok_or(RejectReason::MissingPosition)?;

    let ts = field_f64(raw, IDX_LAST_CONTACT)
        .map(|v| v as i64)
        .filter(|ts| *ts > 0)
        .ok_or(RejectReason::MissingTimestamp)?;

    let age = now.timestamp() - ts;
    if age < -MAX_FUTURE_SKEW_SECS {
        return Err(RejectReason::FutureTimestamp);
    }
    if age > MAX_AGE_SECS {
        return Err(RejectReason::StaleTimestamp);
    }

    let callsign = field_str(raw, IDX_CALLSIGN)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let country_code = field_str(raw, IDX_ORIGIN_COUNTRY)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(country_to_code);

    Ok(CanonicalRecord {
        icao24,
        callsign,
        country_code,
        ts,
        lat,
        lon,
        altitude: field_f64(raw, IDX_BARO_ALTITUDE),
        velocity: field_f64(raw, IDX_VELOCITY),
        heading: field_f64(raw, IDX_TRUE_TRACK),
        vertical_rate: field_f64(raw, IDX_VERTICAL_RATE),
        on_ground: field_bool(raw, IDX_ON_GROUND).unwrap_or(false),
    })
}

fn field_str(raw: &[Value], idx: usize) -> Option<&str> {
    raw.get(idx).and_then(Value::as_str)
}

/// Numeric-or-string-or-null coercion: numbers pass through, numeric
/// strings are parsed, everything else becomes None.
fn field_f64(raw: &[Value], idx: usize) -> Option<f64> {
    match raw.get(idx)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn field_bool(raw: &[Value], idx: usize) -> Option<bool> {
    match raw.get(idx)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|v| v != 0),
        _ => None,
    }
}

/// Country names used by the feed, mapped to ISO 3166-1 alpha-2
const COUNTRY_CODES: &[(&str, &str)] = &[
    ("United Kingdom", "GB"),
    ("United States", "US"),
    ("France", "FR"),
    ("Germany", "DE"),
    ("Netherlands", "NL"),
    ("Belgium", "BE"),
    ("Ireland", "IE"),
    ("Italy", "IT"),
    ("Spain", "ES"),
    ("Portugal", "PT"),
    ("Norway", "NO"),
    ("Sweden", "SE"),
    ("Denmark", "DK"),
    ("Finland", "FI"),
    ("Poland", "PL"),
    ("Canada", "CA"),
    ("Switzerland", "CH"),
    ("Austria", "AT"),
    ("Czech Republic", "CZ"),
    ("Greece", "GR"),
    ("Turkey", "TR"),
    ("Luxembourg", "LU"),
    ("Iceland", "IS"),
    ("Kingdom of the Netherlands", "NL"),
    ("Russian Federation", "RU"),
];

/// Normalize a country name to a 2-letter code
///
/// Unknown names fall back to their first two characters upper-cased.
/// Best effort; a wrong code is preferred over a dropped record.
pub fn country_to_code(name: &str) -> String {
    for (country, code) in COUNTRY_CODES {
        if country.eq_ignore_ascii_case(name) {
            return (*code).to_string();
        }
    }
    name.chars().take(2).collect::<String>().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_state(
        icao24: Value,
        callsign: Value,
        country: Value,
        last_contact: Value,
        lon: Value,
        lat: Value,
    ) -> Vec<Value> {
        vec![
            icao24,
            callsign,
            country,
            Value::Null, // time_position
            last_contact,
            lon,
            lat,
            json!(10972.8),  // baro_altitude
            json!(false),    // on_ground
            json!(231.5),    // velocity
            json!(184.2),    // true_track
            json!(-4.55),    // vertical_rate
            Value::Null,     // sensors
            Value::Null,     // geo_altitude
            Value::Null,     // squawk
            json!(false),    // spi
            json!(0),        // position_source
        ]
    }

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn test_valid_record_normalizes() {
        let ts = now().timestamp() - 5;
        let raw = raw_state(
            json!("43C123"),
            json!("RRR4421 "),
            json!("United Kingdom"),
            json!(ts),
            json!(-0.1),
            json!(51.5),
        );

        let rec = normalize(&raw, now()).expect("should normalize");
        assert_eq!(rec.icao24, "43c123");
        assert_eq!(rec.callsign.as_deref(), Some("RRR4421"));
        assert_eq!(rec.country_code.as_deref(), Some("GB"));
        assert_eq!(rec.ts, ts);
        assert_eq!(rec.lat, 51.5);
        assert_eq!(rec.lon, -0.1);
        assert_eq!(rec.altitude, Some(10972.8));
        assert!(!rec.on_ground);
    }

    #[test]
    fn test_numeric_strings_are_parsed() {
        let ts = now().timestamp() - 5;
        let mut raw = raw_state(
            json!("ae0123"),
            Value::Null,
            json!("United States"),
            json!(ts.to_string()),
            json!("-0.1"),
            json!("51.5"),
        );
        raw[7] = json!("11000.0"); // altitude as text
        raw[9] = json!("not a number"); // unparsable velocity

        let rec = normalize(&raw, now()).expect("should normalize");
        assert_eq!(rec.lat, 51.5);
        assert_eq!(rec.ts, ts);
        assert_eq!(rec.altitude, Some(11000.0));
        // Unparsable optional numerics degrade to None, not rejection
        assert_eq!(rec.velocity, None);
        assert_eq!(rec.callsign, None);
    }

    #[test]
    fn test_missing_identifier_rejected() {
        let ts = now().timestamp();
        for icao in [Value::Null, json!(""), json!("   ")] {
            let raw = raw_state(icao, Value::Null, Value::Null, json!(ts), json!(0.0), json!(50.0));
            assert_eq!(normalize(&raw, now()), Err(RejectReason::MissingIdentifier));
        }
    }

    #[test]
    fn test_missing_position_rejected() {
        let ts = now().timestamp();
        let raw = raw_state(json!("43c123"), Value::Null, Value::Null, json!(ts), Value::Null, json!(50.0));
        assert_eq!(normalize(&raw, now()), Err(RejectReason::MissingPosition));

        let raw = raw_state(json!("43c123"), Value::Null, Value::Null, json!(ts), json!(0.0), Value::Null);
        assert_eq!(normalize(&raw, now()), Err(RejectReason::MissingPosition));
    }

    #[test]
    fn test_missing_or_nonpositive_timestamp_rejected() {
        for ts in [Value::Null, json!(0), json!(-5)] {
            let raw = raw_state(json!("43c123"), Value::Null, Value::Null, ts, json!(0.0), json!(50.0));
            assert_eq!(normalize(&raw, now()), Err(RejectReason::MissingTimestamp));
        }
    }

    #[test]
    fn test_freshness_window_boundaries() {
        let now = now();

        // 25 hours old: always rejected
        let stale = raw_state(
            json!("43c123"),
            Value::Null,
            Value::Null,
            json!(now.timestamp() - 25 * 3600),
            json!(0.0),
            json!(50.0),
        );
        assert_eq!(normalize(&stale, now), Err(RejectReason::StaleTimestamp));

        // 2 minutes in the future: rejected
        let future = raw_state(
            json!("43c123"),
            Value::Null,
            Value::Null,
            json!(now.timestamp() + 120),
            json!(0.0),
            json!(50.0),
        );
        assert_eq!(normalize(&future, now), Err(RejectReason::FutureTimestamp));

        // 23 hours old and 30 seconds ahead: inside the window
        for ts in [now.timestamp() - 23 * 3600, now.timestamp() + 30] {
            let ok = raw_state(
                json!("43c123"),
                Value::Null,
                Value::Null,
                json!(ts),
                json!(0.0),
                json!(50.0),
            );
            assert!(normalize(&ok, now).is_ok());
        }
    }

    #[test]
    fn test_short_tuple_rejected_not_panicking() {
        let raw = vec![json!("43c123"), json!("RRR1")];
        assert_eq!(normalize(&raw, now()), Err(RejectReason::MissingPosition));
    }

    #[test]
    fn test_country_lookup_and_fallback() {
        assert_eq!(country_to_code("United Kingdom"), "GB");
        assert_eq!(country_to_code("united kingdom"), "GB");
        assert_eq!(country_to_code("Germany"), "DE");
        // Unknown names: first two characters upper-cased, best effort
        assert_eq!(country_to_code("Atlantis"), "AT");
        assert_eq!(country_to_code("x"), "X");
    }
}
