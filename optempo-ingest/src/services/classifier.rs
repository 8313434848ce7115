//! Military-interest classification
//!
//! Pure prefix matching against data-driven rule tables. A record is of
//! interest when either its hex identifier falls in a known military
//! allocation range or its callsign belongs to a known military family.
//! Records that fail classification are dropped before persistence.
//!
//! New identifier or callsign families are additions to the tables below,
//! not new code paths.

/// One tagged prefix rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixRule {
    /// Upper-cased prefix to match
    pub prefix: &'static str,
    /// Short tag naming the allocation/family, for logging
    pub tag: &'static str,
}

/// ICAO24 hex prefixes inside known military allocation ranges
pub const HEX_RULES: &[PrefixRule] = &[
    PrefixRule { prefix: "43C", tag: "uk-mil" },
    PrefixRule { prefix: "AE", tag: "us-mil" },
    PrefixRule { prefix: "3B7", tag: "fr-mil" },
    PrefixRule { prefix: "3F8", tag: "de-mil" },
    PrefixRule { prefix: "33F", tag: "it-mil" },
    PrefixRule { prefix: "48D8", tag: "nl-mil" },
];

/// Callsign prefixes of known military callsign families
pub const CALLSIGN_RULES: &[PrefixRule] = &[
    PrefixRule { prefix: "RRR", tag: "raf" },
    PrefixRule { prefix: "RFR", tag: "royal-navy" },
    PrefixRule { prefix: "RCH", tag: "usaf-reach" },
    PrefixRule { prefix: "CFC", tag: "canforce" },
    PrefixRule { prefix: "GAF", tag: "german-af" },
    PrefixRule { prefix: "BAF", tag: "belgian-af" },
    PrefixRule { prefix: "IAM", tag: "italian-af" },
    PrefixRule { prefix: "NATO", tag: "nato" },
];

/// Find the first rule whose prefix matches the value (case-insensitive)
pub fn match_rule<'a>(rules: &'a [PrefixRule], value: &str) -> Option<&'a PrefixRule> {
    let value = value.trim().to_ascii_uppercase();
    if value.is_empty() {
        return None;
    }
    rules.iter().find(|rule| value.starts_with(rule.prefix))
}

/// Classify a sighting as military-interest or not
///
/// Either a hex-identifier match or a callsign match is sufficient.
/// Pure function, no I/O.
pub fn is_of_interest(icao24: Option<&str>, callsign: Option<&str>) -> bool {
    classify(icao24, callsign).is_some()
}

/// As [`is_of_interest`], but returns the matching rule for logging
pub fn classify(icao24: Option<&str>, callsign: Option<&str>) -> Option<&'static PrefixRule> {
    if let Some(hex) = icao24 {
        if let Some(rule) = match_rule(HEX_RULES, hex) {
            return Some(rule);
        }
    }
    if let Some(callsign) = callsign {
        if let Some(rule) = match_rule(CALLSIGN_RULES, callsign) {
            return Some(rule);
        }
    }
    None
}
