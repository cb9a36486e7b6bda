//! Observation age parsing
//!
//! Vessel pages report position freshness as free text ("3 min ago",
//! "2 hours ago", "Just now"). Anything we cannot read is treated as
//! maximally stale.

use regex::Regex;
use std::sync::OnceLock;

use crate::STALE_AGE_MINUTES;

fn relative_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d+)\s*(seconds?|secs?|minutes?|mins?|hours?|hrs?|days?)\b")
            .expect("static regex")
    })
}

/// Parse a free-text age phrase into whole minutes
pub fn parse_age_minutes(text: Option<&str>) -> u32 {
    let text = match text.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_lowercase(),
        _ => return STALE_AGE_MINUTES,
    };

    if text
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word == "now" || word == "just")
    {
        return 0;
    }

    if let Some(caps) = relative_regex().captures(&text) {
        let value: u32 = match caps[1].parse() {
            Ok(v) => v,
            Err(_) => return STALE_AGE_MINUTES,
        };
        let unit = &caps[2];
        return if unit.starts_with("sec") {
            0
        } else if unit.starts_with('h') {
            value.saturating_mul(60)
        } else if unit.starts_with('d') {
            value.saturating_mul(1440)
        } else {
            value
        };
    }

    // A bare number is read as minutes
    text.parse().unwrap_or(STALE_AGE_MINUTES)
}
