//! Time and text features derived from each record.

use crate::record::{FeatureRecord, LogRecord};
use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, Timelike};
use tracing::debug;

/// Case-insensitive substrings that mark a message as security-relevant.
pub const SECURITY_KEYWORDS: [&str; 11] = [
    "fail",
    "error",
    "warn",
    "attack",
    "invalid",
    "compromise",
    "threat",
    "attempt",
    "denied",
    "violation",
    "suspicious",
];

// Formats that carry a full date. Tried in order after RFC 3339.
const DATED_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%b/%Y %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

/// Derives `hour`, `day_of_week` and `is_security_event` for each record.
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    /// Year assumed for syslog-style timestamps, which carry none.
    default_year: i32,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(None)
    }
}

impl FeatureExtractor {
    pub fn new(default_year: Option<i32>) -> Self {
        Self {
            default_year: default_year.unwrap_or_else(|| Local::now().year()),
        }
    }

    /// Parse a captured timestamp. Anything unrecognised becomes `None`.
    pub fn parse_timestamp(&self, raw: &str) -> Option<NaiveDateTime> {
        // Syslog pads single-digit days with an extra space.
        let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(&text) {
            return Some(dt.naive_utc());
        }
        for fmt in DATED_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(&text, fmt) {
                return Some(dt);
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
            return date.and_hms_opt(0, 0, 0);
        }

        let with_year = format!("{} {text}", self.default_year);
        NaiveDateTime::parse_from_str(&with_year, "%Y %b %d %H:%M:%S").ok()
    }

    pub fn extract(&self, record: LogRecord) -> FeatureRecord {
        let time = record
            .timestamp
            .as_deref()
            .and_then(|raw| self.parse_timestamp(raw));
        let is_security_event = is_security_event(&record.message);

        FeatureRecord {
            hour: time.map(|t| t.hour()),
            day_of_week: time.map(|t| t.weekday().num_days_from_monday()),
            time,
            is_security_event,
            record,
        }
    }

    pub fn extract_features(&self, records: Vec<LogRecord>) -> Vec<FeatureRecord> {
        let rows: Vec<FeatureRecord> = records.into_iter().map(|r| self.extract(r)).collect();
        let unparsed = rows.iter().filter(|r| r.time.is_none()).count();
        debug!(rows = rows.len(), unparsed, "extracted features");
        rows
    }
}

/// True iff the message contains any [`SECURITY_KEYWORDS`] entry, ignoring case.
pub fn is_security_event(message: &str) -> bool {
    let lower = message.to_lowercase();
    SECURITY_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// [`FeatureExtractor::extract_features`] with the current year as syslog default.
pub fn extract_features(records: Vec<LogRecord>) -> Vec<FeatureRecord> {
    FeatureExtractor::default().extract_features(records)
}
