//! Record model: one parsed log line, its derived feature columns, and the
//! anomaly/text columns added by the detector and the NLP summarizer.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Severity assigned when a grammar carries no level of its own.
pub const DEFAULT_SEVERITY: &str = "INFO";

/// Placeholder for missing source/user identifiers.
pub const UNKNOWN: &str = "unknown";

/// Which grammar produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    Generic,
    Apache,
    Windows,
    Ssh,
    /// Pre-structured document pulled from a search index.
    Index,
    Unknown,
}

impl LogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogType::Generic => "generic",
            LogType::Apache => "apache",
            LogType::Windows => "windows",
            LogType::Ssh => "ssh",
            LogType::Index => "index",
            LogType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for LogType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed log line.
///
/// `timestamp` holds the captured text; feature extraction turns it into a
/// point in time (or null).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: Option<String>,
    pub log_type: LogType,
    pub severity: String,
    pub source: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_attempt: Option<bool>,
    /// Search-index document id, kept so write-back updates the same document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
}

impl LogRecord {
    pub fn new(log_type: LogType, message: impl Into<String>) -> Self {
        Self {
            timestamp: None,
            log_type,
            severity: DEFAULT_SEVERITY.to_string(),
            source: UNKNOWN.to_string(),
            message: message.into(),
            status_code: None,
            request_path: None,
            username: None,
            failed_attempt: None,
            doc_id: None,
        }
    }

    /// Fallback record for a line no grammar could parse.
    pub fn unknown(line: &str) -> Self {
        Self::new(LogType::Unknown, line)
    }
}

/// A [`LogRecord`] plus the columns derived from its timestamp and message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRecord {
    #[serde(flatten)]
    pub record: LogRecord,
    /// Parsed form of `record.timestamp`; `None` when absent or unparseable.
    pub time: Option<NaiveDateTime>,
    pub hour: Option<u32>,
    /// Monday = 0 .. Sunday = 6.
    pub day_of_week: Option<u32>,
    pub is_security_event: bool,
}

impl AsRef<FeatureRecord> for FeatureRecord {
    fn as_ref(&self) -> &FeatureRecord {
        self
    }
}

/// Per-detector anomaly columns.
///
/// `None` means the detector never ran over the table and contributes
/// nothing to fusion; `Some(false)` means it ran (or short-circuited on
/// sparse data) and did not flag the row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnomalyFlags {
    pub time_anomaly: Option<bool>,
    pub ml_anomaly: Option<bool>,
    pub frequency_anomaly: Option<bool>,
    pub source_anomaly: Option<bool>,
}

/// Text-derived signals attached by the NLP summarizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TextSignals {
    pub security_terms: Vec<String>,
    pub security_term_count: usize,
    pub sentiment_score: f64,
    pub importance: f64,
    pub high_importance: bool,
}

/// A fully annotated row of the analysis table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedRecord {
    #[serde(flatten)]
    pub features: FeatureRecord,
    #[serde(flatten)]
    pub anomalies: AnomalyFlags,
    pub anomaly_score: f64,
    pub is_anomaly: bool,
    #[serde(flatten)]
    pub text: TextSignals,
}

impl AnnotatedRecord {
    pub fn record(&self) -> &LogRecord {
        &self.features.record
    }
}

impl From<FeatureRecord> for AnnotatedRecord {
    fn from(features: FeatureRecord) -> Self {
        Self {
            features,
            anomalies: AnomalyFlags::default(),
            anomaly_score: 0.0,
            is_anomaly: false,
            text: TextSignals::default(),
        }
    }
}

impl AsRef<FeatureRecord> for AnnotatedRecord {
    fn as_ref(&self) -> &FeatureRecord {
        &self.features
    }
}
