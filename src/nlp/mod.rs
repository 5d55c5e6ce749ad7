//! Text signals over log messages: security vocabulary, lexicon sentiment
//! and a per-row importance estimate, plus the run summary.

use crate::record::{AnnotatedRecord, TextSignals};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Security vocabulary. A term matches any word it is a prefix of, so
/// `attack` also covers `attacks` and `attacker`.
pub const SECURITY_TERMS: [&str; 24] = [
    "attack",
    "authentication",
    "backdoor",
    "breach",
    "brute",
    "compromise",
    "denied",
    "exploit",
    "failed",
    "firewall",
    "forbidden",
    "intrusion",
    "invalid",
    "malware",
    "password",
    "phishing",
    "privilege",
    "ransomware",
    "root",
    "scan",
    "sudo",
    "trojan",
    "unauthorized",
    "vulnerab",
];

const POSITIVE_WORDS: [&str; 16] = [
    "accepted",
    "allowed",
    "approved",
    "authenticated",
    "completed",
    "granted",
    "healthy",
    "ok",
    "passed",
    "resolved",
    "restored",
    "started",
    "success",
    "successful",
    "succeeded",
    "verified",
];

const NEGATIVE_WORDS: [&str; 24] = [
    "abort",
    "aborted",
    "attack",
    "blocked",
    "breach",
    "compromised",
    "corrupt",
    "critical",
    "denied",
    "error",
    "fail",
    "failed",
    "failure",
    "fatal",
    "invalid",
    "malicious",
    "refused",
    "rejected",
    "suspicious",
    "terminated",
    "timeout",
    "unauthorized",
    "unreachable",
    "violation",
];

/// Importance at or above which a row is high-importance.
pub const HIGH_IMPORTANCE: f64 = 0.7;

fn words(message: &str) -> Vec<String> {
    message
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Vocabulary terms present in `message`, each listed once, in vocabulary
/// order.
pub fn security_terms(message: &str) -> Vec<String> {
    let words = words(message);
    SECURITY_TERMS
        .iter()
        .filter(|term| words.iter().any(|w| w.starts_with(*term)))
        .map(|term| term.to_string())
        .collect()
}

/// `(positive - negative) / (positive + negative)` over lexicon words;
/// 0 when none occur.
pub fn sentiment(message: &str) -> f64 {
    let (mut pos, mut neg) = (0usize, 0usize);
    for word in words(message) {
        if POSITIVE_WORDS.contains(&word.as_str()) {
            pos += 1;
        } else if NEGATIVE_WORDS.contains(&word.as_str()) {
            neg += 1;
        }
    }
    if pos + neg == 0 {
        return 0.0;
    }
    (pos as f64 - neg as f64) / (pos + neg) as f64
}

fn severity_weight(severity: &str) -> f64 {
    match severity.to_ascii_uppercase().as_str() {
        "CRITICAL" | "EMERGENCY" | "ALERT" | "FATAL" => 0.5,
        "ERROR" => 0.4,
        "WARNING" | "WARN" => 0.2,
        _ => 0.0,
    }
}

/// `min(1, 0.15·terms + severity + 0.3·max(0, -sentiment) + 0.2·anomaly)`.
pub fn importance(term_count: usize, severity: &str, sentiment: f64, is_anomaly: bool) -> f64 {
    let score = 0.15 * term_count as f64
        + severity_weight(severity)
        + 0.3 * (-sentiment).max(0.0)
        + if is_anomaly { 0.2 } else { 0.0 };
    score.min(1.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermCount {
    pub term: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NlpSummary {
    pub total_logs: usize,
    pub anomaly_count: usize,
    /// 0-100; 0 for an empty table.
    pub anomaly_percentage: f64,
    pub high_importance_count: usize,
    /// Rows mentioning at least one security term.
    pub security_event_count: usize,
    pub top_security_terms: Vec<TermCount>,
    pub severity_distribution: BTreeMap<String, usize>,
    pub average_sentiment: f64,
}

impl NlpSummary {
    pub fn security_event_percentage(&self) -> f64 {
        percentage(self.security_event_count, self.total_logs)
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

#[derive(Debug, Clone)]
pub struct NlpAnalyzer {
    top_terms: usize,
}

impl Default for NlpAnalyzer {
    fn default() -> Self {
        Self { top_terms: 10 }
    }
}

impl NlpAnalyzer {
    pub fn signals(&self, row: &AnnotatedRecord) -> TextSignals {
        let record = row.record();
        let terms = security_terms(&record.message);
        let sentiment_score = sentiment(&record.message);
        let importance = importance(terms.len(), &record.severity, sentiment_score, row.is_anomaly);
        TextSignals {
            security_term_count: terms.len(),
            security_terms: terms,
            sentiment_score,
            importance,
            high_importance: importance >= HIGH_IMPORTANCE,
        }
    }

    /// Attach text signals to every row and summarize the table.
    pub fn analyze(&self, mut rows: Vec<AnnotatedRecord>) -> (Vec<AnnotatedRecord>, NlpSummary) {
        for row in rows.iter_mut() {
            row.text = self.signals(row);
        }
        let summary = self.summarize(&rows);
        debug!(
            high_importance = summary.high_importance_count,
            terms = summary.top_security_terms.len(),
            "text analysis complete"
        );
        (rows, summary)
    }

    pub fn summarize(&self, rows: &[AnnotatedRecord]) -> NlpSummary {
        let total_logs = rows.len();
        let anomaly_count = rows.iter().filter(|r| r.is_anomaly).count();

        let mut term_counts: HashMap<&str, usize> = HashMap::new();
        let mut severity_distribution = BTreeMap::new();
        for row in rows {
            for term in &row.text.security_terms {
                *term_counts.entry(term.as_str()).or_default() += 1;
            }
            *severity_distribution
                .entry(row.record().severity.clone())
                .or_default() += 1;
        }

        let mut top_security_terms: Vec<TermCount> = term_counts
            .into_iter()
            .map(|(term, count)| TermCount {
                term: term.to_string(),
                count,
            })
            .collect();
        top_security_terms.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));
        top_security_terms.truncate(self.top_terms);

        let average_sentiment = if total_logs == 0 {
            0.0
        } else {
            rows.iter().map(|r| r.text.sentiment_score).sum::<f64>() / total_logs as f64
        };

        NlpSummary {
            total_logs,
            anomaly_count,
            anomaly_percentage: percentage(anomaly_count, total_logs),
            high_importance_count: rows.iter().filter(|r| r.text.high_importance).count(),
            security_event_count: rows.iter().filter(|r| r.text.security_term_count > 0).count(),
            top_security_terms,
            severity_distribution,
            average_sentiment,
        }
    }
}
