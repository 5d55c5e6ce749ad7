//! Conversion of pre-structured search-index documents into records.

use crate::record::{LogRecord, LogType};
use serde_json::Value;
use tracing::warn;

const TIMESTAMP_KEYS: [&str; 2] = ["@timestamp", "timestamp"];
const SEVERITY_KEYS: [&str; 4] = ["log_level", "level", "severity", "log.level"];
const SOURCE_KEYS: [&str; 5] = ["source_ip", "source", "source.ip", "host.name", "host"];

/// Look up a possibly dotted key, trying the flat form first.
fn lookup<'a>(doc: &'a Value, key: &str) -> Option<&'a Value> {
    if let Some(v) = doc.get(key) {
        return Some(v);
    }
    key.split('.').try_fold(doc, |node, part| node.get(part))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn first_text(doc: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| lookup(doc, k))
        .find_map(scalar_text)
}

/// Convert one document. Documents without a message yield `None`.
pub fn record_from_document(doc: &Value) -> Option<LogRecord> {
    let message = first_text(doc, &["message"])?;

    let mut rec = LogRecord::new(LogType::Index, message);
    rec.timestamp = first_text(doc, &TIMESTAMP_KEYS);
    if let Some(severity) = first_text(doc, &SEVERITY_KEYS) {
        rec.severity = severity.to_uppercase();
    }
    if let Some(source) = first_text(doc, &SOURCE_KEYS) {
        rec.source = source;
    }
    rec.doc_id = doc.get("_id").and_then(scalar_text);
    Some(rec)
}

/// Convert search-index hits, skipping (and reporting) message-less ones.
pub fn records_from_documents(docs: &[Value]) -> Vec<LogRecord> {
    let records: Vec<LogRecord> = docs.iter().filter_map(record_from_document).collect();
    let skipped = docs.len() - records.len();
    if skipped > 0 {
        warn!(skipped, "documents without a message field were skipped");
    }
    records
}
