//! Request bodies and documents exchanged with the search index.

use crate::record::AnnotatedRecord;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::net::IpAddr;

/// `@timestamp` range filter. Bounds are date-math or ISO strings as the
/// index understands them (`now-24h`, `2024-03-01T00:00:00`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<String>,
}

impl TimeRange {
    /// `24h`, `7d` and similar become `now-24h`; anything else is taken as
    /// a literal lower bound.
    pub fn since(expr: &str) -> Self {
        let expr = expr.trim();
        let relative = expr.ends_with(['s', 'm', 'h', 'd', 'w', 'M', 'y'])
            && expr.len() > 1
            && expr[..expr.len() - 1].chars().all(|c| c.is_ascii_digit());
        let gte = if relative {
            format!("now-{expr}")
        } else {
            expr.to_string()
        };
        Self {
            gte: Some(gte),
            lte: None,
        }
    }
}

/// Bool query: `match_all` (or `query`) as the must clause, an optional
/// `@timestamp` range filter, newest first.
pub fn search_body(size: usize, time_range: Option<&TimeRange>, query: Option<&Value>) -> Value {
    let must = query.cloned().unwrap_or_else(|| json!({ "match_all": {} }));
    let mut bool_query = json!({ "must": [must] });
    if let Some(range) = time_range {
        bool_query["filter"] = json!([{ "range": { "@timestamp": range } }]);
    }
    json!({
        "size": size,
        "query": { "bool": bool_query },
        "sort": [{ "@timestamp": { "order": "desc" } }],
    })
}

/// Mapping applied when the results index is created.
pub fn index_mappings() -> Value {
    json!({
        "mappings": {
            "properties": {
                "@timestamp": { "type": "date" },
                "message": { "type": "text" },
                "log_level": { "type": "keyword" },
                "source_ip": { "type": "ip" },
                "is_anomaly": { "type": "boolean" },
                "anomaly_score": { "type": "float" },
                "security_term_count": { "type": "integer" },
                "sentiment_score": { "type": "float" },
                "analysis_timestamp": { "type": "date" }
            }
        }
    })
}

/// One annotated row as an index document.
///
/// `severity` is written as `log_level`, the parsed time as `@timestamp`,
/// and `source` additionally as `source_ip` when it is an IP address.
/// The document id is not part of the body.
pub fn to_document(row: &AnnotatedRecord, analysis_timestamp: &str) -> Value {
    let mut doc = match serde_json::to_value(row) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    doc.remove("doc_id");
    doc.remove("time");
    if let Some(severity) = doc.remove("severity") {
        doc.insert("log_level".into(), severity);
    }

    let record = row.record();
    if let Some(time) = row.features.time {
        doc.insert(
            "@timestamp".into(),
            Value::String(time.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        );
    }
    if record.source.parse::<IpAddr>().is_ok() {
        doc.insert("source_ip".into(), Value::String(record.source.clone()));
    }
    doc.insert(
        "analysis_timestamp".into(),
        Value::String(analysis_timestamp.to_string()),
    );
    Value::Object(doc)
}

/// NDJSON body for `_bulk`: an `index` action line and a source line per
/// row, ending with a newline.
pub fn bulk_body(rows: &[AnnotatedRecord], index: &str, analysis_timestamp: &str) -> String {
    let mut body = String::new();
    for row in rows {
        let mut meta = json!({ "_index": index });
        if let Some(id) = &row.record().doc_id {
            meta["_id"] = Value::String(id.clone());
        }
        body.push_str(&json!({ "index": meta }).to_string());
        body.push('\n');
        body.push_str(&to_document(row, analysis_timestamp).to_string());
        body.push('\n');
    }
    body
}

/// Per-item result counts of a `_bulk` request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub indexed: usize,
    pub failed: usize,
}

impl BulkOutcome {
    pub fn from_response(response: &Value) -> Self {
        let mut outcome = Self::default();
        for item in response["items"].as_array().into_iter().flatten() {
            let result = item
                .as_object()
                .and_then(|m| m.values().next())
                .cloned()
                .unwrap_or(Value::Null);
            let status = result["status"].as_u64().unwrap_or(0);
            if result.get("error").is_none() && (200..300).contains(&status) {
                outcome.indexed += 1;
            } else {
                outcome.failed += 1;
            }
        }
        outcome
    }
}

/// `_source` of every hit, with the hit's `_id` added.
pub fn hits_to_documents(response: &Value) -> Vec<Value> {
    response["hits"]["hits"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|hit| {
            let mut source = hit["_source"].as_object()?.clone();
            if let Some(id) = hit["_id"].as_str() {
                source.insert("_id".into(), Value::String(id.to_string()));
            }
            Some(Value::Object(source))
        })
        .collect()
}
