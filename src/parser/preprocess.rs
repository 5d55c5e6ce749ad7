//! Projection of the feature table into a flat, one-hot encoded frame for
//! the ML detector.

use crate::record::FeatureRecord;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeSet;

/// Fill value for every null cell, numeric columns included.
pub const FILL_VALUE: &str = "unknown";

/// One cell of an [`MlFrame`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Time(NaiveDateTime),
    Int(i64),
    Bool(bool),
    Text(String),
}

impl Cell {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            _ => None,
        }
    }
}

/// Column-named rows, as produced by [`preprocess_for_ml`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct MlFrame {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl MlFrame {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Columns whose every cell is numeric. A column with a filled null
    /// holds text and is therefore excluded.
    pub fn numeric_columns(&self) -> Vec<usize> {
        if self.rows.is_empty() {
            return Vec::new();
        }
        (0..self.columns.len())
            .filter(|&c| self.rows.iter().all(|row| matches!(row[c], Cell::Int(_))))
            .collect()
    }

    pub fn column_values(&self, col: usize) -> Vec<f64> {
        self.rows
            .iter()
            .map(|row| row[col].as_f64().unwrap_or(f64::NAN))
            .collect()
    }
}

fn text_or_fill(value: Option<&str>) -> Cell {
    Cell::Text(value.unwrap_or(FILL_VALUE).to_string())
}

fn int_or_fill(value: Option<u32>) -> Cell {
    value.map_or_else(|| Cell::Text(FILL_VALUE.to_string()), |v| Cell::Int(i64::from(v)))
}

/// Project to the ML column subset, one-hot encode `log_type` and
/// `severity` (observed categories only), and fill nulls with
/// [`FILL_VALUE`].
pub fn preprocess_for_ml<R: AsRef<FeatureRecord>>(rows: &[R]) -> MlFrame {
    let log_types: BTreeSet<&str> = rows
        .iter()
        .map(|r| r.as_ref().record.log_type.as_str())
        .collect();
    let severities: BTreeSet<&str> = rows
        .iter()
        .map(|r| r.as_ref().record.severity.as_str())
        .collect();

    let mut columns: Vec<String> = [
        "timestamp",
        "message",
        "source",
        "is_security_event",
        "hour",
        "day_of_week",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect();
    columns.extend(log_types.iter().map(|t| format!("log_type_{t}")));
    columns.extend(severities.iter().map(|s| format!("severity_{s}")));

    let rows = rows
        .iter()
        .map(|r| {
            let f = r.as_ref();
            let mut row = vec![
                f.time.map_or_else(|| text_or_fill(None), Cell::Time),
                text_or_fill(Some(&f.record.message)),
                text_or_fill(Some(&f.record.source)),
                Cell::Bool(f.is_security_event),
                int_or_fill(f.hour),
                int_or_fill(f.day_of_week),
            ];
            row.extend(
                log_types
                    .iter()
                    .map(|t| Cell::Bool(f.record.log_type.as_str() == *t)),
            );
            row.extend(
                severities
                    .iter()
                    .map(|s| Cell::Bool(f.record.severity == *s)),
            );
            row
        })
        .collect();

    MlFrame { columns, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::features::FeatureExtractor;
    use crate::record::{LogRecord, LogType};

    fn rows() -> Vec<FeatureRecord> {
        let mut a = LogRecord::new(LogType::Generic, "ok");
        a.timestamp = Some("2024-03-04 10:00:00".into());
        a.severity = "ERROR".into();
        let b = LogRecord::unknown("raw");
        FeatureExtractor::new(Some(2024)).extract_features(vec![a, b])
    }

    #[test]
    fn test_one_hot_columns_for_observed_categories() {
        let frame = preprocess_for_ml(&rows());
        assert!(frame.column_index("log_type_generic").is_some());
        assert!(frame.column_index("log_type_unknown").is_some());
        assert!(frame.column_index("log_type_apache").is_none());
        assert!(frame.column_index("severity_ERROR").is_some());
        assert!(frame.column_index("severity_INFO").is_some());
        // log_type/severity themselves are replaced by indicators
        assert!(frame.column_index("log_type").is_none());

        let generic = frame.column_index("log_type_generic").unwrap();
        assert_eq!(frame.rows[0][generic], Cell::Bool(true));
        assert_eq!(frame.rows[1][generic], Cell::Bool(false));
    }

    #[test]
    fn test_nulls_filled_with_unknown_even_when_numeric() {
        let frame = preprocess_for_ml(&rows());
        let hour = frame.column_index("hour").unwrap();
        let ts = frame.column_index("timestamp").unwrap();
        assert_eq!(frame.rows[0][hour], Cell::Int(10));
        assert_eq!(frame.rows[1][hour], Cell::Text("unknown".into()));
        assert_eq!(frame.rows[1][ts], Cell::Text("unknown".into()));
        // The filled column no longer counts as numeric.
        assert!(frame.numeric_columns().is_empty());
    }

    #[test]
    fn test_numeric_columns_when_fully_populated() {
        let all = rows().into_iter().take(1).collect::<Vec<_>>();
        let frame = preprocess_for_ml(&all);
        let numeric = frame.numeric_columns();
        assert_eq!(numeric.len(), 2);
        assert_eq!(frame.columns[numeric[0]], "hour");
        assert_eq!(frame.columns[numeric[1]], "day_of_week");
    }
}
