//! Anomaly detection: four independent signals over the feature table,
//! fused into one score per row.

pub mod forest;
pub mod frequency;
pub mod fusion;
pub mod ml;
pub mod scaler;
pub mod source;
pub mod stats;
pub mod tfidf;
pub mod time;

pub use fusion::{combine_anomaly_scores, ANOMALY_THRESHOLD};

use crate::config::DetectorConfig;
use crate::record::{AnnotatedRecord, FeatureRecord};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("insufficient baseline data: need {needed} samples, have {have}")]
    InsufficientBaseline { needed: usize, have: usize },

    #[error("no usable ML features: no numeric columns, vocabulary or hours")]
    EmptyFeatureSpace,
}

/// Runs every detector over a complete table.
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    config: DetectorConfig,
}

impl AnomalyDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    pub fn detect_time_anomalies<R: AsRef<FeatureRecord>>(&self, rows: &[R]) -> Vec<bool> {
        time::detect(rows, self.config.min_rows, time::SIGMA)
    }

    pub fn detect_ml_anomalies<R: AsRef<FeatureRecord>>(&self, rows: &[R]) -> Vec<bool> {
        ml::detect(rows, &self.config)
    }

    pub fn detect_frequency_anomalies<R: AsRef<FeatureRecord>>(&self, rows: &[R]) -> Vec<bool> {
        frequency::detect(
            rows,
            self.config.min_rows,
            frequency::SIGMA,
            self.config.window_minutes,
        )
    }

    pub fn detect_source_anomalies<R: AsRef<FeatureRecord>>(&self, rows: &[R]) -> Vec<bool> {
        source::detect(rows, self.config.min_rows, source::SIGMA)
    }

    /// Time, ML, frequency and source detection, then fusion. Row count and
    /// order are preserved.
    pub fn analyze(&self, rows: Vec<FeatureRecord>) -> Vec<AnnotatedRecord> {
        let time = self.detect_time_anomalies(&rows);
        let ml = self.detect_ml_anomalies(&rows);
        let frequency = self.detect_frequency_anomalies(&rows);
        let source = self.detect_source_anomalies(&rows);

        let mut annotated: Vec<AnnotatedRecord> = rows
            .into_iter()
            .enumerate()
            .map(|(i, features)| {
                let mut row = AnnotatedRecord::from(features);
                row.anomalies.time_anomaly = Some(time[i]);
                row.anomalies.ml_anomaly = Some(ml[i]);
                row.anomalies.frequency_anomaly = Some(frequency[i]);
                row.anomalies.source_anomaly = Some(source[i]);
                row
            })
            .collect();

        combine_anomaly_scores(&mut annotated, ANOMALY_THRESHOLD);

        let count = |v: &[bool]| v.iter().filter(|&&f| f).count();
        info!(
            rows = annotated.len(),
            time = count(&time),
            ml = count(&ml),
            frequency = count(&frequency),
            source = count(&source),
            anomalies = annotated.iter().filter(|r| r.is_anomaly).count(),
            "anomaly detection complete"
        );
        annotated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{extract_features, parse_lines};

    #[test]
    fn test_small_table_all_false() {
        let lines = [
            "2024-03-04 10:00:00 ERROR [db] connection refused",
            "2024-03-04 10:00:01 ERROR [db] connection refused",
            "2024-03-04 10:00:02 WARNING [web] invalid token",
            "2024-03-04 10:00:03 INFO [web] ok",
            "garbage",
        ];
        let rows = extract_features(parse_lines(lines));
        let out = AnomalyDetector::default().analyze(rows);

        assert_eq!(out.len(), 5);
        for row in &out {
            assert_eq!(row.anomalies.time_anomaly, Some(false));
            assert_eq!(row.anomalies.ml_anomaly, Some(false));
            assert_eq!(row.anomalies.frequency_anomaly, Some(false));
            assert_eq!(row.anomalies.source_anomaly, Some(false));
        }
    }

    #[test]
    fn test_analyze_preserves_order() {
        let lines: Vec<String> = (0..40)
            .map(|i| format!("2024-03-04 {:02}:00:00 INFO [host{}] event {i}", i % 24, i % 4))
            .collect();
        let rows = extract_features(parse_lines(lines.iter().map(String::as_str)));
        let out = AnomalyDetector::default().analyze(rows);

        assert_eq!(out.len(), 40);
        for (i, row) in out.iter().enumerate() {
            assert_eq!(row.record().message, format!("event {i}"));
            assert_eq!(row.is_anomaly, row.anomaly_score >= 1.5);
        }
    }

    #[test]
    fn test_anomaly_cutoff_ignores_detector_config() {
        let lines: Vec<String> = (0..30)
            .map(|i| format!("2024-03-04 03:{:02}:00 ERROR [10.0.0.1] Failed login {i}", i % 5))
            .chain((0..30).map(|i| format!("2024-03-04 {:02}:00:00 INFO [host{i}] ok", i % 24)))
            .collect();
        let config = DetectorConfig {
            min_rows: 5,
            ..DetectorConfig::default()
        };
        let rows = extract_features(parse_lines(lines.iter().map(String::as_str)));
        let out = AnomalyDetector::new(config).analyze(rows);

        assert_eq!(out.len(), 60);
        assert!(out.iter().any(|r| r.is_anomaly));
        for row in &out {
            assert_eq!(row.is_anomaly, row.anomaly_score >= ANOMALY_THRESHOLD);
        }
    }
}
