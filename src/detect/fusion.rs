//! Weighted fusion of the per-detector flags into one score.

use crate::record::{AnnotatedRecord, AnomalyFlags};

pub const TIME_WEIGHT: f64 = 1.0;
pub const ML_WEIGHT: f64 = 2.0;
pub const FREQUENCY_WEIGHT: f64 = 1.5;
pub const SOURCE_WEIGHT: f64 = 1.0;
pub const SECURITY_EVENT_WEIGHT: f64 = 0.5;

/// Score at or above which a row is an anomaly.
pub const ANOMALY_THRESHOLD: f64 = 1.5;

fn term(flag: Option<bool>, weight: f64) -> f64 {
    if flag == Some(true) {
        weight
    } else {
        0.0
    }
}

/// Score of one row. Detectors that never ran contribute nothing.
pub fn score(flags: &AnomalyFlags, is_security_event: bool) -> f64 {
    term(flags.time_anomaly, TIME_WEIGHT)
        + term(flags.ml_anomaly, ML_WEIGHT)
        + term(flags.frequency_anomaly, FREQUENCY_WEIGHT)
        + term(flags.source_anomaly, SOURCE_WEIGHT)
        + term(Some(is_security_event), SECURITY_EVENT_WEIGHT)
}

/// Fill `anomaly_score` and `is_anomaly` on every row.
pub fn combine_anomaly_scores(rows: &mut [AnnotatedRecord], threshold: f64) {
    for row in rows {
        row.anomaly_score = score(&row.anomalies, row.features.is_security_event);
        row.is_anomaly = row.anomaly_score >= threshold;
    }
}
