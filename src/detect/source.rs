//! Sources producing a disproportionate share of events.

use crate::detect::stats::flag_crowded_buckets;
use crate::record::FeatureRecord;
use tracing::debug;

/// Sources above `mean + SIGMA·σ` are dominant.
pub const SIGMA: f64 = 2.5;

/// Flag rows whose source emitted more than `mean + sigma·σ` events, where
/// the statistics run over the per-source counts.
pub fn detect<R: AsRef<FeatureRecord>>(rows: &[R], min_rows: usize, sigma: f64) -> Vec<bool> {
    if rows.len() < min_rows {
        return vec![false; rows.len()];
    }

    let keys: Vec<Option<&str>> = rows
        .iter()
        .map(|r| Some(r.as_ref().record.source.as_str()))
        .collect();

    flag_crowded_buckets(&keys, sigma).unwrap_or_else(|e| {
        debug!(error = %e, "source-based detection skipped");
        vec![false; rows.len()]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{LogRecord, LogType};

    fn from(source: &str) -> FeatureRecord {
        let mut record = LogRecord::new(LogType::Generic, "x");
        record.source = source.to_string();
        FeatureRecord {
            record,
            time: None,
            hour: None,
            day_of_week: None,
            is_security_event: false,
        }
    }

    #[test]
    fn test_dominant_source() {
        let mut rows: Vec<_> = (0..180).map(|_| from("10.0.0.66")).collect();
        rows.extend((0..20).map(|i| from(&format!("10.0.1.{}", i % 10))));

        let flags = detect(&rows, 10, 2.5);
        assert!(flags[..180].iter().all(|&f| f));
        assert!(flags[180..].iter().all(|&f| !f));
    }

    #[test]
    fn test_single_source_flags_nothing() {
        let rows: Vec<_> = (0..50).map(|_| from("only")).collect();
        assert!(detect(&rows, 10, 2.5).iter().all(|&f| !f));
    }
}
