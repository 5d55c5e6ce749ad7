//! Hour-of-day activity spikes.

use crate::detect::stats::CountSeries;
use crate::record::FeatureRecord;
use tracing::debug;

/// Hourly buckets above `mean + SIGMA·σ` are busy.
pub const SIGMA: f64 = 2.0;

/// Flag rows whose hour carries more events than `mean + sigma·σ` across
/// all 24 hourly buckets (hours without events count as zero).
pub fn detect<R: AsRef<FeatureRecord>>(rows: &[R], min_rows: usize, sigma: f64) -> Vec<bool> {
    if rows.len() < min_rows {
        return vec![false; rows.len()];
    }

    let mut hourly = [0usize; 24];
    for hour in rows.iter().filter_map(|r| r.as_ref().hour) {
        hourly[hour as usize % 24] += 1;
    }

    let threshold = match CountSeries::new(hourly).threshold(sigma) {
        Ok(t) => t,
        Err(e) => {
            debug!(error = %e, "time-based detection skipped");
            return vec![false; rows.len()];
        }
    };

    let busy: Vec<usize> = (0..24).filter(|&h| hourly[h] as f64 > threshold).collect();
    debug!(threshold, ?busy, "hourly activity threshold");

    rows.iter()
        .map(|r| {
            r.as_ref()
                .hour
                .is_some_and(|h| busy.contains(&(h as usize % 24)))
        })
        .collect()
}
