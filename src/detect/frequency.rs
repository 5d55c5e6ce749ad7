//! Bursts of events inside fixed-width time windows.

use crate::detect::stats::flag_crowded_buckets;
use crate::record::FeatureRecord;
use tracing::debug;

/// Windows above `mean + SIGMA·σ` are bursts.
pub const SIGMA: f64 = 3.0;

/// Window index of each row (floor of its timestamp to `window_minutes`);
/// `None` for rows without a parsed timestamp.
pub fn window_keys<R: AsRef<FeatureRecord>>(rows: &[R], window_minutes: u32) -> Vec<Option<i64>> {
    let width = i64::from(window_minutes.max(1)) * 60;
    rows.iter()
        .map(|r| {
            r.as_ref()
                .time
                .map(|t| t.and_utc().timestamp().div_euclid(width))
        })
        .collect()
}

/// Flag rows in windows holding more than `mean + sigma·σ` events.
/// Rows without a timestamp take no part and are never flagged; if fewer
/// than `min_rows` timestamped rows remain, nothing is flagged.
pub fn detect<R: AsRef<FeatureRecord>>(
    rows: &[R],
    min_rows: usize,
    sigma: f64,
    window_minutes: u32,
) -> Vec<bool> {
    if rows.len() < min_rows {
        return vec![false; rows.len()];
    }

    let keys = window_keys(rows, window_minutes);
    let timed = keys.iter().flatten().count();
    if timed < min_rows {
        debug!(timed, min_rows, "too few timestamped rows for frequency detection");
        return vec![false; rows.len()];
    }

    flag_crowded_buckets(&keys, sigma).unwrap_or_else(|e| {
        debug!(error = %e, "frequency detection skipped");
        vec![false; rows.len()]
    })
}
