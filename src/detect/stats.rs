use crate::detect::DetectError;
use std::collections::HashMap;
use std::hash::Hash;

/// Bucket counts (events per hour, per window, per source) for
/// mean + k·σ thresholding.
pub struct CountSeries {
    values: Vec<f64>,
}

impl CountSeries {
    pub fn new<I: IntoIterator<Item = usize>>(counts: I) -> Self {
        Self {
            values: counts.into_iter().map(|c| c as f64).collect(),
        }
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Sample variance (n - 1 denominator).
    pub fn variance(&self) -> f64 {
        if self.values.len() < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let sum_sq_diff: f64 = self.values.iter().map(|&x| (x - mean).powi(2)).sum();
        sum_sq_diff / (self.values.len() - 1) as f64
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// `mean + sigma * std_dev`. Undefined for fewer than two buckets.
    pub fn threshold(&self, sigma: f64) -> Result<f64, DetectError> {
        if self.values.len() < 2 {
            return Err(DetectError::InsufficientBaseline {
                needed: 2,
                have: self.values.len(),
            });
        }
        Ok(self.mean() + sigma * self.std_dev())
    }
}

/// Count occurrences of each key.
pub fn count_by_key<K, I>(keys: I) -> HashMap<K, usize>
where
    K: Hash + Eq,
    I: IntoIterator<Item = K>,
{
    let mut counts = HashMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
}

/// Flag every row whose key's bucket count exceeds `mean + sigma·σ` over the
/// observed buckets. Rows without a key are never flagged.
pub fn flag_crowded_buckets<K>(keys: &[Option<K>], sigma: f64) -> Result<Vec<bool>, DetectError>
where
    K: Hash + Eq,
{
    let counts = count_by_key(keys.iter().flatten());
    let threshold = CountSeries::new(counts.values().copied()).threshold(sigma)?;
    tracing::debug!(buckets = counts.len(), threshold, "bucket threshold");

    Ok(keys
        .iter()
        .map(|key| {
            key.as_ref()
                .and_then(|k| counts.get(k))
                .is_some_and(|&c| c as f64 > threshold)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats() {
        let s = CountSeries::new(vec![1, 2, 3, 4, 5]);
        assert_eq!(s.mean(), 3.0);
        // Sample variance of 1..5 is 2.5
        assert!((s.variance() - 2.5).abs() < 1e-12);
        let t = s.threshold(2.0).unwrap();
        assert!((t - (3.0 + 2.0 * 2.5f64.sqrt())).abs() < 1e-12);
    }

    #[test]
    fn test_single_bucket_has_no_threshold() {
        let s = CountSeries::new(vec![42]);
        assert!(matches!(
            s.threshold(2.0),
            Err(DetectError::InsufficientBaseline { needed: 2, have: 1 })
        ));
    }

    #[test]
    fn test_flag_crowded_buckets() {
        let mut keys: Vec<Option<&str>> = Vec::new();
        for source in ["a", "b", "c", "d", "e", "f", "g", "h"] {
            keys.push(Some(source));
        }
        keys.extend(std::iter::repeat(Some("noisy")).take(40));
        keys.push(None);

        let flags = flag_crowded_buckets(&keys, 2.0).unwrap();
        assert!(!flags[0]);
        assert!(flags[8]);
        assert!(!flags[keys.len() - 1]);
        assert_eq!(flags.iter().filter(|&&f| f).count(), 40);
    }

    #[test]
    fn test_uniform_buckets_flag_nothing() {
        let keys: Vec<Option<u32>> = (0..30).map(|i| Some(i % 3)).collect();
        let flags = flag_crowded_buckets(&keys, 2.0).unwrap();
        assert!(flags.iter().all(|&f| !f));
    }
}
