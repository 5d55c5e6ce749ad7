//! Isolation forest over dense numeric rows.
//!
//! Each tree isolates a random subsample by recursively splitting on a
//! random feature at a uniform cut between the node's min and max. Points
//! that isolate in fewer splits are more anomalous; the score of a row is
//! `2^(-E[h(x)] / c(psi))` where `c` is the expected path length of an
//! unsuccessful binary-search-tree lookup.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Average path length of an unsuccessful search in a BST of `n` nodes.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// `q`-th percentile (0..=100) with linear interpolation between ranks.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

#[derive(Debug)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        value: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn path_length(&self, row: &[f64], depth: usize) -> f64 {
        match self {
            Node::Leaf { size } => depth as f64 + average_path_length(*size),
            Node::Split {
                feature,
                value,
                left,
                right,
            } => {
                if row[*feature] < *value {
                    left.path_length(row, depth + 1)
                } else {
                    right.path_length(row, depth + 1)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_samples: usize,
    pub contamination: f64,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.05,
            seed: 42,
        }
    }
}

#[derive(Debug)]
pub struct IsolationForest {
    trees: Vec<Node>,
    sample_size: usize,
    contamination: f64,
}

impl IsolationForest {
    pub fn fit(rows: &[Vec<f64>], params: ForestParams) -> Self {
        let mut rng = StdRng::seed_from_u64(params.seed);
        let sample_size = params.max_samples.max(1).min(rows.len());
        let height_limit = (sample_size.max(2) as f64).log2().ceil() as usize;

        let trees = if rows.is_empty() {
            Vec::new()
        } else {
            (0..params.n_estimators.max(1))
                .map(|_| {
                    let sample = index::sample(&mut rng, rows.len(), sample_size).into_vec();
                    build(rows, sample, 0, height_limit, &mut rng)
                })
                .collect()
        };

        Self {
            trees,
            sample_size,
            contamination: params.contamination,
        }
    }

    /// Anomaly score per row, in (0, 1]; higher is more anomalous.
    pub fn score_samples(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        if self.trees.is_empty() {
            return vec![0.5; rows.len()];
        }
        let norm = average_path_length(self.sample_size).max(1.0);
        rows.iter()
            .map(|row| {
                let mean_depth = self
                    .trees
                    .iter()
                    .map(|t| t.path_length(row, 0))
                    .sum::<f64>()
                    / self.trees.len() as f64;
                2f64.powf(-mean_depth / norm)
            })
            .collect()
    }

    /// Rows scoring strictly above the `(1 - contamination)` percentile.
    pub fn predict_outliers(&self, rows: &[Vec<f64>]) -> Vec<bool> {
        let scores = self.score_samples(rows);
        let q = 100.0 * (1.0 - self.contamination);
        match percentile(&scores, q) {
            Some(threshold) => scores.iter().map(|&s| s > threshold).collect(),
            None => Vec::new(),
        }
    }
}

fn build(
    rows: &[Vec<f64>],
    sample: Vec<usize>,
    depth: usize,
    height_limit: usize,
    rng: &mut StdRng,
) -> Node {
    if depth >= height_limit || sample.len() <= 1 {
        return Node::Leaf { size: sample.len() };
    }

    let width = rows[sample[0]].len();
    let splittable: Vec<(usize, f64, f64)> = (0..width)
        .filter_map(|f| {
            let (lo, hi) = sample.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                (lo.min(rows[i][f]), hi.max(rows[i][f]))
            });
            (hi > lo).then_some((f, lo, hi))
        })
        .collect();

    if splittable.is_empty() {
        return Node::Leaf { size: sample.len() };
    }

    let (feature, lo, hi) = splittable[rng.gen_range(0..splittable.len())];
    let value = rng.gen_range(lo..hi);
    let (left, right): (Vec<usize>, Vec<usize>) =
        sample.into_iter().partition(|&i| rows[i][feature] < value);

    Node::Split {
        feature,
        value,
        left: Box::new(build(rows, left, depth + 1, height_limit, rng)),
        right: Box::new(build(rows, right, depth + 1, height_limit, rng)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster_with_outlier() -> Vec<Vec<f64>> {
        let mut rows: Vec<Vec<f64>> = (0..49)
            .map(|i| vec![(i % 7) as f64 * 0.1, (i / 7) as f64 * 0.1])
            .collect();
        rows.push(vec![10.0, 10.0]);
        rows
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        assert!(average_path_length(256) > average_path_length(16));
    }

    #[test]
    fn test_percentile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&v, 50.0), Some(3.0));
        assert_eq!(percentile(&v, 100.0), Some(5.0));
        assert_eq!(percentile(&v, 87.5), Some(4.5));
        assert_eq!(percentile(&[], 50.0), None);
    }

    #[test]
    fn test_isolated_point_scores_highest() {
        let rows = cluster_with_outlier();
        let forest = IsolationForest::fit(&rows, ForestParams::default());
        let scores = forest.score_samples(&rows);
        let max = scores[..49].iter().cloned().fold(f64::MIN, f64::max);
        assert!(scores[49] > max);
    }

    #[test]
    fn test_predict_flags_outlier() {
        let rows = cluster_with_outlier();
        let params = ForestParams {
            contamination: 0.02,
            ..ForestParams::default()
        };
        let flags = IsolationForest::fit(&rows, params).predict_outliers(&rows);
        assert!(flags[49]);
        assert_eq!(flags.iter().filter(|&&f| f).count(), 1);
    }

    #[test]
    fn test_seeded_fit_is_deterministic() {
        let rows = cluster_with_outlier();
        let a = IsolationForest::fit(&rows, ForestParams::default()).score_samples(&rows);
        let b = IsolationForest::fit(&rows, ForestParams::default()).score_samples(&rows);
        assert_eq!(a, b);
    }

    #[test]
    fn test_constant_rows_flag_nothing() {
        let rows = vec![vec![1.0, 1.0]; 20];
        let flags = IsolationForest::fit(&rows, ForestParams::default()).predict_outliers(&rows);
        assert!(flags.iter().all(|&f| !f));
    }
}
