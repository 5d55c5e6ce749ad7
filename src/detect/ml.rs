//! Isolation-forest detector over the ML projection of the table.

use crate::config::DetectorConfig;
use crate::detect::forest::{ForestParams, IsolationForest};
use crate::detect::scaler::StandardScaler;
use crate::detect::tfidf::TfidfVectorizer;
use crate::detect::DetectError;
use crate::parser::preprocess_for_ml;
use crate::record::FeatureRecord;
use tracing::{debug, warn};

/// Dense feature rows for the forest.
///
/// Uses the fully-populated numeric columns of the ML frame when there are
/// at least two. Otherwise falls back to TF-IDF over the messages, with the
/// hour appended (missing hours take the column mean) when any row has one.
pub fn build_feature_matrix<R: AsRef<FeatureRecord>>(
    rows: &[R],
    max_tfidf_features: usize,
) -> Result<Vec<Vec<f64>>, DetectError> {
    let frame = preprocess_for_ml(rows);
    let numeric = frame.numeric_columns();

    if numeric.len() >= 2 {
        let names: Vec<&str> = numeric.iter().map(|&c| frame.columns[c].as_str()).collect();
        debug!(columns = ?names, "ml features from numeric columns");
        let columns: Vec<Vec<f64>> = numeric.iter().map(|&c| frame.column_values(c)).collect();
        return Ok((0..rows.len())
            .map(|r| columns.iter().map(|col| col[r]).collect())
            .collect());
    }

    let messages: Vec<&str> = rows
        .iter()
        .map(|r| r.as_ref().record.message.as_str())
        .collect();
    let tfidf = TfidfVectorizer::new(max_tfidf_features).fit_transform(&messages);
    let mut matrix = tfidf.rows;

    let hours: Vec<Option<f64>> = rows
        .iter()
        .map(|r| r.as_ref().hour.map(f64::from))
        .collect();
    let known: Vec<f64> = hours.iter().flatten().copied().collect();
    if !known.is_empty() {
        let mean = known.iter().sum::<f64>() / known.len() as f64;
        for (row, hour) in matrix.iter_mut().zip(&hours) {
            row.push(hour.unwrap_or(mean));
        }
    }

    let width = matrix.first().map_or(0, Vec::len);
    debug!(
        terms = tfidf.vocabulary.len(),
        with_hour = !known.is_empty(),
        "ml features from message text"
    );
    if width == 0 {
        return Err(DetectError::EmptyFeatureSpace);
    }
    Ok(matrix)
}

/// Flag the rows the forest isolates most easily. The scaler, vectorizer
/// and forest live only for this call.
pub fn detect<R: AsRef<FeatureRecord>>(rows: &[R], config: &DetectorConfig) -> Vec<bool> {
    if rows.len() < config.min_rows {
        return vec![false; rows.len()];
    }

    let mut matrix = match build_feature_matrix(rows, config.max_tfidf_features) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, "ml detection skipped");
            return vec![false; rows.len()];
        }
    };

    StandardScaler::fit_transform(&mut matrix);
    let forest = IsolationForest::fit(
        &matrix,
        ForestParams {
            n_estimators: config.n_estimators,
            max_samples: config.max_samples,
            contamination: config.contamination,
            seed: config.seed,
        },
    );
    forest.predict_outliers(&matrix)
}
