//! Orchestration: ingest -> features -> detection -> text analysis.

use crate::config::AnalyzerConfig;
use crate::detect::AnomalyDetector;
use crate::index::{IndexClient, IndexError, TimeRange};
use crate::nlp::{NlpAnalyzer, NlpSummary};
use crate::parser::{self, FeatureExtractor, ParseError};
use crate::record::{AnnotatedRecord, LogRecord};
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no log records produced from {origin}")]
    NoRecords { origin: String },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("file ingestion task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result of one run over a complete table.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub analysis_id: Uuid,
    pub generated_at: DateTime<Local>,
    pub records: Vec<AnnotatedRecord>,
    pub summary: NlpSummary,
}

/// What to pull from the search index.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub index_pattern: String,
    pub time_range: Option<TimeRange>,
    pub query: Option<Value>,
    pub size: usize,
}

impl FetchRequest {
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self {
            index_pattern: config.index.index_pattern.clone(),
            time_range: None,
            query: None,
            size: config.index.fetch_size,
        }
    }
}

/// Parse every file on the blocking pool. Tables are concatenated in
/// argument order; the first failure aborts the run.
pub async fn ingest_files(paths: &[PathBuf]) -> Result<Vec<LogRecord>, PipelineError> {
    let tasks = paths.iter().cloned().map(|path| {
        tokio::task::spawn_blocking(move || parser::parse_log_file(&path))
    });
    let results = futures::future::join_all(tasks).await;

    let mut records = Vec::new();
    for result in results {
        records.extend(result??);
    }
    Ok(records)
}

/// Features, detection and text analysis over one complete table.
pub fn analyze_records(
    records: Vec<LogRecord>,
    config: &AnalyzerConfig,
    origin: &str,
) -> Result<Analysis, PipelineError> {
    if records.is_empty() {
        return Err(PipelineError::NoRecords {
            origin: origin.to_string(),
        });
    }

    info!(records = records.len(), origin, "extracting features");
    let features =
        FeatureExtractor::new(config.parser.default_year).extract_features(records);

    info!("detecting anomalies");
    let annotated = AnomalyDetector::new(config.detector.clone()).analyze(features);

    info!("analyzing message text");
    let (records, summary) = NlpAnalyzer::default().analyze(annotated);

    Ok(Analysis {
        analysis_id: Uuid::new_v4(),
        generated_at: Local::now(),
        records,
        summary,
    })
}

pub async fn analyze_files(
    paths: &[PathBuf],
    config: &AnalyzerConfig,
) -> Result<Analysis, PipelineError> {
    let origin = paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    info!(files = paths.len(), "parsing log files");
    let records = ingest_files(paths).await?;
    analyze_records(records, config, &origin)
}

pub async fn analyze_index(
    client: &IndexClient,
    request: &FetchRequest,
    config: &AnalyzerConfig,
) -> Result<Analysis, PipelineError> {
    let docs = client
        .fetch_logs(
            &request.index_pattern,
            request.time_range.as_ref(),
            request.query.as_ref(),
            request.size,
        )
        .await?;
    let records = parser::records_from_documents(&docs);
    let origin = format!("{}/{}", client.base_url(), request.index_pattern);
    analyze_records(records, config, &origin)
}
