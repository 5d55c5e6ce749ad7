//! logsentinel -- security log analysis.
//!
//! Parses heterogeneous log text (or search-index documents) into a record
//! table, runs time, ML, frequency and source anomaly detectors over it,
//! fuses their signals into a score, and reports the results.

pub mod config;
pub mod detect;
pub mod index;
pub mod nlp;
pub mod parser;
pub mod pipeline;
pub mod record;
pub mod report;
pub mod system;

pub use config::AnalyzerConfig;
pub use pipeline::{analyze_files, analyze_records, Analysis, PipelineError};
