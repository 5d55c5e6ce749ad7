//! TOML configuration for logsentinel.
//!
//! Layered model: an explicit `--config` path, then the `LOGSENTINEL_CONFIG`
//! environment variable, then `/etc/logsentinel/logsentinel.toml`, then the
//! compiled-in defaults. Every section may be omitted.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const CONFIG_ENV: &str = "LOGSENTINEL_CONFIG";
pub const SYSTEM_CONFIG_PATH: &str = "/etc/logsentinel/logsentinel.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub parser: ParserConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AnalyzerConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded analyzer configuration");
        Ok(config)
    }

    /// An explicit path must load; without one, fall back through the
    /// environment override, the system location and the defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => Ok(Self::load_or_default()),
        }
    }

    pub fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "LOGSENTINEL_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let system_path = Path::new(SYSTEM_CONFIG_PATH);
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %system_path.display(),
                        error = %e,
                        "system config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Thresholds and model parameters for the anomaly detectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Tables shorter than this get all-false detector columns.
    pub min_rows: usize,
    /// Width of the frequency detector's time windows.
    pub window_minutes: u32,
    /// Expected outlier share for the isolation forest.
    pub contamination: f64,
    pub n_estimators: usize,
    pub max_samples: usize,
    pub seed: u64,
    pub max_tfidf_features: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_rows: 10,
            window_minutes: 5,
            contamination: 0.05,
            n_estimators: 100,
            max_samples: 256,
            seed: 42,
            max_tfidf_features: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Year assumed for syslog timestamps. Current year when unset.
    pub default_year: Option<i32>,
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

/// Elasticsearch-compatible search index connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub hosts: Vec<String>,
    /// Defaults to `ES_USERNAME`, then `elastic`.
    pub username: String,
    /// Defaults to `ES_PASSWORD`, then `changeme`.
    pub password: String,
    pub verify_certs: bool,
    pub timeout_secs: u64,
    /// Index pattern searched by `fetch`.
    pub index_pattern: String,
    /// Index that receives annotated documents on write-back.
    pub results_index: String,
    pub fetch_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["http://localhost:9200".to_string()],
            username: std::env::var("ES_USERNAME").unwrap_or_else(|_| "elastic".to_string()),
            password: std::env::var("ES_PASSWORD").unwrap_or_else(|_| "changeme".to_string()),
            verify_certs: true,
            timeout_secs: 30,
            index_pattern: "filebeat-*".to_string(),
            results_index: "security-analysis".to_string(),
            fetch_size: 10_000,
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub output_dir: PathBuf,
    /// Rows listed in the report's anomaly table.
    pub top_anomalies: usize,
    /// Write the HTML report after each run.
    pub html: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            top_anomalies: 10,
            html: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum tracing level (`trace`, `debug`, `info`, `warn`, `error`).
    /// `RUST_LOG` takes precedence.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
