//! Log parsing: raw lines (or index documents) to records, plus the
//! feature and ML-projection stages that follow.

pub mod documents;
pub mod features;
pub mod grammar;
pub mod preprocess;

pub use documents::records_from_documents;
pub use features::{extract_features, FeatureExtractor};
pub use grammar::{detect_log_type, parse_line};
pub use preprocess::{preprocess_for_ml, MlFrame};

use crate::record::{LogRecord, LogType};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read log file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Parse in-memory lines, one record per line.
pub fn parse_lines<'a, I>(lines: I) -> Vec<LogRecord>
where
    I: IntoIterator<Item = &'a str>,
{
    let records: Vec<LogRecord> = lines.into_iter().map(parse_line).collect();

    let mut by_type: BTreeMap<LogType, usize> = BTreeMap::new();
    for rec in &records {
        *by_type.entry(rec.log_type).or_default() += 1;
    }
    debug!(?by_type, "parsed lines");

    records
}

/// Read a log file and parse every physical line. Multi-line entries are
/// not reassembled. Invalid UTF-8 is replaced rather than rejected.
pub fn parse_log_file(path: &Path) -> Result<Vec<LogRecord>, ParseError> {
    let bytes = std::fs::read(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);
    let records = parse_lines(text.lines());
    info!(path = %path.display(), records = records.len(), "parsed log file");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_one_record_per_line() {
        let text = "2024-03-01 10:15:00 ERROR [auth] Login failed\n\
                    garbage\n\
                    \n\
                    Mar  1 10:15:00 host sshd[1]: Accepted password for user bob from 1.1.1.1\n";
        let records = parse_lines(text.lines());
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].log_type, LogType::Generic);
        assert_eq!(records[1].log_type, LogType::Unknown);
        assert_eq!(records[2].log_type, LogType::Unknown);
        assert_eq!(records[2].message, "");
        assert_eq!(records[3].log_type, LogType::Ssh);
    }

    #[test]
    fn test_parse_log_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "2024-03-01 10:15:00 INFO [web] started").unwrap();
        writeln!(file, "2024-03-01 10:16:00 WARN Kernel thermal event").unwrap();
        write!(file, "trailing line without newline").unwrap();

        let records = parse_log_file(file.path()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].log_type, LogType::Windows);
        assert_eq!(records[2].message, "trailing line without newline");
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = parse_log_file(Path::new("/definitely/not/here.log")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.log"));
    }
}
