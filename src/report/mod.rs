//! Report rendering: console summary and the HTML report.

use crate::nlp::NlpSummary;
use crate::pipeline::Analysis;
use crate::record::AnnotatedRecord;
use askama::Template;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Severity levels in display order; anything else follows alphabetically.
pub const SEVERITY_ORDER: [&str; 8] = [
    "EMERGENCY",
    "ALERT",
    "CRITICAL",
    "ERROR",
    "WARNING",
    "NOTICE",
    "INFO",
    "DEBUG",
];

const TOP_SOURCES: usize = 10;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to render report: {0}")]
    Render(#[from] askama::Error),

    #[error("failed to write report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct Stat {
    pub label: &'static str,
    pub value: String,
}

/// One row of a CSS bar chart. `width` is a percentage of the largest bar.
pub struct Bar {
    pub label: String,
    pub count: usize,
    pub width: String,
}

pub struct AnomalyRow {
    pub timestamp: String,
    pub source: String,
    pub severity: String,
    pub message: String,
    pub score: String,
}

#[derive(Template)]
#[template(path = "report.html")]
pub struct ReportTemplate {
    pub generated_at: String,
    pub analysis_id: String,
    pub stats: Vec<Stat>,
    pub hourly: Vec<Bar>,
    pub severities: Vec<Bar>,
    pub anomaly_types: Vec<Bar>,
    pub terms: Vec<Bar>,
    pub sources: Vec<Bar>,
    pub anomalies: Vec<AnomalyRow>,
}

fn bars<I: IntoIterator<Item = (String, usize)>>(items: I) -> Vec<Bar> {
    let items: Vec<(String, usize)> = items.into_iter().collect();
    let max = items.iter().map(|(_, c)| *c).max().unwrap_or(0).max(1);
    items
        .into_iter()
        .map(|(label, count)| Bar {
            width: format!("{:.1}", 100.0 * count as f64 / max as f64),
            label,
            count,
        })
        .collect()
}

fn severity_rank(severity: &str) -> usize {
    SEVERITY_ORDER
        .iter()
        .position(|s| *s == severity)
        .unwrap_or(SEVERITY_ORDER.len())
}

/// The `n` highest-scoring anomalies; ties keep table order.
pub fn top_anomalies(rows: &[AnnotatedRecord], n: usize) -> Vec<&AnnotatedRecord> {
    let mut anomalies: Vec<&AnnotatedRecord> = rows.iter().filter(|r| r.is_anomaly).collect();
    anomalies.sort_by(|a, b| b.anomaly_score.total_cmp(&a.anomaly_score));
    anomalies.truncate(n);
    anomalies
}

impl ReportTemplate {
    pub fn build(analysis: &Analysis, top_n: usize) -> Self {
        let rows = &analysis.records;
        let summary = &analysis.summary;

        let stats = vec![
            Stat {
                label: "Total Logs",
                value: summary.total_logs.to_string(),
            },
            Stat {
                label: "Anomalies",
                value: format!(
                    "{} ({:.1}%)",
                    summary.anomaly_count, summary.anomaly_percentage
                ),
            },
            Stat {
                label: "High Importance Events",
                value: summary.high_importance_count.to_string(),
            },
            Stat {
                label: "Security-Related Events",
                value: format!(
                    "{} ({:.1}%)",
                    summary.security_event_count,
                    summary.security_event_percentage()
                ),
            },
        ];

        let mut hourly = [0usize; 24];
        let mut timed = false;
        for hour in rows.iter().filter_map(|r| r.features.hour) {
            hourly[hour as usize % 24] += 1;
            timed = true;
        }
        let hourly = if timed {
            bars((0..24).map(|h| (format!("{h:02}:00"), hourly[h])))
        } else {
            Vec::new()
        };

        let mut severities: Vec<(String, usize)> = summary
            .severity_distribution
            .iter()
            .map(|(s, c)| (s.clone(), *c))
            .collect();
        severities.sort_by(|a, b| {
            severity_rank(&a.0)
                .cmp(&severity_rank(&b.0))
                .then_with(|| a.0.cmp(&b.0))
        });

        let flagged = |f: fn(&AnnotatedRecord) -> Option<bool>| {
            rows.iter().filter(|r| f(r) == Some(true)).count()
        };
        let anomaly_types = bars([
            ("Time".to_string(), flagged(|r| r.anomalies.time_anomaly)),
            ("ML".to_string(), flagged(|r| r.anomalies.ml_anomaly)),
            ("Frequency".to_string(), flagged(|r| r.anomalies.frequency_anomaly)),
            ("Source".to_string(), flagged(|r| r.anomalies.source_anomaly)),
        ]);

        let terms = bars(
            summary
                .top_security_terms
                .iter()
                .map(|t| (t.term.clone(), t.count)),
        );

        let mut by_source: HashMap<&str, usize> = HashMap::new();
        for row in rows {
            *by_source.entry(row.record().source.as_str()).or_default() += 1;
        }
        let mut sources: Vec<(String, usize)> = by_source
            .into_iter()
            .map(|(s, c)| (s.to_string(), c))
            .collect();
        sources.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        sources.truncate(TOP_SOURCES);

        let anomalies = top_anomalies(rows, top_n)
            .into_iter()
            .map(|r| {
                let rec = r.record();
                AnomalyRow {
                    timestamp: rec.timestamp.clone().unwrap_or_else(|| "N/A".to_string()),
                    source: rec.source.clone(),
                    severity: rec.severity.clone(),
                    message: rec.message.clone(),
                    score: format!("{:.2}", r.anomaly_score),
                }
            })
            .collect();

        Self {
            generated_at: analysis.generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            analysis_id: analysis.analysis_id.to_string(),
            stats,
            hourly,
            severities: bars(severities),
            anomaly_types,
            terms,
            sources: bars(sources),
            anomalies,
        }
    }
}

pub fn render_html(analysis: &Analysis, top_n: usize) -> Result<String, ReportError> {
    Ok(ReportTemplate::build(analysis, top_n).render()?)
}

/// `security_report_<YYYYmmdd_HHMMSS>.html` for the run's generation time.
pub fn report_filename(analysis: &Analysis) -> String {
    format!(
        "security_report_{}.html",
        analysis.generated_at.format("%Y%m%d_%H%M%S")
    )
}

/// Render the HTML report into `output_dir` (created if missing).
pub fn write_report(
    analysis: &Analysis,
    output_dir: &Path,
    top_n: usize,
) -> Result<PathBuf, ReportError> {
    let html = render_html(analysis, top_n)?;
    std::fs::create_dir_all(output_dir).map_err(|source| ReportError::Io {
        path: output_dir.to_path_buf(),
        source,
    })?;
    let path = output_dir.join(report_filename(analysis));
    std::fs::write(&path, html).map_err(|source| ReportError::Io {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), "report written");
    Ok(path)
}

/// Plain-text run summary for the terminal.
pub fn console_summary(summary: &NlpSummary, report: Option<&Path>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Analysis Summary ===");
    let _ = writeln!(out, "Total log entries: {}", summary.total_logs);
    let _ = writeln!(
        out,
        "Detected anomalies: {} ({:.2}%)",
        summary.anomaly_count, summary.anomaly_percentage
    );
    let _ = writeln!(
        out,
        "Security-related events: {} ({:.2}%)",
        summary.security_event_count,
        summary.security_event_percentage()
    );
    if let Some(path) = report {
        let _ = writeln!(out, "Report saved to: {}", path.display());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nlp::NlpAnalyzer;
    use crate::parser::{extract_features, parse_lines};

    fn analysis(lines: &[&str], anomalous: &[(usize, f64)]) -> Analysis {
        let mut rows: Vec<AnnotatedRecord> = extract_features(parse_lines(lines.iter().copied()))
            .into_iter()
            .map(AnnotatedRecord::from)
            .collect();
        for &(i, score) in anomalous {
            rows[i].anomaly_score = score;
            rows[i].is_anomaly = true;
        }
        let (records, summary) = NlpAnalyzer::default().analyze(rows);
        Analysis {
            analysis_id: uuid::Uuid::new_v4(),
            generated_at: chrono::Local::now(),
            records,
            summary,
        }
    }

    const LINES: [&str; 4] = [
        "2024-03-04 10:00:00 ERROR [db] <script>alert(1)</script> denied",
        "2024-03-04 10:05:00 INFO [web] request completed",
        "2024-03-04 11:00:00 CUSTOM [web] vendor level",
        "2024-03-04 12:00:00 WARNING [fw] blocked scan",
    ];

    #[test]
    fn test_top_anomalies_sorted_and_limited() {
        let a = analysis(&LINES, &[(1, 2.0), (3, 3.5), (0, 2.0)]);
        let top = top_anomalies(&a.records, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].anomaly_score, 3.5);
        // tie keeps table order
        assert_eq!(top[1].record().source, "db");
    }

    #[test]
    fn test_severity_order() {
        let a = analysis(&LINES, &[]);
        let t = ReportTemplate::build(&a, 10);
        let labels: Vec<&str> = t.severities.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["ERROR", "WARNING", "INFO", "CUSTOM"]);
    }

    #[test]
    fn test_html_is_escaped() {
        let a = analysis(&LINES, &[(0, 2.5)]);
        let html = render_html(&a, 10).unwrap();
        assert!(html.contains("Security Log Analysis Report"));
        assert!(html.contains("Top Detected Anomalies"));
        assert!(html.contains("2.50"));
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains(&a.analysis_id.to_string()));
    }

    #[test]
    fn test_no_anomaly_table_without_anomalies() {
        let a = analysis(&LINES, &[]);
        let html = render_html(&a, 10).unwrap();
        assert!(!html.contains("Top Detected Anomalies"));
    }

    #[test]
    fn test_write_report_creates_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("reports");
        let a = analysis(&LINES, &[]);
        let path = write_report(&a, &out, 10).unwrap();
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("security_report_"));
        assert!(name.ends_with(".html"));
    }

    #[test]
    fn test_console_summary() {
        let a = analysis(&LINES, &[(0, 2.0)]);
        let text = console_summary(&a.summary, Some(Path::new("/tmp/r.html")));
        assert!(text.contains("Total log entries: 4"));
        assert!(text.contains("Detected anomalies: 1 (25.00%)"));
        assert!(text.contains("Report saved to: /tmp/r.html"));
    }
}
