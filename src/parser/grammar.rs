//! The fixed set of line grammars and their capture-group extraction.

use crate::record::{LogRecord, LogType, UNKNOWN};
use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::warn;

// `YYYY-MM-DD HH:MM:SS LEVEL [source] message`
static GENERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2}\s\d{2}:\d{2}:\d{2})\s+(\w+)\s+\[([^\]]+)\]\s+(.*)$")
        .expect("valid regex literal")
});

// Common/combined log format. Anchored at the start only: the combined
// format's trailing `"referer" "agent"` pair is accepted and ignored.
static APACHE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^(\S+) (\S+) (\S+) \[([^:]+):(\d+:\d+:\d+) ([^\]]+)\] "(\S+) (.*?) (\S+)" (\d+) (\S+)"#,
    )
    .expect("valid regex literal")
});

// `YYYY-MM-DD HH:MM:SS LEVEL Source message`
static WINDOWS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2}\s\d{2}:\d{2}:\d{2})\s+(\w+)\s+(\w+)\s+(.*)$")
        .expect("valid regex literal")
});

// syslog-style sshd line: `Mon dd HH:MM:SS host sshd[pid]: message`
static SSH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\w{3}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2}).*sshd\[\d+\]:\s+(.*)$")
        .expect("valid regex literal")
});

static SSH_USER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"user (\S+)").expect("valid regex literal"));

static SSH_FROM_IP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"from (\d+\.\d+\.\d+\.\d+)").expect("valid regex literal")
});

/// A known log grammar. Detection tries them in [`Grammar::PRIORITY`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    Generic,
    Apache,
    Windows,
    Ssh,
}

impl Grammar {
    pub const PRIORITY: [Grammar; 4] = [
        Grammar::Generic,
        Grammar::Apache,
        Grammar::Windows,
        Grammar::Ssh,
    ];

    pub fn log_type(self) -> LogType {
        match self {
            Grammar::Generic => LogType::Generic,
            Grammar::Apache => LogType::Apache,
            Grammar::Windows => LogType::Windows,
            Grammar::Ssh => LogType::Ssh,
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            Grammar::Generic => &GENERIC,
            Grammar::Apache => &APACHE,
            Grammar::Windows => &WINDOWS,
            Grammar::Ssh => &SSH,
        }
    }

    pub fn matches(self, line: &str) -> bool {
        self.pattern().is_match(line)
    }

    /// Map this grammar's capture groups onto a record.
    /// Returns `None` when the line does not match.
    pub fn extract(self, line: &str) -> Option<LogRecord> {
        let caps = self.pattern().captures(line)?;
        Some(match self {
            Grammar::Generic | Grammar::Windows => extract_leveled(self.log_type(), &caps),
            Grammar::Apache => extract_apache(&caps),
            Grammar::Ssh => extract_ssh(&caps),
        })
    }
}

fn group<'a>(caps: &'a Captures<'_>, i: usize) -> &'a str {
    caps.get(i).map_or("", |m| m.as_str())
}

fn extract_leveled(log_type: LogType, caps: &Captures<'_>) -> LogRecord {
    let mut rec = LogRecord::new(log_type, group(caps, 4));
    rec.timestamp = Some(group(caps, 1).to_string());
    rec.severity = group(caps, 2).to_string();
    rec.source = group(caps, 3).to_string();
    rec
}

fn extract_apache(caps: &Captures<'_>) -> LogRecord {
    let (ip, date, time) = (group(caps, 1), group(caps, 4), group(caps, 5));
    let (method, path, protocol, status) =
        (group(caps, 7), group(caps, 8), group(caps, 9), group(caps, 10));

    let mut rec = LogRecord::new(
        LogType::Apache,
        format!("{method} {path} {protocol} {status}"),
    );
    rec.timestamp = Some(format!("{date} {time}"));
    rec.source = ip.to_string();
    rec.status_code = Some(status.to_string());
    rec.request_path = Some(path.to_string());
    rec
}

fn extract_ssh(caps: &Captures<'_>) -> LogRecord {
    let message = group(caps, 2);
    let failed = message.contains("Failed password") || message.contains("Invalid user");

    let username = SSH_USER
        .captures(message)
        .and_then(|c| c.get(1))
        .map_or(UNKNOWN, |m| m.as_str());
    let source = SSH_FROM_IP
        .captures(message)
        .and_then(|c| c.get(1))
        .map_or(UNKNOWN, |m| m.as_str());

    let mut rec = LogRecord::new(LogType::Ssh, message);
    rec.timestamp = Some(group(caps, 1).to_string());
    rec.severity = if failed { "WARNING" } else { "INFO" }.to_string();
    rec.source = source.to_string();
    rec.username = Some(username.to_string());
    rec.failed_attempt = Some(failed);
    rec
}

/// First grammar (in priority order) matching the trimmed line.
pub fn detect_grammar(line: &str) -> Option<Grammar> {
    let trimmed = line.trim();
    Grammar::PRIORITY.into_iter().find(|g| g.matches(trimmed))
}

/// Classify a raw line. Total: a line no grammar matches is `Unknown`.
pub fn detect_log_type(line: &str) -> LogType {
    detect_grammar(line).map_or(LogType::Unknown, Grammar::log_type)
}

/// Parse one physical line into exactly one record.
pub fn parse_line(line: &str) -> LogRecord {
    let trimmed = line.trim();
    let Some(grammar) = detect_grammar(trimmed) else {
        return LogRecord::unknown(trimmed);
    };

    grammar.extract(trimmed).unwrap_or_else(|| {
        warn!(
            log_type = %grammar.log_type(),
            "line detected but not extractable, keeping as unknown"
        );
        LogRecord::unknown(trimmed)
    })
}
