//! Host platform helpers.

use std::path::PathBuf;

/// Operating system family, as shown to users.
pub fn os_name() -> &'static str {
    match std::env::consts::OS {
        "windows" => "Windows",
        "macos" => "macOS",
        "linux" => "Linux",
        other => other,
    }
}

/// Common log directories for an OS family name as returned by [`os_name`].
pub fn log_directories_for(os: &str) -> Vec<&'static str> {
    match os {
        "Windows" => vec![
            r"C:\Windows\System32\winevt\Logs",
            r"C:\Windows\System32\LogFiles",
            r"C:\inetpub\logs\LogFiles",
        ],
        "macOS" => vec!["/var/log", "/Library/Logs", "~/Library/Logs"],
        _ => vec!["/var/log", "/var/log/audit", "/var/log/apache2", "/var/log/nginx"],
    }
}

/// Common log directories for the current host, `~` expanded from `HOME`.
pub fn log_directories() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    log_directories_for(os_name())
        .into_iter()
        .map(|dir| match (dir.strip_prefix("~/"), &home) {
            (Some(rest), Some(home)) => home.join(rest),
            _ => PathBuf::from(dir),
        })
        .collect()
}
