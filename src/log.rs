//! Simple file-based logging for dppctl
//!
//! Appends JSONL records to <runtime_dir>/dppctl.log so daemon exchanges
//! can be traced after the fact without polluting command stdout.

use crate::config::Config;
use chrono::Utc;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;

/// Log entry structure for safe JSON serialization
#[derive(Serialize)]
struct LogEntry<'a> {
    ts: String,
    level: String,
    subsystem: &'a str,
    event: &'a str,
    pid: u32,
    msg: &'a str,
}

/// Log a message to the dppctl log file.
///
/// No-op when Config has not been initialized (library-level unit tests);
/// logging never fails the caller.
pub fn log(level: &str, subsystem: &str, event: &str, message: &str) {
    let Some(config) = Config::try_get() else {
        return;
    };
    let path = config.runtime_dir.join(crate::paths::LOG_FILE_NAME);

    let entry = LogEntry {
        ts: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        level: level.to_uppercase(),
        subsystem,
        event,
        pid: std::process::id(),
        msg: message,
    };

    let log_line = match serde_json::to_string(&entry) {
        Ok(line) => line,
        Err(_) => return, // Silently fail on serialization error
    };

    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&path) {
        let _ = writeln!(file, "{}", log_line);
    }
}

/// Log info message
pub fn log_info(subsystem: &str, event: &str, message: &str) {
    log("info", subsystem, event, message);
}

/// Log warning message
pub fn log_warn(subsystem: &str, event: &str, message: &str) {
    log("warn", subsystem, event, message);
}

/// Log error message
pub fn log_error(subsystem: &str, event: &str, message: &str) {
    log("error", subsystem, event, message);
}
