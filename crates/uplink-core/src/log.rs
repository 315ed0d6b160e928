//! Append-only connection event log
//!
//! One line per event, `"<timestamp> [LEVEL] message"`. The log is opened
//! exactly once at startup (failure there is fatal) and handed to every
//! component by `Arc` reference; there is no global logger instance.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::error::LogError;

/// Severity of an event log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Info => write!(f, "INFO"),
            Level::Error => write!(f, "ERROR"),
        }
    }
}

/// File-backed event log service
#[derive(Debug)]
pub struct EventLog {
    file: Mutex<File>,
}

impl EventLog {
    /// Open (or create) the log file in append mode.
    ///
    /// Called once at startup; an unopenable path aborts the process before
    /// the connection loop starts.
    pub fn open(path: &Path) -> Result<Self, LogError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| LogError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Append one timestamped line.
    ///
    /// The sink is write-only and best-effort after startup: a failed write
    /// is reported through diagnostics, never propagated to the caller.
    pub fn append(&self, level: Level, message: &str) {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let line = format!("{timestamp} [{level}] {message}\n");

        let mut file = self
            .file
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Err(e) = file.write_all(line.as_bytes()) {
            tracing::warn!("event log write failed: {}", e);
        }
    }
}
