//! Diagnostics and the per-request log.
//!
//! Diagnostics go through `tracing` to stderr. Request outcomes are written
//! to a dedicated line-oriented file in the layout the extractor understands:
//!
//! ```text
//! [2024-05-01 12:00:00,123] host/INFO/train_load: SUCCESS: GET /api/v1/priceservice/prices 12.417ms 512 bytes
//! [2024-05-01 12:00:00,456] host/ERROR/train_load: FAILURE: GET /api/v1/seatservice/welcome 3.002ms 503 Service Unavailable
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use chrono::{DateTime, Local};
use tracing_subscriber::EnvFilter;

use crate::catalog::HttpMethod;
use crate::error::{HarnessError, Result};

/// Logger name written into every request log line
pub const REQUEST_LOGGER: &str = "train_load";

/// Initialize tracing for console diagnostics.
///
/// `RUST_LOG` wins over `default_level` when set.
pub fn init_tracing(default_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_err()
    {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }
}

/// Result of one request, as seen by the harness
#[derive(Debug, Clone)]
pub struct RequestOutcome<'a> {
    pub method: HttpMethod,
    pub path: &'a str,
    pub response_time_ms: f64,
    /// Response size in bytes, or the failure description
    pub result: std::result::Result<usize, String>,
}

impl RequestOutcome<'_> {
    fn level(&self) -> &'static str {
        if self.result.is_ok() {
            "INFO"
        } else {
            "ERROR"
        }
    }

    fn message(&self) -> String {
        match &self.result {
            Ok(size) => format!(
                "SUCCESS: {} {} {:.3}ms {} bytes",
                self.method, self.path, self.response_time_ms, size
            ),
            Err(error) => format!(
                "FAILURE: {} {} {:.3}ms {}",
                self.method, self.path, self.response_time_ms, error
            ),
        }
    }
}

/// Format one log line: `[timestamp] hostname/LEVEL/logger: message`
pub fn format_line(
    timestamp: DateTime<Local>,
    hostname: &str,
    level: &str,
    logger: &str,
    message: &str,
) -> String {
    format!(
        "[{}] {}/{}/{}: {}",
        timestamp.format("%Y-%m-%d %H:%M:%S,%3f"),
        hostname,
        level,
        logger,
        message
    )
}

static REQUEST_LOG: OnceLock<RequestLog> = OnceLock::new();

/// Append-only request log shared by every virtual user
pub struct RequestLog {
    writer: Mutex<BufWriter<File>>,
    hostname: String,
    path: PathBuf,
}

impl RequestLog {
    /// Create (or truncate) the log file, creating parent directories.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = File::create(&path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            hostname: gethostname::gethostname().to_string_lossy().into_owned(),
            path,
        })
    }

    /// Make this log the process-wide request log.
    pub fn install(self) -> Result<&'static RequestLog> {
        REQUEST_LOG
            .set(self)
            .map_err(|_| HarnessError::LogAlreadyInitialized)?;
        REQUEST_LOG.get().ok_or(HarnessError::LogAlreadyInitialized)
    }

    /// The installed request log, if any
    pub fn global() -> Option<&'static RequestLog> {
        REQUEST_LOG.get()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a SUCCESS or FAILURE line for a completed request
    pub fn record(&self, outcome: &RequestOutcome<'_>) {
        self.write_line(outcome.level(), &outcome.message());
    }

    /// Write a free-form INFO line
    pub fn note(&self, message: &str) {
        self.write_line("INFO", message);
    }

    /// Write the run total and flush, then hand back the run's outcome.
    ///
    /// Buffered lines reach the file even when the run itself failed; in
    /// that case the run's error wins over a flush error.
    pub fn finish_run<T>(&self, total: u64, outcome: Result<T>) -> Result<T> {
        self.note(&format!("Total requests: {total}"));
        let flushed = self.flush();
        let value = outcome?;
        flushed?;
        Ok(value)
    }

    pub fn flush(&self) -> Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writer.flush()?;
        Ok(())
    }

    fn write_line(&self, level: &str, message: &str) {
        let line = format_line(Local::now(), &self.hostname, level, REQUEST_LOGGER, message);
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = writeln!(writer, "{line}") {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write request log");
        }
    }
}

/// Record an outcome in the installed request log and in diagnostics
pub fn record_outcome(outcome: &RequestOutcome<'_>) {
    match &outcome.result {
        Ok(size) => tracing::debug!(
            method = %outcome.method,
            path = outcome.path,
            ms = outcome.response_time_ms,
            size,
            "request succeeded"
        ),
        Err(error) => tracing::debug!(
            method = %outcome.method,
            path = outcome.path,
            ms = outcome.response_time_ms,
            error = error.as_str(),
            "request failed"
        ),
    }
    if let Some(log) = RequestLog::global() {
        log.record(outcome);
    }
}

/// Write a note to the installed request log and to diagnostics
pub fn note(message: &str) {
    tracing::debug!("{message}");
    if let Some(log) = RequestLog::global() {
        log.note(message);
    }
}
