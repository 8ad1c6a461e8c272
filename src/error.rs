//! Error type shared by the harness and the log extractor.

use goose::GooseError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarnessError>;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("load test failed: {0}")]
    Goose(Box<GooseError>),

    #[error("invalid run time '{0}': expected e.g. 90s, 2m, 1h30m")]
    InvalidRunTime(String),

    #[error("request limit must be at least 1")]
    InvalidLimit,

    #[error("request log already initialized")]
    LogAlreadyInitialized,
}

impl From<GooseError> for HarnessError {
    fn from(err: GooseError) -> Self {
        HarnessError::Goose(Box::new(err))
    }
}
