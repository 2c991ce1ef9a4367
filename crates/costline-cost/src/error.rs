//! Error types for the cost tracking module.

use thiserror::Error;

/// Cost tracking errors.
#[derive(Error, Debug)]
pub enum CostError {
    /// Shared-layer error (state files, locks, configuration)
    #[error(transparent)]
    Core(#[from] costline_core::CostlineError),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (file reading)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid log line format
    #[error("invalid log line format: {0}")]
    InvalidLogFormat(String),
}

impl CostError {
    /// Check if this error only affects a single log line or file.
    ///
    /// Such errors are skipped during scans instead of aborting the day.
    pub fn is_skippable(&self) -> bool {
        matches!(self, CostError::Json(_) | CostError::InvalidLogFormat(_))
    }
}

/// Result type for cost tracking operations.
pub type Result<T> = std::result::Result<T, CostError>;
