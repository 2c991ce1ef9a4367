//! Error types for costline operations.
//!
//! [`CostlineError`] covers the failures the shared layer can report. Most of
//! them are absorbed by callers (state files are caches, not sources of
//! truth), but configuration and input errors are fatal and end the
//! invocation before anything is printed.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`CostlineError`].
pub type Result<T> = std::result::Result<T, CostlineError>;

/// Error type for the shared costline layer.
#[derive(Debug, Error)]
pub enum CostlineError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Configuration file is invalid YAML
    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    /// Time zone name could not be resolved
    #[error("Unknown time zone '{name}'")]
    UnknownTimezone { name: String },

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Generic I/O error with context
    #[error("I/O error {operation}: {path}")]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory creation failed
    #[error("Failed to create directory: {path}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Atomic replace of a state file failed
    #[error("Failed to replace {path}")]
    AtomicWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // =========================================================================
    // Parsing Errors
    // =========================================================================
    /// JSON parsing error
    #[error("JSON parse error in {context}: {message}")]
    JsonParse {
        context: String,
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal error (bug in costline)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CostlineError {
    /// Create an I/O error
    pub fn io(operation: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    /// Create a JSON parse error
    pub fn json_parse(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::JsonParse {
            context: context.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a ConfigInvalid error
    pub fn config_invalid(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns actionable guidance for the user
    pub fn guidance(&self) -> Option<&'static str> {
        match self {
            Self::ConfigInvalid { .. } => Some("Check the YAML syntax of the configuration file"),
            Self::UnknownTimezone { .. } => {
                Some("Use an IANA zone name such as 'UTC' or 'Europe/Berlin'")
            }
            Self::DirectoryCreation { .. } | Self::AtomicWrite { .. } => {
                Some("Check permissions on the costline state directory")
            }
            _ => None,
        }
    }
}
