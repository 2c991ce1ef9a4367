//! Logging infrastructure for costline.
//!
//! Standard output belongs to the status line, so diagnostics go to a JSON
//! lines file under `~/.costline/logs/`. A human-readable stderr layer is
//! added only in verbose mode.
//!
//! ## Example
//!
//! ```no_run
//! use costline_core::logging;
//!
//! let _guard = logging::init_logging(None, false).expect("logging init");
//! tracing::debug!(session_id = "s1", "recording session cost");
//! ```

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{CostlineError, Result};

/// Environment variable overriding the log filter.
pub const LOG_FILTER_ENV: &str = "COSTLINE_LOG";

/// Guard that must be held to ensure log flushing on shutdown.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the costline logging system.
///
/// * `log_dir` - Optional custom log directory. Defaults to `~/.costline/logs/`
/// * `verbose` - Raises the level to DEBUG and mirrors logs to stderr.
///
/// The returned [`LogGuard`] must live until the process exits so the
/// non-blocking file writer flushes.
pub fn init_logging(log_dir: Option<PathBuf>, verbose: bool) -> Result<LogGuard> {
    let log_dir = match log_dir {
        Some(dir) => dir,
        None => default_log_dir()?,
    };

    std::fs::create_dir_all(&log_dir).map_err(|e| CostlineError::DirectoryCreation {
        path: log_dir.clone(),
        source: e,
    })?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "costline.log");
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "costline={default_level},costline_core={default_level},costline_cost={default_level}"
        ))
    });

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .json()
        .with_current_span(true);

    // stdout is reserved for the status line
    let console_layer = verbose.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .compact()
            .boxed()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| CostlineError::internal(format!("logging already initialized: {e}")))?;

    tracing::debug!(log_dir = %log_dir.display(), verbose, "logging initialized");

    Ok(LogGuard {
        _file_guard: Some(file_guard),
    })
}

/// Root of all costline-owned files: `~/.costline/`.
pub fn costline_home() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| CostlineError::Internal {
        message: "home directory could not be determined".into(),
    })?;

    Ok(home.join(".costline"))
}

/// Get the default log directory path.
///
/// Returns `~/.costline/logs/`
pub fn default_log_dir() -> Result<PathBuf> {
    Ok(costline_home()?.join("logs"))
}
