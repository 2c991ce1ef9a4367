//! # costline-core
//!
//! Shared plumbing for the costline status line.
//!
//! This crate provides:
//! - [`CostlineError`] - Error types shared across costline crates
//! - [`logging`] - Tracing setup with a JSON log file
//! - [`config`] - YAML configuration and time zone resolution
//! - [`fsutil`] - Atomic JSON writes and scoped advisory locks
//!
//! ## Example
//!
//! ```no_run
//! use costline_core::{Config, logging};
//!
//! fn main() -> costline_core::Result<()> {
//!     let _guard = logging::init_logging(None, false)?;
//!     let config = Config::load(None)?;
//!     let zone = config.zone(None)?;
//!     tracing::info!(%zone, today = %zone.today(), "resolved zone");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod fsutil;
pub mod logging;

// Re-export main types for convenience
pub use config::{Config, Zone};
pub use error::{CostlineError, Result};
pub use fsutil::{FileLock, read_json_or_default, write_json_atomic};
pub use logging::{LogGuard, init_logging};
