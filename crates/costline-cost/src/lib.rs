//! # costline-cost
//!
//! Cost aggregation and context tracking for the costline status line.
//!
//! This crate provides:
//! - [`rate_for`] - Per-model price table
//! - [`UsageLogReader`] - Per-day cost from host usage logs
//! - [`ContextTracker`] - Live context estimate from cumulative token counters
//! - [`Ledger`] - Locked JSON store of today's sessions and the day archive
//! - [`rollup`] - Day/week/month/year totals
//!
//! ## Example
//!
//! ```no_run
//! use costline_core::Zone;
//! use costline_cost::{Ledger, UsageLogReader, rollup};
//!
//! fn main() -> costline_cost::Result<()> {
//!     let zone = Zone::Local;
//!     let today = zone.today();
//!     let reader = UsageLogReader::new(vec!["/home/me/.claude/projects".into()], zone);
//!
//!     let mut ledger = Ledger::open("/home/me/.costline/state/ledger.json");
//!     ledger.record_session(today, "session-1", 1.25);
//!     let totals = rollup(today, reader.cost_for_date(today), &mut ledger, &reader, false);
//!     ledger.save()?;
//!
//!     println!("week ${:.0}", totals.week);
//!     Ok(())
//! }
//! ```

pub mod aggregator;
pub mod context;
pub mod error;
pub mod ledger;
pub mod models;
pub mod parser;
pub mod pricing;

// Re-export main types
pub use aggregator::{DailyCostSource, rollup};
pub use context::{ContextBand, ContextTracker, ContextUsage};
pub use error::{CostError, Result};
pub use ledger::{Ledger, LedgerData};
pub use models::{DailyCostRecord, Rollup, TokenCounts, UsageEvent};
pub use parser::UsageLogReader;
pub use pricing::{Rates, rate_for};
