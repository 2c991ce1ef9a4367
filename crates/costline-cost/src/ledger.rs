//! Cost ledger.
//!
//! One JSON file holds today's per-session records (`days`) and the archive
//! of finalized past-day costs (`history`). The whole read-modify-write
//! happens under an exclusive advisory lock on `<ledger>.lock`, held for as
//! long as the [`Ledger`] value lives.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use costline_core::{FileLock, read_json_or_default, write_json_atomic};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::models::{DailyCostRecord, non_negative};

/// On-disk ledger contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerData {
    #[serde(default)]
    pub days: BTreeMap<NaiveDate, DailyCostRecord>,

    /// Finalized cost of past dates; entries are never rewritten
    #[serde(default)]
    pub history: BTreeMap<NaiveDate, f64>,
}

/// An open, locked ledger.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    data: LedgerData,
    // released on drop
    lock: Option<FileLock>,
}

impl Ledger {
    /// Lock and load the ledger at `path`.
    ///
    /// A missing or corrupt file yields an empty ledger.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock = FileLock::acquire(&lock_path(&path));
        let data = read_json_or_default(&path);
        Self {
            path,
            data,
            lock,
        }
    }

    /// Record a session's cumulative cost for `today`; returns its contribution.
    ///
    /// Records of earlier days are dropped, so `days` only ever holds today.
    pub fn record_session(&mut self, today: NaiveDate, session_id: &str, cumulative_cost: f64) -> f64 {
        let before = self.data.days.len();
        self.data.days.retain(|date, _| *date >= today);
        if self.data.days.len() < before {
            debug!(%today, dropped = before - self.data.days.len(), "pruned stale day records");
        }
        self.data
            .days
            .entry(today)
            .or_default()
            .record(session_id, cumulative_cost)
    }

    /// Archive a finalized cost for `date`.
    ///
    /// Only dates strictly before `today` are archived, and an existing entry
    /// is never replaced. Returns whether an entry was written.
    pub fn archive(&mut self, date: NaiveDate, cost: f64, today: NaiveDate) -> bool {
        if date >= today || self.data.history.contains_key(&date) {
            return false;
        }
        debug!(%date, cost, "archiving day");
        self.data.history.insert(date, non_negative(cost));
        true
    }

    /// Archived cost of a date.
    pub fn archived(&self, date: NaiveDate) -> Option<f64> {
        self.data.history.get(&date).copied()
    }

    pub fn history(&self) -> &BTreeMap<NaiveDate, f64> {
        &self.data.history
    }

    /// Per-session record of a date.
    pub fn day(&self, date: NaiveDate) -> Option<&DailyCostRecord> {
        self.data.days.get(&date)
    }

    pub fn data(&self) -> &LedgerData {
        &self.data
    }

    /// Whether the advisory lock is held.
    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically persist the ledger. The lock stays held.
    pub fn save(&self) -> Result<()> {
        write_json_atomic(&self.path, &self.data)?;
        debug!(
            path = %self.path.display(),
            days = self.data.days.len(),
            history = self.data.history.len(),
            "ledger saved"
        );
        Ok(())
    }
}

/// Lock file guarding a ledger file.
pub fn lock_path(ledger: &Path) -> PathBuf {
    let mut name = ledger.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".lock");
    ledger.with_file_name(name)
}
