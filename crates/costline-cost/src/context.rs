//! Context window tracking.
//!
//! The host reports cumulative input/output token counters per session, not
//! the size of the live context. Each session keeps a baseline so that
//! `current - baseline` approximates what is actually in the window:
//!
//! - the counter going *down* means the host compacted the context and
//!   restarted counting, so the baseline drops to zero
//! - usage above the window size is impossible, so the context must have
//!   been cleared while the counter kept climbing; the baseline jumps to the
//!   current count
//!
//! State lives in a JSON file keyed by session id. Sessions only touch their
//! own key, so the file is written atomically but without the ledger lock.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use costline_core::{read_json_or_default, write_json_atomic};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Persisted per-session context state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    /// Cumulative token count seen on the last update
    pub last_tokens: u64,

    /// Cumulative count corresponding to an empty context
    pub baseline: u64,

    /// Date of the last update
    pub updated: NaiveDate,
}

/// Remaining-context band used for coloring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextBand {
    /// More than 50% remaining
    Plenty,
    /// 25% to 50% remaining
    Moderate,
    /// 10% up to 25% remaining
    Low,
    /// Under 10% remaining
    Critical,
    /// Window size not reported
    Unknown,
}

impl ContextBand {
    /// Band for a remaining percentage.
    pub fn for_remaining(remaining_percent: u64) -> Self {
        match remaining_percent {
            51.. => ContextBand::Plenty,
            25..=50 => ContextBand::Moderate,
            10..=24 => ContextBand::Low,
            _ => ContextBand::Critical,
        }
    }
}

/// Context usage of one session after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextUsage {
    /// Tokens estimated to be in the live context, within `[0, window_size]`
    pub effective_tokens: u64,

    /// Window size reported by the host, 0 when unknown
    pub window_size: u64,

    /// `effective_tokens * 100 / window_size`, or 100 when the window is unknown
    pub used_percent: u64,
}

impl ContextUsage {
    pub fn remaining_percent(&self) -> u64 {
        100 - self.used_percent
    }

    pub fn band(&self) -> ContextBand {
        if self.window_size == 0 {
            ContextBand::Unknown
        } else {
            ContextBand::for_remaining(self.remaining_percent())
        }
    }
}

/// Apply one observation to a session's previous state.
///
/// Returns the new baseline and the clamped effective token count.
pub fn advance(previous: Option<&ContextEntry>, current: u64, window_size: u64) -> (u64, u64) {
    let (last_tokens, mut baseline) = previous
        .map(|e| (e.last_tokens, e.baseline))
        .unwrap_or((0, 0));

    if last_tokens > 0 && current < last_tokens {
        debug!(last_tokens, current, "context compacted, resetting baseline");
        baseline = 0;
    }

    if window_size > 0 && current.saturating_sub(baseline) > window_size {
        debug!(current, baseline, window_size, "context cleared, rebaselining");
        baseline = current;
    }

    let mut effective = current.saturating_sub(baseline);
    if window_size > 0 {
        effective = effective.min(window_size);
    }

    (baseline, effective)
}

/// Per-session context state backed by a JSON file.
#[derive(Debug)]
pub struct ContextTracker {
    path: PathBuf,
    entries: BTreeMap<String, ContextEntry>,
}

impl ContextTracker {
    /// Load state, dropping entries not updated within `retention_days` of `today`.
    ///
    /// Missing or corrupt files start empty.
    pub fn load(path: impl Into<PathBuf>, today: NaiveDate, retention_days: u32) -> Self {
        let path = path.into();
        let mut entries: BTreeMap<String, ContextEntry> = read_json_or_default(&path);

        let before = entries.len();
        entries.retain(|_, entry| (today - entry.updated).num_days() <= i64::from(retention_days));
        if entries.len() != before {
            debug!(purged = before - entries.len(), "purged stale context entries");
        }

        Self { path, entries }
    }

    /// Record the session's cumulative counters and return its context usage.
    pub fn update(
        &mut self,
        session_id: &str,
        cumulative_input: u64,
        cumulative_output: u64,
        window_size: u64,
        today: NaiveDate,
    ) -> ContextUsage {
        let current = cumulative_input.saturating_add(cumulative_output);
        let (baseline, effective_tokens) = advance(self.entries.get(session_id), current, window_size);

        self.entries.insert(
            session_id.to_string(),
            ContextEntry {
                last_tokens: current,
                baseline,
                updated: today,
            },
        );

        let used_percent = if window_size == 0 {
            100
        } else {
            effective_tokens * 100 / window_size
        };

        ContextUsage {
            effective_tokens,
            window_size,
            used_percent,
        }
    }

    /// Stored state of a session.
    pub fn entry(&self, session_id: &str) -> Option<&ContextEntry> {
        self.entries.get(session_id)
    }

    /// Number of tracked sessions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically persist the state file.
    pub fn save(&self) -> Result<()> {
        write_json_atomic(&self.path, &self.entries)?;
        Ok(())
    }
}
