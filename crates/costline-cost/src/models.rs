//! Data models for cost tracking.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token counts of one request, split by billing category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCounts {
    /// Number of input tokens
    pub input: u64,

    /// Number of output tokens
    pub output: u64,

    /// Cache read input tokens
    pub cache_read: u64,

    /// Cache creation input tokens
    pub cache_write: u64,
}

impl TokenCounts {
    /// Create counts from the four categories.
    pub fn new(input: u64, output: u64, cache_read: u64, cache_write: u64) -> Self {
        Self {
            input,
            output,
            cache_read,
            cache_write,
        }
    }

    /// Raise each category to the larger of `self` and `other`.
    ///
    /// Streamed responses report cumulative counts, so the maximum per
    /// category is the request's real usage.
    pub fn merge_max(&mut self, other: &TokenCounts) {
        self.input = self.input.max(other.input);
        self.output = self.output.max(other.output);
        self.cache_read = self.cache_read.max(other.cache_read);
        self.cache_write = self.cache_write.max(other.cache_write);
    }

    /// Total tokens (input + output + cache).
    pub fn total(&self) -> u64 {
        self.input + self.output + self.cache_read + self.cache_write
    }
}

/// One usage record read from a host usage log.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageEvent {
    /// Timestamp of the record
    pub timestamp: DateTime<Utc>,

    /// Unique record identifier, the deduplication key
    pub event_id: Option<String>,

    /// API request identifier; repeated while a response streams
    pub request_id: Option<String>,

    /// Side-channel (sub-agent / diagnostic) entry
    pub is_sidechain: bool,

    /// API error entry
    pub is_error: bool,

    /// Model identifier (e.g., "claude-opus-4-5-20251101")
    pub model: Option<String>,

    /// Token usage reported by this record
    pub tokens: TokenCounts,
}

impl UsageEvent {
    /// Create an event with required fields; flags default to false.
    pub fn new(timestamp: DateTime<Utc>, model: impl Into<String>, tokens: TokenCounts) -> Self {
        Self {
            timestamp,
            event_id: None,
            request_id: None,
            is_sidechain: false,
            is_error: false,
            model: Some(model.into()),
            tokens,
        }
    }

    /// Set the unique event id.
    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    /// Set the request id.
    pub fn with_request(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Whether this record counts towards cost at all.
    pub fn is_billable(&self) -> bool {
        !self.is_sidechain && !self.is_error
    }
}

/// Per-date session cost contributions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyCostRecord {
    /// Session id -> that session's cost accrued on this date
    #[serde(default)]
    pub sessions: BTreeMap<String, f64>,

    /// Session id -> the session's cumulative cost when first seen this date
    #[serde(default)]
    pub baselines: BTreeMap<String, f64>,

    /// Sum of `sessions`
    #[serde(default)]
    pub total: f64,
}

impl DailyCostRecord {
    /// Record a session's cumulative cost and return its contribution for the date.
    pub fn record(&mut self, session_id: &str, cumulative_cost: f64) -> f64 {
        let cumulative_cost = non_negative(cumulative_cost);
        let baseline = *self
            .baselines
            .entry(session_id.to_string())
            .or_insert(cumulative_cost);

        let contribution = (cumulative_cost - baseline).max(0.0);
        self.sessions.insert(session_id.to_string(), contribution);
        self.total = self.sessions.values().sum();
        contribution
    }
}

/// Rolling cost totals in USD.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rollup {
    /// Today, computed fresh from usage logs
    pub day: f64,

    /// Today plus every earlier day since Monday
    pub week: f64,

    /// Today plus every earlier day since the 1st
    pub month: f64,

    /// Today plus every archived day of the current year
    pub year: f64,
}

/// Clamp NaN and negative amounts to zero.
pub(crate) fn non_negative(amount: f64) -> f64 {
    if amount.is_finite() && amount > 0.0 {
        amount
    } else {
        0.0
    }
}
