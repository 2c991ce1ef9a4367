//! Usage log reader.
//!
//! Host usage logs are newline-delimited JSON transcripts, one record
//! per line, spread across per-session files under one or more roots. The
//! reader turns them into per-day cost figures:
//!
//! 1. walk the roots for `*.jsonl` files, skipping files last modified before
//!    the earliest requested day (logs are append-only)
//! 2. parse each line independently; malformed lines are skipped
//! 3. drop side-channel and error records
//! 4. deduplicate by the record's unique id (`uuid`)
//! 5. group by request id, taking the per-category maximum of token counts
//! 6. price each group with [`rate_for`] and sum per day
//!
//! Step 5 matters because a streamed response is logged several times with
//! growing cumulative counts; summing every record would overcount it.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, NaiveDate, Utc};
use costline_core::Zone;
use serde::Deserialize;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::error::{CostError, Result};
use crate::models::{TokenCounts, UsageEvent, non_negative};
use crate::pricing::rate_for;

/// Substring every cost-bearing line contains.
const USAGE_MARKER: &str = "\"usage\"";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecord {
    #[serde(default)]
    uuid: Option<String>,
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    is_sidechain: Option<bool>,
    #[serde(default)]
    is_api_error_message: Option<bool>,
    #[serde(default)]
    message: Option<RawMessage>,
    #[serde(default)]
    usage: Option<RawUsage>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<RawUsage>,
}

#[derive(Debug, Deserialize)]
struct RawUsage {
    #[serde(default)]
    input_tokens: Option<u64>,
    #[serde(default)]
    output_tokens: Option<u64>,
    #[serde(default)]
    cache_creation_input_tokens: Option<u64>,
    #[serde(default)]
    cache_read_input_tokens: Option<u64>,
}

impl RawUsage {
    fn counts(&self) -> TokenCounts {
        TokenCounts::new(
            self.input_tokens.unwrap_or(0),
            self.output_tokens.unwrap_or(0),
            self.cache_read_input_tokens.unwrap_or(0),
            self.cache_creation_input_tokens.unwrap_or(0),
        )
    }
}

/// Reader computing per-day costs from host usage logs.
#[derive(Debug, Clone)]
pub struct UsageLogReader {
    roots: Vec<PathBuf>,
    zone: Zone,
    prefilter: bool,
}

impl UsageLogReader {
    /// Create a reader over the given roots, bucketing days in `zone`.
    pub fn new(roots: Vec<PathBuf>, zone: Zone) -> Self {
        Self {
            roots,
            zone,
            prefilter: true,
        }
    }

    /// Enable or disable the substring fast path before JSON parsing.
    pub fn with_prefilter(mut self, prefilter: bool) -> Self {
        self.prefilter = prefilter;
        self
    }

    /// The zone days are bucketed in.
    pub fn zone(&self) -> Zone {
        self.zone
    }

    /// Cost of one day. Zero when nothing was logged or no root exists.
    pub fn cost_for_date(&self, date: NaiveDate) -> f64 {
        self.costs_for_dates(&[date])
            .get(&date)
            .copied()
            .unwrap_or(0.0)
    }

    /// Costs of several days in a single scan.
    ///
    /// Every requested date is present in the result, zero when it had no
    /// billable records.
    pub fn costs_for_dates(&self, dates: &[NaiveDate]) -> BTreeMap<NaiveDate, f64> {
        let wanted: BTreeSet<NaiveDate> = dates.iter().copied().collect();
        let Some(earliest) = wanted.first().copied() else {
            return BTreeMap::new();
        };

        let files = self.candidate_files(self.zone.start_of(earliest));
        let mut events = Vec::new();
        for path in &files {
            match self.read_file(path) {
                Ok(file_events) => events.extend(file_events),
                Err(e) => warn!(file = %path.display(), error = %e, "Failed to read usage log"),
            }
        }

        debug!(
            files = files.len(),
            events = events.len(),
            dates = wanted.len(),
            "scanned usage logs"
        );

        reduce_costs(events, self.zone, &wanted)
    }

    /// All `*.jsonl` files under the roots that may hold records at or after `since`.
    pub fn candidate_files(&self, since: DateTime<Utc>) -> Vec<PathBuf> {
        let since = SystemTime::from(since);
        let mut files = Vec::new();

        for root in &self.roots {
            if !root.is_dir() {
                trace!(root = %root.display(), "usage root missing");
                continue;
            }

            for entry in WalkDir::new(root).follow_links(true) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        trace!(error = %e, "skipping unreadable entry");
                        continue;
                    }
                };

                if !entry.file_type().is_file()
                    || entry.path().extension().and_then(|e| e.to_str()) != Some("jsonl")
                {
                    continue;
                }

                // an unknown mtime keeps the file in the scan
                let stale = entry
                    .metadata()
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .is_some_and(|modified| modified < since);
                if !stale {
                    files.push(entry.into_path());
                }
            }
        }

        files
    }

    /// Parse a single log file, skipping lines that are not usage records.
    pub fn read_file(&self, path: &Path) -> Result<Vec<UsageEvent>> {
        let reader = BufReader::new(File::open(path)?);
        let mut events = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = match line {
                Ok(l) => l,
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    trace!(line = index + 1, error = %e, "Skipping non-UTF-8 line");
                    continue;
                }
                Err(e) => {
                    warn!(file = %path.display(), line = index + 1, error = %e, "Stopped reading usage log");
                    break;
                }
            };

            if self.prefilter && !line.contains(USAGE_MARKER) {
                continue;
            }

            match parse_line(&line) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(e) if e.is_skippable() => {
                    trace!(line = index + 1, error = %e, "Failed to parse line");
                }
                Err(e) => {
                    warn!(file = %path.display(), line = index + 1, error = %e, "Unexpected error parsing line");
                }
            }
        }

        Ok(events)
    }
}

/// Parse one JSON log line.
///
/// Returns `Ok(None)` for well-formed records that carry no usage.
pub fn parse_line(line: &str) -> Result<Option<UsageEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let raw: RawRecord = serde_json::from_str(line)?;

    let usage = raw
        .message
        .as_ref()
        .and_then(|m| m.usage.as_ref())
        .or(raw.usage.as_ref());
    let Some(tokens) = usage.map(RawUsage::counts) else {
        return Ok(None);
    };

    let timestamp = raw
        .timestamp
        .as_deref()
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| CostError::InvalidLogFormat("missing or invalid timestamp".into()))?;

    Ok(Some(UsageEvent {
        timestamp,
        event_id: raw.uuid,
        request_id: raw.request_id,
        is_sidechain: raw.is_sidechain.unwrap_or(false),
        is_error: raw.is_api_error_message.unwrap_or(false),
        model: raw.message.and_then(|m| m.model),
        tokens,
    }))
}

struct RequestGroup {
    model: Option<String>,
    tokens: TokenCounts,
}

/// Reduce events to per-day costs for the dates in `wanted`.
///
/// Records are deduplicated by event id, then grouped by request id (or by
/// event id when the request id is missing) with the per-category maximum
/// taken inside each group. Records with neither id stand alone.
pub fn reduce_costs(
    events: impl IntoIterator<Item = UsageEvent>,
    zone: Zone,
    wanted: &BTreeSet<NaiveDate>,
) -> BTreeMap<NaiveDate, f64> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut groups: HashMap<(NaiveDate, String), RequestGroup> = HashMap::new();
    let mut totals: BTreeMap<NaiveDate, f64> = wanted.iter().map(|d| (*d, 0.0)).collect();

    for event in events {
        if !event.is_billable() {
            continue;
        }

        let date = zone.date_of(event.timestamp);
        if !wanted.contains(&date) {
            continue;
        }

        if let Some(id) = &event.event_id
            && !seen.insert(id.clone())
        {
            continue;
        }

        let key = match (&event.request_id, &event.event_id) {
            (Some(request), _) => format!("req:{request}"),
            (None, Some(id)) => format!("evt:{id}"),
            (None, None) => {
                let cost = rate_for(event.model.as_deref().unwrap_or_default()).cost(&event.tokens);
                *totals.entry(date).or_default() += non_negative(cost);
                continue;
            }
        };

        groups
            .entry((date, key))
            .and_modify(|group| {
                group.tokens.merge_max(&event.tokens);
                if group.model.is_none() {
                    group.model = event.model.clone();
                }
            })
            .or_insert_with(|| RequestGroup {
                model: event.model.clone(),
                tokens: event.tokens,
            });
    }

    for ((date, _), group) in groups {
        let cost = rate_for(group.model.as_deref().unwrap_or_default()).cost(&group.tokens);
        *totals.entry(date).or_default() += non_negative(cost);
    }

    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc() -> Zone {
        Zone::named("UTC").unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn event(id: &str, request: &str, input: u64) -> UsageEvent {
        UsageEvent::new(
            Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap(),
            "claude-sonnet-4-5",
            TokenCounts::new(input, 0, 0, 0),
        )
        .with_event_id(id)
        .with_request(request)
    }

    #[test]
    fn test_parse_assistant_line() {
        let line = r#"{"type":"assistant","uuid":"u-1","requestId":"req_1","timestamp":"2025-06-10T12:00:00.000Z","isSidechain":false,"message":{"model":"claude-opus-4-5-20251101","id":"msg_01","role":"assistant","content":[],"usage":{"input_tokens":100,"output_tokens":50,"cache_creation_input_tokens":200,"cache_read_input_tokens":300}}}"#;

        let event = parse_line(line).unwrap().unwrap();

        assert_eq!(event.event_id.as_deref(), Some("u-1"));
        assert_eq!(event.request_id.as_deref(), Some("req_1"));
        assert_eq!(event.model.as_deref(), Some("claude-opus-4-5-20251101"));
        assert_eq!(event.tokens, TokenCounts::new(100, 50, 300, 200));
        assert!(event.is_billable());
    }

    #[test]
    fn test_parse_flags() {
        let line = r#"{"uuid":"u-2","timestamp":"2025-06-10T12:00:00Z","isSidechain":true,"isApiErrorMessage":true,"message":{"model":"m","usage":{"input_tokens":1}}}"#;
        let event = parse_line(line).unwrap().unwrap();
        assert!(event.is_sidechain);
        assert!(event.is_error);
        assert!(!event.is_billable());
    }

    #[test]
    fn test_skip_non_usage_records() {
        let line = r#"{"type":"user","uuid":"u-3","timestamp":"2025-06-10T12:00:00Z","message":{"role":"user","content":"hello"}}"#;
        assert!(parse_line(line).unwrap().is_none());
        assert!(parse_line("   ").unwrap().is_none());
        assert!(parse_line("{not json").is_err());
    }

    #[test]
    fn test_missing_timestamp_is_invalid() {
        let line = r#"{"uuid":"u-4","message":{"usage":{"input_tokens":1}}}"#;
        let err = parse_line(line).unwrap_err();
        assert!(err.is_skippable());
    }

    #[test]
    fn test_streamed_request_costs_its_maximum() {
        let wanted: BTreeSet<_> = [day(10)].into();
        let streamed = reduce_costs(
            vec![event("u-1", "req-1", 100), event("u-2", "req-1", 150)],
            utc(),
            &wanted,
        );
        let single = reduce_costs(vec![event("u-2", "req-1", 150)], utc(), &wanted);

        assert_eq!(streamed[&day(10)], single[&day(10)]);
        assert!((single[&day(10)] - 150.0 * 3.0 / 1_000_000.0).abs() < 1e-12);
    }

    #[test]
    fn test_duplicate_record_is_counted_once() {
        let wanted: BTreeSet<_> = [day(10)].into();
        let once = reduce_costs(vec![event("u-1", "req-1", 1000)], utc(), &wanted);
        let twice = reduce_costs(
            vec![event("u-1", "req-1", 1000), event("u-1", "req-1", 1000)],
            utc(),
            &wanted,
        );
        assert_eq!(once, twice);
    }

    #[test]
    fn test_distinct_requests_add_up() {
        let wanted: BTreeSet<_> = [day(10)].into();
        let costs = reduce_costs(
            vec![event("u-1", "req-1", 1_000_000), event("u-2", "req-2", 1_000_000)],
            utc(),
            &wanted,
        );
        assert!((costs[&day(10)] - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_request_id_groups_by_event_id() {
        let wanted: BTreeSet<_> = [day(10)].into();
        let mut a = event("u-1", "x", 1_000_000);
        a.request_id = None;
        let mut b = event("u-2", "x", 1_000_000);
        b.request_id = None;

        let costs = reduce_costs(vec![a, b], utc(), &wanted);
        assert!((costs[&day(10)] - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_unwanted_dates_are_ignored_and_wanted_are_zero_filled() {
        let wanted: BTreeSet<_> = [day(9), day(11)].into();
        let costs = reduce_costs(vec![event("u-1", "req-1", 1000)], utc(), &wanted);
        assert_eq!(costs.len(), 2);
        assert_eq!(costs[&day(9)], 0.0);
        assert_eq!(costs[&day(11)], 0.0);
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.jsonl");
        let good = r#"{"uuid":"u-1","timestamp":"2025-06-10T12:00:00Z","message":{"model":"sonnet","usage":{"input_tokens":5}}}"#;
        let mut bytes = b"\xff\xfe \"usage\" broken\n".to_vec();
        bytes.extend_from_slice(good.as_bytes());
        bytes.push(b'\n');
        std::fs::write(&path, bytes).unwrap();

        let reader = UsageLogReader::new(vec![dir.path().to_path_buf()], utc());
        let events = reader.read_file(&path).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tokens.input, 5);
    }

    #[cfg(unix)]
    #[test]
    fn test_persistent_read_error_ends_file() {
        // reading a directory fails with EISDIR on every call
        let dir = tempfile::tempdir().unwrap();
        let reader = UsageLogReader::new(vec![dir.path().to_path_buf()], utc());
        let events = reader.read_file(dir.path()).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_missing_roots_cost_nothing() {
        let reader = UsageLogReader::new(vec![PathBuf::from("/nonexistent/costline")], utc());
        assert_eq!(reader.cost_for_date(day(10)), 0.0);
        assert!(reader.costs_for_dates(&[]).is_empty());
    }
}
