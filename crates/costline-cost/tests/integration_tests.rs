//! Integration tests for costline-cost with JSONL usage log fixtures.

use std::fs::File;
use std::path::Path;
use std::time::{Duration, SystemTime};

use chrono::NaiveDate;
use costline_core::Zone;
use costline_cost::{ContextTracker, Ledger, UsageLogReader, rollup};
use tempfile::tempdir;

const SONNET_MTOK_INPUT: f64 = 3.0;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn utc() -> Zone {
    Zone::named("UTC").unwrap()
}

/// A usage record line with only input tokens.
fn record(uuid: &str, request: &str, timestamp: &str, model: &str, input: u64) -> String {
    format!(
        r#"{{"type":"assistant","uuid":"{uuid}","requestId":"{request}","timestamp":"{timestamp}","message":{{"model":"{model}","usage":{{"input_tokens":{input},"output_tokens":0}}}}}}"#
    )
}

fn write_log(dir: &Path, name: &str, lines: &[String]) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(name), lines.join("\n") + "\n").unwrap();
}

/// Session transcript with a streamed request, noise lines and a side-channel entry.
fn session_log() -> Vec<String> {
    vec![
        r#"{"type":"summary","summary":"Refactor parser"}"#.to_string(),
        record("u1", "r1", "2025-06-10T09:00:00Z", "claude-sonnet-4-5", 400_000),
        record("u2", "r1", "2025-06-10T09:00:01Z", "claude-sonnet-4-5", 1_000_000),
        "{not valid json \"usage\"".to_string(),
        r#"{"type":"assistant","uuid":"u3","isSidechain":true,"timestamp":"2025-06-10T09:10:00Z","message":{"model":"claude-opus-4","usage":{"input_tokens":1000000}}}"#.to_string(),
        r#"{"type":"assistant","uuid":"u4","isApiErrorMessage":true,"timestamp":"2025-06-10T09:11:00Z","message":{"model":"claude-opus-4","usage":{"input_tokens":1000000}}}"#.to_string(),
        record("u5", "r2", "2025-06-09T23:30:00Z", "claude-haiku-4-5", 1_000_000),
    ]
}

#[test]
fn test_cost_for_date_from_session_files() {
    let dir = tempdir().unwrap();
    let project = dir.path().join("projects").join("-home-me-repo");
    write_log(&project, "session-a.jsonl", &session_log());

    let reader = UsageLogReader::new(vec![dir.path().join("projects")], utc());

    // streamed request priced once at its maximum
    let cost = reader.cost_for_date(date(2025, 6, 10));
    assert!((cost - SONNET_MTOK_INPUT).abs() < 1e-9, "got {cost}");

    let cost = reader.cost_for_date(date(2025, 6, 9));
    assert!((cost - 0.80).abs() < 1e-9, "got {cost}");

    assert_eq!(reader.cost_for_date(date(2025, 6, 11)), 0.0);
}

#[test]
fn test_duplicated_file_does_not_change_cost() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("projects");
    write_log(&root.join("a"), "session-a.jsonl", &session_log());

    let reader = UsageLogReader::new(vec![root.clone()], utc());
    let before = reader.cost_for_date(date(2025, 6, 10));

    // same records resumed into another transcript
    write_log(&root.join("b"), "session-a-resumed.jsonl", &session_log());
    let after = reader.cost_for_date(date(2025, 6, 10));

    assert_eq!(before, after);
}

#[test]
fn test_non_jsonl_files_are_ignored() {
    let dir = tempdir().unwrap();
    write_log(dir.path(), "notes.log", &session_log());

    let reader = UsageLogReader::new(vec![dir.path().to_path_buf()], utc());
    assert_eq!(reader.cost_for_date(date(2025, 6, 10)), 0.0);
}

#[test]
fn test_zone_moves_records_across_days() {
    let dir = tempdir().unwrap();
    write_log(dir.path(), "s.jsonl", &[record("u1", "r1", "2025-06-09T23:30:00Z", "haiku", 1_000_000)]);

    let tokyo = Zone::named("Asia/Tokyo").unwrap();
    let reader = UsageLogReader::new(vec![dir.path().to_path_buf()], tokyo);

    assert_eq!(reader.cost_for_date(date(2025, 6, 9)), 0.0);
    assert!((reader.cost_for_date(date(2025, 6, 10)) - 0.80).abs() < 1e-9);
}

#[test]
fn test_files_modified_before_date_are_skipped() {
    let dir = tempdir().unwrap();
    write_log(dir.path(), "old.jsonl", &[record("u1", "r1", "2025-06-10T10:00:00Z", "sonnet", 1_000_000)]);

    // 2025-06-05T00:00:00Z
    let old = SystemTime::UNIX_EPOCH + Duration::from_secs(1_749_081_600);
    File::options()
        .write(true)
        .open(dir.path().join("old.jsonl"))
        .unwrap()
        .set_modified(old)
        .unwrap();

    let reader = UsageLogReader::new(vec![dir.path().to_path_buf()], utc());
    assert_eq!(reader.cost_for_date(date(2025, 6, 10)), 0.0);
    assert_eq!(reader.candidate_files(utc().start_of(date(2025, 6, 4))).len(), 1);
}

#[test]
fn test_prefilter_does_not_change_cost() {
    let dir = tempdir().unwrap();
    write_log(dir.path(), "s.jsonl", &session_log());

    let fast = UsageLogReader::new(vec![dir.path().to_path_buf()], utc());
    let slow = fast.clone().with_prefilter(false);

    let dates = [date(2025, 6, 9), date(2025, 6, 10)];
    assert_eq!(fast.costs_for_dates(&dates), slow.costs_for_dates(&dates));
}

#[test]
fn test_rollup_archives_and_stays_immutable() {
    let logs = tempdir().unwrap();
    let state = tempdir().unwrap();
    let ledger_path = state.path().join("ledger.json");
    let today = date(2025, 6, 11);

    write_log(logs.path(), "s.jsonl", &[
        record("u1", "r1", "2025-06-09T10:00:00Z", "sonnet", 1_000_000),
        record("u2", "r2", "2025-06-10T10:00:00Z", "opus", 1_000_000),
        record("u3", "r3", "2025-06-11T10:00:00Z", "haiku", 1_000_000),
    ]);
    let reader = UsageLogReader::new(vec![logs.path().to_path_buf()], utc());

    {
        let mut ledger = Ledger::open(&ledger_path);
        let totals = rollup(today, reader.cost_for_date(today), &mut ledger, &reader, false);
        assert!((totals.day - 0.80).abs() < 1e-9);
        assert!((totals.week - (0.80 + 3.0 + 15.0)).abs() < 1e-9);
        assert!((totals.month - totals.week).abs() < 1e-9);
        ledger.save().unwrap();
    }

    // logs for an archived day grow later; the archive keeps its value
    write_log(logs.path(), "late.jsonl", &[record("u9", "r9", "2025-06-10T20:00:00Z", "opus", 1_000_000)]);

    let mut ledger = Ledger::open(&ledger_path);
    let totals = rollup(today, reader.cost_for_date(today), &mut ledger, &reader, false);
    assert!((totals.week - (0.80 + 3.0 + 15.0)).abs() < 1e-9);
    assert_eq!(ledger.archived(date(2025, 6, 10)), Some(15.0));
}

#[test]
fn test_session_and_context_scenario() {
    let state = tempdir().unwrap();
    let today = date(2025, 6, 10);

    let contribution = {
        let mut ledger = Ledger::open(state.path().join("ledger.json"));
        let c = ledger.record_session(today, "s1", 1.50);
        ledger.save().unwrap();
        c
    };
    assert_eq!(contribution, 0.0);

    let mut tracker = ContextTracker::load(state.path().join("context.json"), today, 7);
    let usage = tracker.update("s1", 40_000, 4_000, 200_000, today);
    tracker.save().unwrap();
    assert_eq!(usage.effective_tokens, 44_000);
    assert_eq!(usage.remaining_percent(), 78);

    let mut ledger = Ledger::open(state.path().join("ledger.json"));
    let contribution = ledger.record_session(today, "s1", 2.00);
    assert!((contribution - 0.50).abs() < 1e-9);
    assert!((ledger.day(today).unwrap().total - 0.50).abs() < 1e-9);
}
