//! Rolling cost aggregation.
//!
//! Today's figure is always computed fresh from the usage logs. Earlier days
//! come from the ledger's history archive; any day in the lookback that has
//! no archive entry yet is computed once, in a single batch scan, and
//! archived so later invocations never scan it again.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, NaiveDate};
use tracing::debug;

use crate::ledger::Ledger;
use crate::models::{Rollup, non_negative};
use crate::parser::UsageLogReader;

/// Anything that can price whole days.
pub trait DailyCostSource {
    /// Cost of each requested date; dates without records map to 0.0.
    fn costs_for_dates(&self, dates: &[NaiveDate]) -> BTreeMap<NaiveDate, f64>;
}

impl DailyCostSource for UsageLogReader {
    fn costs_for_dates(&self, dates: &[NaiveDate]) -> BTreeMap<NaiveDate, f64> {
        UsageLogReader::costs_for_dates(self, dates)
    }
}

/// Most recent Monday on or before `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

/// First day of `date`'s month.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// January 1st of `date`'s year.
pub fn year_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.ordinal0()))
}

/// Dates in `[from, today)` without an archive entry.
fn missing_dates(ledger: &Ledger, from: NaiveDate, today: NaiveDate) -> Vec<NaiveDate> {
    from.iter_days()
        .take_while(|d| *d < today)
        .filter(|d| ledger.archived(*d).is_none())
        .collect()
}

/// Fill in archive entries for every unarchived date in `[from, today)`.
///
/// Returns the number of dates archived.
pub fn backfill(
    ledger: &mut Ledger,
    source: &impl DailyCostSource,
    from: NaiveDate,
    today: NaiveDate,
) -> usize {
    let missing = missing_dates(ledger, from, today);
    if missing.is_empty() {
        return 0;
    }

    debug!(count = missing.len(), %from, "scanning unarchived days");
    let costs = source.costs_for_dates(&missing);

    let mut archived = 0;
    for date in missing {
        let cost = costs.get(&date).copied().unwrap_or(0.0);
        if ledger.archive(date, cost, today) {
            archived += 1;
        }
    }
    archived
}

/// Compute the day/week/month/year rollup.
///
/// `today_cost` is the fresh cost of `today`; no archive entry for today is
/// ever consulted. With `year_backfill` the lookback extends to January 1st,
/// otherwise the year only counts days that are already archived.
pub fn rollup(
    today: NaiveDate,
    today_cost: f64,
    ledger: &mut Ledger,
    source: &impl DailyCostSource,
    year_backfill: bool,
) -> Rollup {
    let day = non_negative(today_cost);
    let week_from = week_start(today);
    let month_from = month_start(today);
    let year_from = year_start(today);

    let mut lookback = week_from.min(month_from);
    if year_backfill {
        lookback = lookback.min(year_from);
    }
    backfill(ledger, source, lookback, today);

    let past = |from: NaiveDate| -> f64 { ledger.history().range(from..today).map(|(_, c)| *c).sum() };

    let rollup = Rollup {
        day,
        week: day + past(week_from),
        month: day + past(month_from),
        year: day + past(year_from),
    };
    debug!(?rollup, %today, "rollup computed");
    rollup
}
