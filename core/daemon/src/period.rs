//! Counting-period keys and turnover.
//!
//! A day is tagged with the local calendar date (`2026-08-25`), a week with
//! its ISO 8601 week (`2026-W35`, Monday start, week-based year). Turnover
//! compares the tags stored with the counters against the present and zeroes
//! any scope whose tag no longer matches. The two scopes roll over
//! independently, so a week boundary in the middle of a day does not touch
//! the daily counters.

use chrono::{Datelike, Local, NaiveDate};

use cadence_daemon_protocol::{DailyCounts, TrackerState, WeeklyCounts};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodKeys {
    pub daily: String,
    pub weekly: String,
}

impl PeriodKeys {
    pub fn current() -> Self {
        Self::for_date(Local::now().date_naive())
    }

    pub fn for_date(date: NaiveDate) -> Self {
        let week = date.iso_week();
        Self {
            daily: date.format("%Y-%m-%d").to_string(),
            weekly: format!("{:04}-W{:02}", week.year(), week.week()),
        }
    }
}

/// Re-tags and zeroes stale scopes in place. Returns true when anything
/// changed so callers can skip the disk write on the common no-op path.
pub fn apply_turnover(state: &mut TrackerState, keys: &PeriodKeys) -> bool {
    let mut changed = false;

    if state.daily_key.as_deref() != Some(keys.daily.as_str()) {
        state.daily = DailyCounts::default();
        state.daily_key = Some(keys.daily.clone());
        changed = true;
    }

    if state.weekly_key.as_deref() != Some(keys.weekly.as_str()) {
        state.weekly = WeeklyCounts::default();
        state.weekly_key = Some(keys.weekly.clone());
        changed = true;
    }

    changed
}
