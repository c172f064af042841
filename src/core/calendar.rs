//! Working-day arithmetic over a fixed weekend policy and a blackout set.

use chrono::{Datelike, NaiveDate, TimeDelta, Weekday};
use std::collections::BTreeSet;

/// Returns a span of whole days.
#[must_use]
pub fn days(count: u32) -> TimeDelta {
    TimeDelta::days(i64::from(count))
}

/// Returns whether the date is neither a Saturday, a Sunday nor a blackout date.
#[must_use]
pub fn is_working_day(date: NaiveDate, blackouts: &BTreeSet<NaiveDate>) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !blackouts.contains(&date)
}

/// Returns the first working day strictly after `date`.
#[must_use]
pub fn next_working_day(date: NaiveDate, blackouts: &BTreeSet<NaiveDate>) -> NaiveDate {
    let mut next = date + TimeDelta::days(1);
    while !is_working_day(next, blackouts) {
        next += TimeDelta::days(1);
    }
    next
}

/// Adds `count` working days to `date`. The start date itself is never counted.
#[must_use]
pub fn add_working_days(date: NaiveDate, count: u32, blackouts: &BTreeSet<NaiveDate>) -> NaiveDate {
    (0..count).fold(date, |current, _| next_working_day(current, blackouts))
}

/// Moves the date by `count` days. `None` outside the representable range.
#[must_use]
pub fn add_days(date: NaiveDate, count: i64) -> Option<NaiveDate> {
    TimeDelta::try_days(count).and_then(|delta| date.checked_add_signed(delta))
}

/// Number of days from `from` to `to`, negative when `to` is earlier.
#[must_use]
pub fn offset(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

#[cfg(test)]
mod test {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
    }

    #[test]
    fn weekends_are_not_working_days() {
        let none = BTreeSet::new();
        assert!(is_working_day(date(2025, 1, 3), &none));
        assert!(!is_working_day(date(2025, 1, 4), &none));
        assert!(!is_working_day(date(2025, 1, 5), &none));
        assert!(is_working_day(date(2025, 1, 6), &none));
    }

    #[test]
    fn blackouts_are_not_working_days() {
        let blackouts = BTreeSet::from([date(2025, 1, 6)]);
        assert!(!is_working_day(date(2025, 1, 6), &blackouts));
        assert!(is_working_day(date(2025, 1, 7), &blackouts));
    }

    #[test]
    fn next_working_day_skips_weekend_and_blackout() {
        let blackouts = BTreeSet::from([date(2025, 1, 6)]);
        assert_eq!(next_working_day(date(2025, 1, 3), &blackouts), date(2025, 1, 7));
    }

    #[test]
    fn add_working_days_counts_only_working_days() {
        let none = BTreeSet::new();
        assert_eq!(add_working_days(date(2025, 1, 3), 0, &none), date(2025, 1, 3));
        assert_eq!(add_working_days(date(2025, 1, 3), 1, &none), date(2025, 1, 6));
        assert_eq!(add_working_days(date(2025, 1, 3), 5, &none), date(2025, 1, 10));
    }

    #[test]
    fn add_days_stops_at_the_calendar_edge() {
        assert_eq!(add_days(date(2025, 1, 1), 10), Some(date(2025, 1, 11)));
        assert_eq!(add_days(date(2025, 1, 1), -1), Some(date(2024, 12, 31)));
        assert_eq!(add_days(NaiveDate::MAX, 1), None);
        assert_eq!(add_days(date(2025, 1, 1), i64::MAX), None);
    }

    #[test]
    fn offset_is_signed() {
        assert_eq!(offset(date(2025, 1, 1), date(2025, 1, 11)), 10);
        assert_eq!(offset(date(2025, 1, 11), date(2025, 1, 1)), -10);
    }
}
