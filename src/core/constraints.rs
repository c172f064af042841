//! Predicates deciding whether an item may start on a date.
//!
//! The greedy strategies combine them into a single admission gate and
//! validation scores finished schedules with the same checks.

use super::calendar::{add_days, days};
use super::{Instance, Interval, Schedule};
use chrono::NaiveDate;

/// First date on which every dependency of the item, plus its lead time, has completed.
/// `None` while a dependency is unscheduled.
#[must_use]
pub fn dependencies_ready_on(instance: &Instance, item: usize, schedule: &Schedule) -> Option<NaiveDate> {
    instance
        .graph()
        .dependencies(item)
        .iter()
        .try_fold(NaiveDate::MIN, |ready, &dependency| {
            let interval = schedule.get(&instance.items()[dependency].id)?;
            let lead = i64::from(instance.lead_days(dependency, item));
            Some(ready.max(add_days(interval.end(), lead).unwrap_or(NaiveDate::MAX)))
        })
}

/// Returns whether every dependency has an interval ending, lead time included, by `as_of`.
#[must_use]
pub fn dependencies_satisfied(instance: &Instance, item: usize, schedule: &Schedule, as_of: NaiveDate) -> bool {
    dependencies_ready_on(instance, item, schedule).is_some_and(|ready| ready <= as_of)
}

/// Latest start that still completes `buffer_days` before the venue deadline.
/// `None` when no deadline applies.
#[must_use]
pub fn latest_start(instance: &Instance, item: usize, buffer_days: u32) -> Option<NaiveDate> {
    instance
        .deadline(item)
        .map(|deadline| deadline - days(instance.duration(item)) - days(buffer_days))
}

/// Returns whether starting on `start` completes `buffer_days` before the deadline.
#[must_use]
pub fn meets_deadline(instance: &Instance, item: usize, start: NaiveDate, buffer_days: u32) -> bool {
    latest_start(instance, item, buffer_days).map_or(true, |latest| start <= latest)
}

/// Returns whether fewer than `limit` items are active on the date.
#[must_use]
pub fn concurrency_ok(schedule: &Schedule, date: NaiveDate, limit: usize) -> bool {
    schedule.load_on(date) < limit
}

/// Returns whether fewer than `limit` other items are active on every day of the interval.
#[must_use]
pub fn concurrency_ok_within(schedule: &Schedule, interval: &Interval, limit: usize, exclude: Option<&str>) -> bool {
    schedule.peak_load_within(interval, exclude) < limit
}

/// Combined admission gate of the greedy strategies.
#[derive(Clone, Copy, Debug)]
pub struct Gate<'a> {
    pub instance: &'a Instance,
    /// Default earliest start of items without their own.
    pub as_of: NaiveDate,
    /// Days subtracted from every deadline.
    pub deadline_buffer_days: u32,
}

impl Gate<'_> {
    /// Returns whether the item may occupy `interval`, ignoring its own current placement.
    #[must_use]
    pub fn admits(&self, item: usize, interval: &Interval, schedule: &Schedule) -> bool {
        let instance = self.instance;
        let id = instance.items()[item].id.as_str();

        interval.start() >= instance.earliest_start(item, self.as_of)
            && dependencies_satisfied(instance, item, schedule, interval.start())
            && meets_deadline(instance, item, interval.start(), self.deadline_buffer_days)
            && concurrency_ok_within(schedule, interval, instance.config().max_concurrent, Some(id))
    }

    /// Returns whether the item may start on `start` with its configured duration.
    #[must_use]
    pub fn admits_on(&self, item: usize, start: NaiveDate, schedule: &Schedule) -> bool {
        self.admits(item, &Interval::new(start, self.instance.duration(item)), schedule)
    }
}
