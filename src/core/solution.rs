use super::calendar::add_days;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Placement of one item: `end = start + duration`, clamped to the last representable date.
///
/// The item occupies the half-open range `[start, end)`. A zero-length interval
/// (an abstract) still occupies its start day.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(try_from = "RawInterval")]
pub struct Interval {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawInterval {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawInterval> for Interval {
    type Error = String;

    fn try_from(raw: RawInterval) -> Result<Self, Self::Error> {
        if raw.end < raw.start {
            return Err(format!("interval ends on {} before it starts on {}", raw.end, raw.start));
        }
        Ok(Self {
            start: raw.start,
            end: raw.end,
        })
    }
}

impl Interval {
    #[must_use]
    pub fn new(start: NaiveDate, duration_days: u32) -> Self {
        Self {
            start,
            end: add_days(start, i64::from(duration_days)).unwrap_or(NaiveDate::MAX),
        }
    }

    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    #[must_use]
    pub fn duration_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// First day the interval no longer occupies.
    #[must_use]
    pub fn occupied_until(&self) -> NaiveDate {
        self.end.max(self.start.succ_opt().unwrap_or(self.start))
    }

    /// Returns whether the item is active on the date.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.occupied_until()
    }

    /// Returns whether the two intervals share an occupied day.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.occupied_until() && other.start < self.occupied_until()
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} .. {}", self.start, self.end)
    }
}

/// Mapping from item id to its interval. Iteration is ordered by id.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Schedule {
    intervals: BTreeMap<String, Interval>,
}

impl Schedule {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Places the item, returning its previous interval.
    pub fn add_interval(&mut self, id: impl Into<String>, interval: Interval) -> Option<Interval> {
        self.intervals.insert(id.into(), interval)
    }

    /// Removes the item, returning its interval.
    pub fn remove_interval(&mut self, id: &str) -> Option<Interval> {
        self.intervals.remove(id)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Interval> {
        self.intervals.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.intervals.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Interval)> {
        self.intervals.iter().map(|(id, interval)| (id.as_str(), interval))
    }

    /// Ids of the items active on the date, in id order.
    pub fn active_on(&self, date: NaiveDate) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(move |(_, interval)| interval.contains(date))
            .map(|(id, _)| id)
    }

    /// Returns whether the item is scheduled and active on the date.
    #[must_use]
    pub fn is_active(&self, id: &str, date: NaiveDate) -> bool {
        self.get(id).is_some_and(|interval| interval.contains(date))
    }

    /// Number of items active on the date.
    #[must_use]
    pub fn load_on(&self, date: NaiveDate) -> usize {
        self.active_on(date).count()
    }

    /// Largest number of items active on any day of `range`, ignoring `exclude`.
    ///
    /// Load only grows where an interval starts, so it is enough to look at the
    /// first day of the range and at every start inside it.
    #[must_use]
    pub fn peak_load_within(&self, range: &Interval, exclude: Option<&str>) -> usize {
        let others = || self.iter().filter(|(id, _)| Some(*id) != exclude);
        let load = |date: NaiveDate| others().filter(|(_, i)| i.contains(date)).count();

        others()
            .map(|(_, interval)| interval.start)
            .filter(|&start| range.contains(start))
            .chain(std::iter::once(range.start))
            .map(load)
            .max()
            .unwrap_or_default()
    }

    /// Earliest start of any interval.
    #[must_use]
    pub fn start_date(&self) -> Option<NaiveDate> {
        self.intervals.values().map(Interval::start).min()
    }

    /// Latest end of any interval.
    #[must_use]
    pub fn end_date(&self) -> Option<NaiveDate> {
        self.intervals.values().map(Interval::end).max()
    }

    /// Days from the earliest start to the latest end.
    #[must_use]
    pub fn makespan(&self) -> i64 {
        match (self.start_date(), self.end_date()) {
            (Some(start), Some(end)) => (end - start).num_days(),
            _ => 0,
        }
    }
}

impl<'a> IntoIterator for &'a Schedule {
    type Item = (&'a String, &'a Interval);
    type IntoIter = std::collections::btree_map::Iter<'a, String, Interval>;

    fn into_iter(self) -> Self::IntoIter {
        self.intervals.iter()
    }
}

/// Why a greedy-family run stopped before placing every item.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialReason {
    /// The simulated date passed the end of the planning horizon.
    HorizonExhausted,
    /// The day loop hit its iteration bound.
    IterationLimit,
    /// The remaining items can no longer start in time for their deadlines,
    /// or depend on such an item.
    NoValidStart,
}

/// Why the exact strategy returned the greedy schedule instead of its own.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    Infeasible,
    Unbounded,
    TimedOut,
    SolverError(String),
}

impl Display for FallbackReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Infeasible => f.write_str("model is infeasible"),
            Self::Unbounded => f.write_str("model is unbounded"),
            Self::TimedOut => f.write_str("solver timed out"),
            Self::SolverError(message) => write!(f, "solver failed: {message}"),
        }
    }
}

/// How complete a returned schedule is.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Status {
    /// Every item is scheduled.
    Complete,
    /// Best effort: the listed items are absent from the schedule.
    Partial {
        unscheduled: Vec<String>,
        reason: PartialReason,
    },
    /// The exact strategy gave up and the greedy schedule was returned.
    /// `unscheduled` lists what the greedy run could not place.
    Fallback {
        reason: FallbackReason,
        unscheduled: Vec<String>,
    },
}

impl Status {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Partial { .. } => "partial",
            Self::Fallback { .. } => "fallback",
        }
    }
}

/// Soft constraint relaxed by the exact strategy.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "constraint", rename_all = "snake_case")]
pub enum SlackKind {
    Deadline,
    Dependency { on: String },
    /// Items active on the item's start day beyond the concurrency limit.
    Resource,
}

/// Amount by which a soft constraint was violated: days for deadlines and
/// dependencies, items for concurrency.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SlackEntry {
    pub item: String,
    #[serde(flatten)]
    pub kind: SlackKind,
    pub amount: i64,
}

/// Result of one scheduling run.
#[non_exhaustive]
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Outcome {
    pub schedule: Schedule,
    #[serde(flatten)]
    pub status: Status,
    /// Non-zero slack of the exact strategy's solution.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub slack: Vec<SlackEntry>,
}

impl Outcome {
    /// Wraps a schedule, marking it partial when `unscheduled` is non-empty.
    #[must_use]
    pub fn new(schedule: Schedule, unscheduled: Vec<String>, reason: PartialReason) -> Self {
        let status = if unscheduled.is_empty() {
            Status::Complete
        } else {
            Status::Partial {
                unscheduled,
                reason,
            }
        };
        Self {
            schedule,
            status,
            slack: Vec::new(),
        }
    }

    #[must_use]
    pub const fn complete(schedule: Schedule) -> Self {
        Self {
            schedule,
            status: Status::Complete,
            slack: Vec::new(),
        }
    }

    /// Turns a greedy outcome into the fallback result of the exact strategy.
    #[must_use]
    pub fn into_fallback(self, reason: FallbackReason) -> Self {
        let unscheduled = self.unscheduled().to_vec();
        Self {
            schedule: self.schedule,
            status: Status::Fallback {
                reason,
                unscheduled,
            },
            slack: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_slack(mut self, slack: Vec<SlackEntry>) -> Self {
        self.slack = slack;
        self
    }

    /// Items the run could not place.
    #[must_use]
    pub fn unscheduled(&self) -> &[String] {
        match &self.status {
            Status::Complete => &[],
            Status::Partial { unscheduled, .. } | Status::Fallback { unscheduled, .. } => unscheduled,
        }
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self.status, Status::Complete)
    }

    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self.status, Status::Fallback { .. })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::samples::day;

    #[test]
    fn interval_is_half_open() {
        let interval = Interval::new(day(10), 5);
        assert!(!interval.contains(day(9)));
        assert!(interval.contains(day(10)));
        assert!(interval.contains(day(14)));
        assert!(!interval.contains(day(15)));
        assert_eq!(interval.end(), day(15));
    }

    #[test]
    fn zero_length_interval_occupies_start_day() {
        let interval = Interval::new(day(3), 0);
        assert_eq!(interval.start(), interval.end());
        assert!(interval.contains(day(3)));
        assert!(!interval.contains(day(4)));
    }

    #[test]
    fn add_then_query_active_dates() {
        let mut schedule = Schedule::new();
        schedule.add_interval("a", Interval::new(day(0), 30));

        assert!((0..30).all(|d| schedule.is_active("a", day(d))));
        assert!(!schedule.is_active("a", day(-1)));
        assert!(!schedule.is_active("a", day(31)));
        assert!(!schedule.is_active("b", day(1)));
    }

    #[test]
    fn remove_interval_clears_item() {
        let mut schedule = Schedule::new();
        schedule.add_interval("a", Interval::new(day(0), 3));
        assert_eq!(schedule.remove_interval("a"), Some(Interval::new(day(0), 3)));
        assert!(schedule.is_empty());
        assert_eq!(schedule.remove_interval("a"), None);
    }

    #[test]
    fn peak_load_looks_at_later_starts() {
        let mut schedule = Schedule::new();
        schedule.add_interval("a", Interval::new(day(0), 10));
        schedule.add_interval("b", Interval::new(day(5), 10));
        schedule.add_interval("c", Interval::new(day(8), 10));

        assert_eq!(schedule.load_on(day(9)), 3);
        assert_eq!(schedule.peak_load_within(&Interval::new(day(0), 4), None), 1);
        assert_eq!(schedule.peak_load_within(&Interval::new(day(0), 10), None), 3);
        assert_eq!(schedule.peak_load_within(&Interval::new(day(0), 10), Some("c")), 2);
        assert_eq!(schedule.makespan(), 18);
    }

    #[test]
    fn schedule_should_serialize() -> anyhow::Result<()> {
        let mut schedule = Schedule::new();
        schedule.add_interval("a", Interval::new(day(0), 3));
        schedule.add_interval("b", Interval::new(day(3), 0));

        let serialized = crate::data::to_string(&schedule)?;
        let deserialized: Schedule = serde_json::from_str(&serialized)?;

        assert_eq!(schedule, deserialized);
        Ok(())
    }

    #[test]
    fn reversed_interval_is_rejected() {
        let result: Result<Interval, _> =
            serde_json::from_str(r#"{"start": "2025-01-10", "end": "2025-01-09"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn outcome_reports_unscheduled() {
        let partial = Outcome::new(Schedule::new(), vec!["x".into()], PartialReason::HorizonExhausted);
        assert!(!partial.is_complete());
        assert_eq!(partial.unscheduled(), ["x"]);

        let fallback = partial.into_fallback(FallbackReason::TimedOut);
        assert!(fallback.is_fallback());
        assert_eq!(fallback.unscheduled(), ["x"]);
    }
}
