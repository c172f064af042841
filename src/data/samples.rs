//! Small instances shared by the tests and the benchmark.

use crate::core::{
    validate, Config, ConfigError, DurationPolicy, Instance, Item, ItemKind, LeadTime, Scheduler, SlackKind,
    Venue, VenueCategory,
};
use anyhow::ensure;
use chrono::{NaiveDate, TimeDelta};

/// Monday, 6 January 2025.
#[must_use]
pub fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 6).unwrap_or_default()
}

/// The date `offset` days after [`epoch`].
#[must_use]
pub fn day(offset: i64) -> NaiveDate {
    epoch() + TimeDelta::days(offset)
}

/// Paper `A` (90 days, deadline day 100) and paper `B` (30 days, deadline day 200)
/// depending on it, one item at a time.
///
/// # Errors
/// - Never, the instance is well formed.
pub fn two_papers() -> Result<Instance, ConfigError> {
    let venues = vec![
        Venue::new("first", VenueCategory::Medical).with_deadline(ItemKind::Paper, day(100)),
        Venue::new("second", VenueCategory::Medical).with_deadline(ItemKind::Paper, day(200)),
    ];
    let items = vec![
        Item::new("A", ItemKind::Paper)
            .with_earliest_start(day(0))
            .with_venue("first")
            .with_duration(DurationPolicy::Days(90)),
        Item::new("B", ItemKind::Paper)
            .with_venue("second")
            .with_dependency("A")
            .with_duration(DurationPolicy::Days(30)),
    ];
    Instance::new(items, venues, Config::with_max_concurrent(1))
}

/// `count` interchangeable posters of 30 days named `item-0`, `item-1`, ...
///
/// # Errors
/// - If `limit` is zero.
pub fn identical_items(count: usize, limit: usize) -> Result<Instance, ConfigError> {
    let items = (0..count)
        .map(|i| Item::new(format!("item-{i}"), ItemKind::Poster))
        .collect();
    Instance::new(items, Vec::new(), Config::with_max_concurrent(limit))
}

/// Poster `late` whose deadline is 10 days before its earliest start, next to a work item.
///
/// # Errors
/// - Never, the instance is well formed.
pub fn unreachable_deadline() -> Result<Instance, ConfigError> {
    let venues = vec![Venue::new("conf", VenueCategory::Medical).with_deadline(ItemKind::Poster, day(10))];
    let items = vec![
        Item::new("late", ItemKind::Poster)
            .with_venue("conf")
            .with_earliest_start(day(20)),
        Item::new("prep", ItemKind::WorkItem),
    ];
    Instance::new(items, venues, Config::default())
}

/// An engineering and a medical submission track sharing preparatory work, two at a time.
///
/// # Errors
/// - Never, the instance is well formed.
pub fn portfolio() -> Result<Instance, ConfigError> {
    let venues = vec![
        Venue::new("icml", VenueCategory::Engineering)
            .with_deadline(ItemKind::Abstract, day(40))
            .with_deadline(ItemKind::Paper, day(160)),
        Venue::new("amia", VenueCategory::Medical)
            .with_deadline(ItemKind::Abstract, day(60))
            .with_deadline(ItemKind::Paper, day(200))
            .with_deadline(ItemKind::Poster, day(120)),
    ];
    let items = vec![
        Item::new("data-prep", ItemKind::WorkItem),
        Item::new("model", ItemKind::WorkItem).with_dependency("data-prep"),
        Item::new("abs-eng", ItemKind::Abstract).with_venue("icml").with_engineering(true),
        Item::new("paper-eng", ItemKind::Paper)
            .with_venue("icml")
            .with_engineering(true)
            .with_dependency("abs-eng")
            .with_dependency("model"),
        Item::new("abs-med", ItemKind::Abstract).with_venue("amia"),
        Item::new("paper-med", ItemKind::Paper)
            .with_venue("amia")
            .with_dependency("abs-med")
            .with_dependency("data-prep"),
        Item::new("poster-med", ItemKind::Poster)
            .with_venue("amia")
            .with_dependency("abs-med"),
    ];
    let mut config = Config::with_max_concurrent(2);
    config.lead_times.push(LeadTime {
        after: ItemKind::WorkItem,
        before: ItemKind::Paper,
        days: 7,
    });
    Instance::new(items, venues, config)
}

/// Every sample instance with its name.
///
/// # Errors
/// - Never, the samples are well formed.
pub fn all() -> Result<Vec<(&'static str, Instance)>, ConfigError> {
    Ok(vec![
        ("two_papers", two_papers()?),
        ("identical_items", identical_items(3, 1)?),
        ("unreachable_deadline", unreachable_deadline()?),
        ("portfolio", portfolio()?),
    ])
}

/// Runs the scheduler on every sample starting at [`epoch`] and checks the result.
///
/// Every run must account for each item exactly once, respect earliest starts and
/// working days, and report any overload as resource slack. With `strict`, scheduled items must also satisfy every dependency, deadline and the
/// concurrency limit.
///
/// # Errors
/// - If a check fails.
pub fn verify(scheduler: &mut dyn Scheduler, strict: bool) -> anyhow::Result<()> {
    for (name, instance) in all()? {
        let outcome = scheduler.schedule(&instance, day(0));
        let report = validate(&outcome.schedule, &instance);

        ensure!(report.unknown.is_empty(), "{name}: unknown items {:?}", report.unknown);
        ensure!(
            report.unscheduled == outcome.unscheduled(),
            "{name}: unscheduled {:?}, reported {:?}",
            report.unscheduled,
            outcome.unscheduled()
        );
        ensure!(report.earliest_start.is_empty(), "{name}: {:?}", report.earliest_start);
        ensure!(report.non_working_starts.is_empty(), "{name}: {:?}", report.non_working_starts);
        ensure!(
            report.resources.violations.is_empty()
                || outcome.slack.iter().any(|slack| slack.kind == SlackKind::Resource),
            "{name}: unreported overload {:?}",
            report.resources
        );

        if strict {
            ensure!(report.dependencies.violations.is_empty(), "{name}: {:?}", report.dependencies);
            ensure!(report.deadlines.violations.is_empty(), "{name}: {:?}", report.deadlines);
            ensure!(report.resources.violations.is_empty(), "{name}: {:?}", report.resources);
        }
    }
    Ok(())
}
