use super::calendar::{add_days, days, is_working_day, offset};
use super::{Instance, Schedule};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How far past its deadline an item finishes.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// More than a week late is high, more than a day is medium.
    #[must_use]
    pub const fn of(days_late: i64) -> Self {
        if days_late > 7 {
            Self::High
        } else if days_late > 1 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DeadlineViolation {
    pub item: String,
    pub venue: String,
    pub deadline: NaiveDate,
    pub end: NaiveDate,
    pub days_late: i64,
    pub severity: Severity,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct DeadlineReport {
    pub violations: Vec<DeadlineViolation>,
    /// Scheduled items that have a deadline.
    pub total: usize,
    pub compliant: usize,
    pub compliance_rate: f64,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum DependencyIssue {
    /// The dependency is not in the schedule.
    Missing,
    /// The item starts `days` too early.
    Timing { days: i64 },
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DependencyViolation {
    pub item: String,
    pub dependency: String,
    #[serde(flatten)]
    pub issue: DependencyIssue,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct DependencyReport {
    pub violations: Vec<DependencyViolation>,
    pub total: usize,
    pub satisfied: usize,
    pub satisfaction_rate: f64,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct EarliestStartViolation {
    pub item: String,
    pub earliest_start: NaiveDate,
    pub start: NaiveDate,
}

/// Start on a weekend or blackout date while only working days are allowed.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct NonWorkingStart {
    pub item: String,
    pub start: NaiveDate,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ResourceViolation {
    pub date: NaiveDate,
    pub load: usize,
    pub limit: usize,
    pub excess: usize,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ResourceReport {
    pub violations: Vec<ResourceViolation>,
    pub peak_load: usize,
    pub limit: usize,
    /// Days with at least one active item.
    pub active_days: usize,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Penalties {
    pub deadline: f64,
    pub dependency: f64,
    pub resource: f64,
    pub total: f64,
}

/// Violations of a finished schedule, grouped by constraint.
#[non_exhaustive]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ValidationReport {
    pub deadlines: DeadlineReport,
    pub dependencies: DependencyReport,
    pub earliest_start: Vec<EarliestStartViolation>,
    pub non_working_starts: Vec<NonWorkingStart>,
    pub resources: ResourceReport,
    pub penalties: Penalties,
    /// Items absent from the schedule.
    pub unscheduled: Vec<String>,
    /// Scheduled ids that name no item.
    pub unknown: Vec<String>,
    pub completion_rate: f64,
    /// No violation of any kind. Unscheduled items alone do not invalidate a schedule.
    pub is_valid: bool,
}

#[allow(clippy::cast_precision_loss)]
fn rate(part: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Checks a schedule against every constraint of the instance.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn validate(schedule: &Schedule, instance: &Instance) -> ValidationReport {
    let config = instance.config();
    let mut report = ValidationReport::default();

    report.unknown = schedule
        .iter()
        .filter(|(id, _)| instance.position(id).is_none())
        .map(|(id, _)| id.to_owned())
        .collect();

    for (i, item) in instance.items().iter().enumerate() {
        let Some(interval) = schedule.get(&item.id) else {
            report.unscheduled.push(item.id.clone());
            continue;
        };

        if let (Some(venue), Some(deadline)) = (instance.venue_of(i), instance.deadline(i)) {
            report.deadlines.total += 1;
            let days_late = offset(deadline, interval.end());
            if days_late > 0 {
                report.penalties.deadline += days_late as f64 * config.penalty_per_day(item);
                report.deadlines.violations.push(DeadlineViolation {
                    item: item.id.clone(),
                    venue: venue.id.clone(),
                    deadline,
                    end: interval.end(),
                    days_late,
                    severity: Severity::of(days_late),
                });
            }
        }

        for &d in instance.graph().dependencies(i) {
            report.dependencies.total += 1;
            let dependency = &instance.items()[d];
            let issue = match schedule.get(&dependency.id) {
                None => Some(DependencyIssue::Missing),
                Some(before) => {
                    let lead = i64::from(instance.lead_days(d, i));
                    let ready = add_days(before.end(), lead).unwrap_or(NaiveDate::MAX);
                    let early = offset(interval.start(), ready);
                    (early > 0).then_some(DependencyIssue::Timing { days: early })
                }
            };
            if let Some(issue) = issue {
                report.dependencies.violations.push(DependencyViolation {
                    item: item.id.clone(),
                    dependency: dependency.id.clone(),
                    issue,
                });
            }
        }

        if let Some(earliest_start) = item.earliest_start.filter(|&e| interval.start() < e) {
            report.earliest_start.push(EarliestStartViolation {
                item: item.id.clone(),
                earliest_start,
                start: interval.start(),
            });
        }

        if config.options.working_days_only && !is_working_day(interval.start(), &config.blackout_dates) {
            report.non_working_starts.push(NonWorkingStart {
                item: item.id.clone(),
                start: interval.start(),
            });
        }
    }

    report.resources.limit = config.max_concurrent;
    if let (Some(first), Some(last)) = (
        schedule.start_date(),
        schedule.iter().map(|(_, i)| i.occupied_until()).max(),
    ) {
        let mut date = first;
        while date < last {
            let load = schedule.load_on(date);
            report.resources.peak_load = report.resources.peak_load.max(load);
            if load > 0 {
                report.resources.active_days += 1;
            }
            if load > config.max_concurrent {
                let excess = load - config.max_concurrent;
                report.penalties.resource += excess as f64 * config.penalty_costs.resource_violation;
                report.resources.violations.push(ResourceViolation {
                    date,
                    load,
                    limit: config.max_concurrent,
                    excess,
                });
            }
            date += days(1);
        }
    }

    let deadlines = &mut report.deadlines;
    deadlines.compliant = deadlines.total - deadlines.violations.len();
    deadlines.compliance_rate = rate(deadlines.compliant, deadlines.total);

    let dependencies = &mut report.dependencies;
    dependencies.satisfied = dependencies.total - dependencies.violations.len();
    dependencies.satisfaction_rate = rate(dependencies.satisfied, dependencies.total);
    report.penalties.dependency =
        dependencies.violations.len() as f64 * config.penalty_costs.dependency_violation;

    let penalties = &mut report.penalties;
    penalties.total = penalties.deadline + penalties.dependency + penalties.resource;

    report.completion_rate = rate(instance.len() - report.unscheduled.len(), instance.len());
    report.is_valid = report.deadlines.violations.is_empty()
        && report.dependencies.violations.is_empty()
        && report.earliest_start.is_empty()
        && report.non_working_starts.is_empty()
        && report.resources.violations.is_empty()
        && report.unknown.is_empty();

    report
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::{Config, Interval, Item, ItemKind, Venue, VenueCategory};
    use crate::data::samples::day;

    fn instance() -> anyhow::Result<Instance> {
        let venue = Venue::new("conf", VenueCategory::Medical)
            .with_deadline(ItemKind::Paper, day(100))
            .with_deadline(ItemKind::Abstract, day(20));
        let items = vec![
            Item::new("a", ItemKind::Abstract).with_venue("conf"),
            Item::new("p", ItemKind::Paper).with_venue("conf").with_dependency("a"),
            Item::new("w", ItemKind::WorkItem).with_earliest_start(day(5)),
        ];
        Ok(Instance::new(items, vec![venue], Config::with_max_concurrent(1))?)
    }

    #[test]
    fn valid_schedule_has_no_violations() -> anyhow::Result<()> {
        let instance = instance()?;
        let mut schedule = Schedule::new();
        schedule.add_interval("a", Interval::new(day(0), 0));
        schedule.add_interval("w", Interval::new(day(5), 14));
        schedule.add_interval("p", Interval::new(day(19), 70));

        let report = validate(&schedule, &instance);
        assert!(report.is_valid, "{report:?}");
        assert_eq!(report.deadlines.total, 2);
        assert!((report.deadlines.compliance_rate - 100.0).abs() < f64::EPSILON);
        assert!((report.completion_rate - 100.0).abs() < f64::EPSILON);
        assert_eq!(report.resources.peak_load, 1);
        Ok(())
    }

    #[test]
    fn late_paper_is_reported_with_severity() -> anyhow::Result<()> {
        let instance = instance()?;
        let mut schedule = Schedule::new();
        schedule.add_interval("a", Interval::new(day(0), 0));
        schedule.add_interval("p", Interval::new(day(20), 90));

        let report = validate(&schedule, &instance);
        assert!(!report.is_valid);
        assert_eq!(report.deadlines.violations.len(), 1);
        let violation = &report.deadlines.violations[0];
        assert_eq!(violation.days_late, 10);
        assert_eq!(violation.severity, Severity::High);
        assert!((report.penalties.deadline - 20_000.0).abs() < f64::EPSILON);
        assert_eq!(report.unscheduled, ["w"]);
        Ok(())
    }

    #[test]
    fn dependency_and_resource_issues_are_reported() -> anyhow::Result<()> {
        let instance = instance()?;
        let mut schedule = Schedule::new();
        schedule.add_interval("p", Interval::new(day(0), 90));
        schedule.add_interval("w", Interval::new(day(2), 2));
        schedule.add_interval("ghost", Interval::new(day(0), 1));

        let report = validate(&schedule, &instance);
        assert_eq!(
            report.dependencies.violations[0].issue,
            DependencyIssue::Missing
        );
        assert_eq!(report.earliest_start.len(), 1);
        assert_eq!(report.unknown, ["ghost"]);
        assert_eq!(report.resources.peak_load, 2);
        assert_eq!(report.resources.violations.len(), 3);
        assert!(!report.is_valid);

        schedule.add_interval("a", Interval::new(day(3), 0));
        let report = validate(&schedule, &instance);
        assert_eq!(
            report.dependencies.violations[0].issue,
            DependencyIssue::Timing { days: 3 }
        );
        Ok(())
    }

    #[test]
    fn weekend_start_is_reported_with_working_days_only() -> anyhow::Result<()> {
        let items = vec![Item::new("w", ItemKind::WorkItem)];
        let mut config = Config::default();
        config.blackout_dates.insert(day(8));
        let mut schedule = Schedule::new();
        schedule.add_interval("w", Interval::new(day(5), 14));

        let lenient = Instance::new(items.clone(), Vec::new(), config.clone())?;
        assert!(validate(&schedule, &lenient).is_valid);

        config.options.working_days_only = true;
        let strict = Instance::new(items, Vec::new(), config)?;
        let report = validate(&schedule, &strict);
        assert!(!report.is_valid);
        assert_eq!(
            report.non_working_starts,
            [NonWorkingStart {
                item: "w".into(),
                start: day(5)
            }]
        );

        schedule.add_interval("w", Interval::new(day(8), 14));
        assert_eq!(validate(&schedule, &strict).non_working_starts.len(), 1);
        schedule.add_interval("w", Interval::new(day(7), 14));
        assert!(validate(&schedule, &strict).is_valid);
        Ok(())
    }

    #[test]
    fn validate_is_idempotent() -> anyhow::Result<()> {
        let instance = instance()?;
        let mut schedule = Schedule::new();
        schedule.add_interval("p", Interval::new(day(30), 90));
        schedule.add_interval("w", Interval::new(day(31), 14));

        assert_eq!(validate(&schedule, &instance), validate(&schedule, &instance));
        Ok(())
    }
}
