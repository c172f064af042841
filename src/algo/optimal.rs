#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]

use super::milp::{Domain, MilpModel, MilpSolver, Microlp, Sense, SolveOutcome, VarId};
use super::Greedy;
use crate::core::calendar::{add_days, is_working_day, next_working_day, offset};
use crate::core::{Config, FallbackReason, Instance, Interval, Outcome, Schedule, Scheduler, SlackEntry, SlackKind};
use chrono::{Datelike, NaiveDate, Weekday};
use std::time::Duration;
use tracing::{info, warn};

/// Weight of the total start time relative to the makespan.
const START_WEIGHT: f64 = 0.01;

/// Slack variable of one soft constraint.
struct Slack {
    item: usize,
    kind: SlackKind,
    var: VarId,
}

/// MILP formulation of an instance.
///
/// Days are counted from `origin`, the earliest date any item may start.
/// Every item gets an integer start in `[earliest, horizon]`. Dependencies,
/// deadlines and the concurrency limit are soft: each has a non-negative slack
/// variable charged in the objective at the configured penalty, so the model is
/// always feasible. With `working_days_only` starts are restricted to working days.
///
/// Concurrency uses the fact that the load peaks on some start day. Items are
/// ordered by `(start, position)` and, for every item, the earlier items still
/// active on its start day count against the limit. Each pair gets two binaries:
/// which item comes first and whether the two are disjoint.
struct Formulation {
    model: MilpModel,
    origin: NaiveDate,
    starts: Vec<VarId>,
    slack: Vec<Slack>,
}

impl Formulation {
    fn build(instance: &Instance, as_of: NaiveDate) -> Self {
        let config = instance.config();
        let working_days_only = config.options.working_days_only;
        let first_start = |i: usize| {
            let earliest = instance.earliest_start(i, as_of);
            if !working_days_only || is_working_day(earliest, &config.blackout_dates) {
                earliest
            } else {
                next_working_day(earliest, &config.blackout_dates)
            }
        };

        let origin = (0..instance.len())
            .map(|i| instance.earliest_start(i, as_of))
            .min()
            .unwrap_or(as_of);
        let horizon = horizon(instance, as_of, origin);
        let bounds: Vec<(i64, i64)> = (0..instance.len())
            .map(|i| {
                let lower = offset(origin, first_start(i));
                (lower, horizon.max(lower))
            })
            .collect();
        let longest = (0..instance.len()).map(|i| occupied_days(instance, i)).max().unwrap_or(1);
        let big_m = (bounds.iter().map(|&(_, upper)| upper).max().unwrap_or_default() + longest + 1) as f64;

        let mut model = MilpModel::new();
        let makespan = model.add_variable("makespan", Domain::Continuous, 0.0, None);
        model.minimize(makespan, 1.0);

        let starts: Vec<VarId> = instance
            .items()
            .iter()
            .zip(&bounds)
            .enumerate()
            .map(|(i, (item, &(lower, upper)))| {
                let start = model.add_variable(
                    format!("start_{}", item.id),
                    Domain::Integer,
                    lower as f64,
                    Some(upper as f64),
                );
                model.minimize(start, START_WEIGHT);
                let duration = f64::from(instance.duration(i));
                model.add_constraint(vec![(makespan, 1.0), (start, -1.0)], Sense::GreaterEq, duration);
                start
            })
            .collect();

        if working_days_only {
            restrict_to_working_days(&mut model, instance, origin, &starts, &bounds, big_m);
        }

        let mut slack = Vec::new();
        for (i, item) in instance.items().iter().enumerate() {
            for &d in instance.graph().dependencies(i) {
                let dependency = &instance.items()[d];
                let var = model.add_variable(
                    format!("dependency_slack_{}_{}", item.id, dependency.id),
                    Domain::Continuous,
                    0.0,
                    None,
                );
                model.minimize(var, config.penalty_costs.dependency_violation);
                let gap = f64::from(instance.duration(d)) + f64::from(instance.lead_days(d, i));
                model.add_constraint(
                    vec![(starts[i], 1.0), (starts[d], -1.0), (var, 1.0)],
                    Sense::GreaterEq,
                    gap,
                );
                slack.push(Slack {
                    item: i,
                    kind: SlackKind::Dependency {
                        on: dependency.id.clone(),
                    },
                    var,
                });
            }

            if let Some(deadline) = instance.deadline(i) {
                let var = model.add_variable(format!("deadline_slack_{}", item.id), Domain::Continuous, 0.0, None);
                model.minimize(var, config.penalty_per_day(item));
                let latest = (offset(origin, deadline) - i64::from(instance.duration(i))) as f64;
                model.add_constraint(vec![(starts[i], 1.0), (var, -1.0)], Sense::LessEq, latest);
                slack.push(Slack {
                    item: i,
                    kind: SlackKind::Deadline,
                    var,
                });
            }
        }

        if config.max_concurrent < instance.len() {
            slack.extend(limit_concurrency(&mut model, instance, &starts, big_m));
        }

        Self {
            model,
            origin,
            starts,
            slack,
        }
    }

    fn decode(&self, instance: &Instance, values: &[f64]) -> (Schedule, Vec<SlackEntry>) {
        let mut schedule = Schedule::new();
        for (i, &start) in self.starts.iter().enumerate() {
            let start = add_days(self.origin, values[start.index()].round() as i64).unwrap_or(NaiveDate::MAX);
            schedule.add_interval(instance.items()[i].id.clone(), Interval::new(start, instance.duration(i)));
        }

        let slack = self
            .slack
            .iter()
            .filter_map(|slack| {
                let amount = values[slack.var.index()].round() as i64;
                (amount > 0).then(|| SlackEntry {
                    item: instance.items()[slack.item].id.clone(),
                    kind: slack.kind.clone(),
                    amount,
                })
            })
            .collect();

        (schedule, slack)
    }
}

/// Days the item blocks a slot. Zero-length items still take their start day.
fn occupied_days(instance: &Instance, item: usize) -> i64 {
    i64::from(instance.duration(item).max(1))
}

/// Writes every start as `7 · week + weekday` counted from the Monday before
/// `origin`, with `weekday` in Monday to Friday, and keeps starts off blackout dates.
fn restrict_to_working_days(
    model: &mut MilpModel,
    instance: &Instance,
    origin: NaiveDate,
    starts: &[VarId],
    bounds: &[(i64, i64)],
    big_m: f64,
) {
    let blackouts = &instance.config().blackout_dates;
    let shift = f64::from(origin.weekday().num_days_from_monday());

    for (i, item) in instance.items().iter().enumerate() {
        let start = starts[i];
        let week = model.add_variable(format!("week_{}", item.id), Domain::Integer, 0.0, None);
        let weekday = model.add_variable(format!("weekday_{}", item.id), Domain::Integer, 0.0, Some(4.0));
        model.add_constraint(vec![(start, 1.0), (week, -7.0), (weekday, -1.0)], Sense::Equal, -shift);

        let (lower, upper) = bounds[i];
        for &blackout in blackouts {
            if matches!(blackout.weekday(), Weekday::Sat | Weekday::Sun) {
                continue;
            }
            let day = offset(origin, blackout);
            if day < lower || day > upper {
                continue;
            }
            // after = 0: start <= day - 1, after = 1: start >= day + 1
            let after = model.add_variable(
                format!("after_{}_{}", item.id, blackout),
                Domain::Integer,
                0.0,
                Some(1.0),
            );
            let day = day as f64;
            model.add_constraint(vec![(start, 1.0), (after, -big_m)], Sense::LessEq, day - 1.0);
            model.add_constraint(vec![(start, 1.0), (after, -big_m)], Sense::GreaterEq, day + 1.0 - big_m);
        }
    }
}

/// Adds the pairwise ordering of every two items and one excess variable per
/// item bounding the load on its start day. Returns the excess variables.
fn limit_concurrency(model: &mut MilpModel, instance: &Instance, starts: &[VarId], big_m: f64) -> Vec<Slack> {
    let items = instance.items();
    let mut active: Vec<Vec<(VarId, f64)>> = vec![Vec::new(); items.len()];

    for i in 0..items.len() {
        for j in i + 1..items.len() {
            let (a, b) = (&items[i].id, &items[j].id);
            let (start_i, start_j) = (starts[i], starts[j]);
            let occupied_i = occupied_days(instance, i) as f64;
            let occupied_j = occupied_days(instance, j) as f64;

            // first = 1: i starts no later than j, first = 0: j starts strictly earlier.
            let first = model.add_variable(format!("first_{a}_{b}"), Domain::Integer, 0.0, Some(1.0));
            model.add_constraint(vec![(start_i, 1.0), (start_j, -1.0), (first, big_m)], Sense::LessEq, big_m);
            model.add_constraint(vec![(start_j, 1.0), (start_i, -1.0), (first, -big_m)], Sense::LessEq, -1.0);

            // apart = 1: the earlier item ends before the later one starts.
            let apart = model.add_variable(format!("apart_{a}_{b}"), Domain::Integer, 0.0, Some(1.0));
            model.add_constraint(
                vec![(start_j, 1.0), (start_i, -1.0), (apart, -big_m), (first, -big_m)],
                Sense::GreaterEq,
                occupied_i - 2.0 * big_m,
            );
            model.add_constraint(
                vec![(start_i, 1.0), (start_j, -1.0), (apart, -big_m), (first, big_m)],
                Sense::GreaterEq,
                occupied_j - big_m,
            );

            // i is active when j starts: first and not apart.
            let i_on_j = model.add_variable(format!("active_{a}_on_{b}"), Domain::Continuous, 0.0, Some(1.0));
            model.add_constraint(vec![(i_on_j, 1.0), (first, -1.0), (apart, 1.0)], Sense::GreaterEq, 0.0);
            active[j].push((i_on_j, 1.0));

            let j_on_i = model.add_variable(format!("active_{b}_on_{a}"), Domain::Continuous, 0.0, Some(1.0));
            model.add_constraint(vec![(j_on_i, 1.0), (first, 1.0), (apart, 1.0)], Sense::GreaterEq, 1.0);
            active[i].push((j_on_i, 1.0));
        }
    }

    let config = instance.config();
    let others = (config.max_concurrent - 1) as f64;
    active
        .into_iter()
        .enumerate()
        .map(|(j, mut terms)| {
            let var = model.add_variable(format!("resource_slack_{}", items[j].id), Domain::Continuous, 0.0, None);
            model.minimize(var, config.penalty_costs.resource_violation);
            terms.push((var, -1.0));
            model.add_constraint(terms, Sense::LessEq, others);
            Slack {
                item: j,
                kind: SlackKind::Resource,
                var,
            }
        })
        .collect()
}

/// Last day offset any start may take.
fn horizon(instance: &Instance, as_of: NaiveDate, origin: NaiveDate) -> i64 {
    let latest = (0..instance.len())
        .map(|i| instance.earliest_start(i, as_of))
        .chain((0..instance.len()).filter_map(|i| instance.deadline(i)))
        .max()
        .unwrap_or(origin);
    let work: i64 = (0..instance.len())
        .map(|i| {
            let lead: i64 = instance
                .graph()
                .dependencies(i)
                .iter()
                .map(|&d| i64::from(instance.lead_days(d, i)))
                .sum();
            i64::from(instance.duration(i)) + lead
        })
        .sum();
    let padding = i64::from(instance.config().options.horizon_padding_days);
    (offset(origin, latest) + padding + work).min(offset(origin, NaiveDate::MAX))
}

#[cfg(feature = "gurobi")]
fn default_solver() -> Box<dyn MilpSolver> {
    Box::new(super::gurobi::Gurobi)
}

#[cfg(not(feature = "gurobi"))]
fn default_solver() -> Box<dyn MilpSolver> {
    Box::new(Microlp)
}

/// Exact strategy: solves the MILP formulation and falls back to [`Greedy`]
/// when the solver fails, reporting the fallback in the outcome status.
pub struct Optimal {
    solver: Box<dyn MilpSolver>,
    timeout: Duration,
}

impl Optimal {
    #[must_use]
    pub fn new(solver: Box<dyn MilpSolver>, timeout: Duration) -> Self {
        Self { solver, timeout }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(default_solver(), config.options.milp_timeout())
    }

    fn fallback(instance: &Instance, as_of: NaiveDate, reason: FallbackReason) -> Outcome {
        warn!(%reason, "exact solve failed, falling back to greedy");
        Greedy.schedule(instance, as_of).into_fallback(reason)
    }
}

impl Default for Optimal {
    fn default() -> Self {
        Self::new(Box::new(Microlp), Config::default().options.milp_timeout())
    }
}

impl std::fmt::Debug for Optimal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Optimal")
            .field("solver", &self.solver.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Scheduler for Optimal {
    fn schedule(&mut self, instance: &Instance, as_of: NaiveDate) -> Outcome {
        if instance.is_empty() {
            return Outcome::complete(Schedule::new());
        }

        let formulation = Formulation::build(instance, as_of);
        let values = match self.solver.solve(&formulation.model, self.timeout) {
            SolveOutcome::Optimal(values) => values,
            SolveOutcome::Feasible(values) => {
                info!("time limit reached, using best feasible solution");
                values
            }
            SolveOutcome::Infeasible => return Self::fallback(instance, as_of, FallbackReason::Infeasible),
            SolveOutcome::Unbounded => return Self::fallback(instance, as_of, FallbackReason::Unbounded),
            SolveOutcome::TimedOut => return Self::fallback(instance, as_of, FallbackReason::TimedOut),
            SolveOutcome::Failed(message) => {
                return Self::fallback(instance, as_of, FallbackReason::SolverError(message))
            }
        };

        if values.len() != formulation.model.variables().len() {
            let message = format!(
                "expected {} values, got {}",
                formulation.model.variables().len(),
                values.len()
            );
            return Self::fallback(instance, as_of, FallbackReason::SolverError(message));
        }

        let (schedule, slack) = formulation.decode(instance, &values);
        info!(
            solver = self.solver.name(),
            objective = formulation.model.objective_value(&values),
            relaxed = slack.len(),
            "exact schedule found"
        );
        Outcome::complete(schedule).with_slack(slack)
    }

    fn name(&self) -> &'static str {
        "optimal"
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::{validate, Item, ItemKind, Venue, VenueCategory};
    use crate::data::samples::{self, day};

    struct Scripted(SolveOutcome);

    impl MilpSolver for Scripted {
        fn solve(&self, _: &MilpModel, _: Duration) -> SolveOutcome {
            self.0.clone()
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn optimal() -> Optimal {
        Optimal::new(Box::new(Microlp), Duration::from_secs(30))
    }

    #[test]
    fn test_optimal() {
        assert!(samples::verify(&mut optimal(), false).is_ok());
    }

    #[test]
    fn dependent_paper_follows_its_dependency() -> anyhow::Result<()> {
        let instance = samples::two_papers()?;
        let outcome = optimal().schedule(&instance, day(0));

        assert!(outcome.is_complete());
        assert!(outcome.slack.is_empty());
        assert_eq!(outcome.schedule.get("A").map(Interval::start), Some(day(0)));
        assert_eq!(outcome.schedule.get("B").map(Interval::start), Some(day(90)));
        Ok(())
    }

    #[test]
    fn unreachable_deadline_is_relaxed() -> anyhow::Result<()> {
        let instance = samples::unreachable_deadline()?;
        let outcome = optimal().schedule(&instance, day(0));

        assert!(outcome.is_complete());
        let late = outcome.slack.iter().find(|slack| slack.item == "late");
        assert!(late.is_some_and(|slack| slack.kind == SlackKind::Deadline && slack.amount > 0));
        Ok(())
    }

    #[test]
    fn identical_items_run_one_at_a_time() -> anyhow::Result<()> {
        let instance = samples::identical_items(3, 1)?;
        let outcome = optimal().schedule(&instance, day(0));

        assert!(outcome.is_complete());
        assert!(outcome.slack.is_empty(), "{:?}", outcome.slack);
        for offset in 0..90 {
            assert_eq!(outcome.schedule.load_on(day(offset)), 1, "day {offset}");
        }
        assert!(validate(&outcome.schedule, &instance).resources.violations.is_empty());
        Ok(())
    }

    #[test]
    fn overlap_is_charged_as_resource_slack() -> anyhow::Result<()> {
        let venue = Venue::new("conf", VenueCategory::Medical).with_deadline(ItemKind::Poster, day(30));
        let items = vec![
            Item::new("first", ItemKind::Poster).with_venue("conf"),
            Item::new("second", ItemKind::Poster).with_venue("conf"),
        ];
        let instance = Instance::new(items, vec![venue], Config::with_max_concurrent(1))?;
        let outcome = optimal().schedule(&instance, day(0));

        assert!(outcome.is_complete());
        assert_eq!(
            outcome.slack,
            [SlackEntry {
                item: "second".into(),
                kind: SlackKind::Resource,
                amount: 1,
            }]
        );
        let report = validate(&outcome.schedule, &instance);
        assert!(report.deadlines.violations.is_empty());
        assert_eq!(report.resources.peak_load, 2);
        Ok(())
    }

    #[test]
    fn starts_only_on_working_days() -> anyhow::Result<()> {
        let items = vec![Item::new("w", ItemKind::WorkItem).with_earliest_start(day(5))];
        let mut config = Config::default();
        config.options.working_days_only = true;
        let instance = Instance::new(items.clone(), Vec::new(), config.clone())?;
        let outcome = optimal().schedule(&instance, day(0));

        assert!(outcome.is_complete());
        assert_eq!(outcome.schedule.get("w").map(Interval::start), Some(day(7)));
        assert!(validate(&outcome.schedule, &instance).is_valid);

        config.blackout_dates.insert(day(7));
        let instance = Instance::new(items, Vec::new(), config)?;
        let outcome = optimal().schedule(&instance, day(0));
        assert_eq!(outcome.schedule.get("w").map(Interval::start), Some(day(8)));
        Ok(())
    }

    #[test]
    fn infeasible_solve_falls_back_to_greedy() -> anyhow::Result<()> {
        let instance = samples::two_papers()?;
        let mut scheduler = Optimal::new(Box::new(Scripted(SolveOutcome::Infeasible)), Duration::from_secs(1));
        let outcome = scheduler.schedule(&instance, day(0));

        assert!(outcome.is_fallback());
        assert_eq!(outcome.schedule, Greedy.schedule(&instance, day(0)).schedule);
        assert!(matches!(
            outcome.status,
            crate::core::Status::Fallback {
                reason: FallbackReason::Infeasible,
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn timeout_falls_back_to_greedy() -> anyhow::Result<()> {
        let instance = samples::two_papers()?;
        let mut scheduler = Optimal::new(Box::new(Scripted(SolveOutcome::TimedOut)), Duration::from_secs(1));
        let outcome = scheduler.schedule(&instance, day(0));

        assert!(matches!(
            outcome.status,
            crate::core::Status::Fallback {
                reason: FallbackReason::TimedOut,
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn malformed_solution_falls_back() -> anyhow::Result<()> {
        let instance = samples::two_papers()?;
        let mut scheduler = Optimal::new(Box::new(Scripted(SolveOutcome::Optimal(vec![0.0]))), Duration::from_secs(1));
        assert!(scheduler.schedule(&instance, day(0)).is_fallback());
        Ok(())
    }
}
