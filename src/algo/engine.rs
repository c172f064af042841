//! Day-by-day simulation shared by the greedy family of strategies.
//!
//! On every simulated date the engine collects the ready items in topological
//! order, lets the strategy rank them and admits them in that order until the
//! concurrency limit is reached. Strategies only decide the ranking, the
//! deadline buffer and whether stalls are resolved by backtracking.

use crate::core::calendar::{add_days, days, is_working_day, offset};
use crate::core::constraints::{dependencies_satisfied, latest_start, Gate};
use crate::core::{Instance, Interval, ItemKind, Outcome, PartialReason, Schedule};
use chrono::NaiveDate;
use tracing::{debug, info, warn};

/// Limits of the backtracking step.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Backtracking {
    /// Moves allowed per run.
    pub max_moves: usize,
    /// How far back an active item may be moved, in days.
    pub window_days: u32,
}

/// Strategy-specific part of the simulation.
pub trait Policy {
    /// Orders the ready items, most urgent first. `ready` arrives in topological order.
    fn rank(&mut self, instance: &Instance, date: NaiveDate, ready: &mut Vec<usize>);

    /// Days every deadline is moved forward by before the admission test.
    fn deadline_buffer_days(&self) -> u32 {
        0
    }

    /// Whether and how far a stalled day may move active items earlier.
    fn backtracking(&self) -> Option<Backtracking> {
        None
    }
}

/// Sorts items by descending score. Equal scores keep their order.
pub fn sort_by_score(ready: &mut [usize], score: impl Fn(usize) -> f64) {
    ready.sort_by(|&a, &b| score(b).total_cmp(&score(a)));
}

struct Simulation<'a> {
    instance: &'a Instance,
    gate: Gate<'a>,
    schedule: Schedule,
    scheduled: Vec<bool>,
}

impl<'a> Simulation<'a> {
    fn new(instance: &'a Instance, as_of: NaiveDate, buffer: u32) -> Self {
        Self {
            instance,
            gate: Gate {
                instance,
                as_of,
                deadline_buffer_days: buffer,
            },
            schedule: Schedule::new(),
            scheduled: vec![false; instance.len()],
        }
    }

    fn working(&self, date: NaiveDate) -> bool {
        let config = self.instance.config();
        !config.options.working_days_only || is_working_day(date, &config.blackout_dates)
    }

    fn admit(&mut self, item: usize, start: NaiveDate) {
        let id = &self.instance.items()[item].id;
        let interval = Interval::new(start, self.instance.duration(item));
        debug!(item = %id, %start, end = %interval.end(), "admitted");
        self.schedule.add_interval(id.clone(), interval);
        self.scheduled[item] = true;
    }

    /// Places abstracts a fixed number of days before their deadline.
    fn schedule_abstracts_early(&mut self) {
        let instance = self.instance;
        let advance = days(instance.config().options.abstract_advance_days);

        for &i in instance.graph().order() {
            if instance.items()[i].kind != ItemKind::Abstract {
                continue;
            }
            let Some(deadline) = instance.deadline(i) else {
                continue;
            };
            let start = deadline - advance;
            if self.working(start) && self.gate.admits_on(i, start, &self.schedule) {
                self.admit(i, start);
            }
        }
    }

    /// Marks unscheduled items that can no longer be placed on or after `date`.
    /// Returns the number of unscheduled items that still can.
    fn live_items(&self, date: NaiveDate, dead: &mut [bool]) -> usize {
        let instance = self.instance;
        let buffer = self.gate.deadline_buffer_days;
        let mut live = 0;

        for &i in instance.graph().order() {
            if self.scheduled[i] {
                continue;
            }
            dead[i] = latest_start(instance, i, buffer).is_some_and(|latest| latest < date)
                || instance.graph().dependencies(i).iter().any(|&d| dead[d]);
            if !dead[i] {
                live += 1;
            }
        }
        live
    }

    fn ready(&self, date: NaiveDate) -> Vec<usize> {
        let instance = self.instance;
        let as_of = self.gate.as_of;

        instance
            .graph()
            .order()
            .iter()
            .copied()
            .filter(|&i| {
                !self.scheduled[i]
                    && instance.earliest_start(i, as_of) <= date
                    && dependencies_satisfied(instance, i, &self.schedule, date)
            })
            .collect()
    }

    /// Moves one item active on `date` earlier so that it no longer occupies `date`.
    /// Tries items in id order and the smallest sufficient move first.
    fn backtrack(&mut self, date: NaiveDate, window_days: u32) -> bool {
        let instance = self.instance;
        let active: Vec<(String, Interval)> = self
            .schedule
            .iter()
            .filter(|(_, interval)| interval.contains(date))
            .map(|(id, interval)| (id.to_owned(), *interval))
            .collect();

        for (id, interval) in active {
            let Some(item) = instance.position(&id) else {
                continue;
            };
            let needed = offset(date, interval.occupied_until());
            for shift in needed..=i64::from(window_days) {
                let Some(start) = add_days(interval.start(), -shift) else {
                    break;
                };
                let moved = Interval::new(start, instance.duration(item));
                if self.working(start) && self.gate.admits(item, &moved, &self.schedule) {
                    debug!(item = %id, from = %interval.start(), to = %start, "moved earlier");
                    self.schedule.add_interval(id, moved);
                    return true;
                }
            }
        }
        false
    }
}

/// First date worth simulating and the last date the simulation may reach.
fn horizon(instance: &Instance, as_of: NaiveDate) -> (NaiveDate, NaiveDate) {
    let config = instance.config();
    let starts = (0..instance.len()).map(|i| instance.earliest_start(i, as_of));
    let first = starts.clone().min().unwrap_or(as_of);
    let latest = starts
        .chain((0..instance.len()).filter_map(|i| instance.deadline(i)))
        .max()
        .unwrap_or(as_of);

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
    let span = work + i64::from(config.options.horizon_padding_days);

    (first, add_days(latest, span).unwrap_or(NaiveDate::MAX))
}

/// Runs the simulation with the given policy.
pub fn simulate(policy: &mut impl Policy, instance: &Instance, as_of: NaiveDate) -> Outcome {
    let options = &instance.config().options;
    let limit = instance.config().max_concurrent;
    let mut simulation = Simulation::new(instance, as_of, policy.deadline_buffer_days());

    if options.early_abstract_scheduling {
        simulation.schedule_abstracts_early();
    }

    let (first, last) = horizon(instance, as_of);
    let backtracking = policy.backtracking();
    let mut dead = vec![false; instance.len()];
    let mut date = first;
    let mut iterations = 0;
    let mut moves = 0;

    let reason = loop {
        if simulation.live_items(date, &mut dead) == 0 {
            break PartialReason::NoValidStart;
        }
        if date > last {
            break PartialReason::HorizonExhausted;
        }
        if iterations == options.max_iterations {
            break PartialReason::IterationLimit;
        }
        iterations += 1;

        if !simulation.working(date) {
            let Some(next) = date.succ_opt() else {
                break PartialReason::HorizonExhausted;
            };
            date = next;
            continue;
        }

        let mut ready = simulation.ready(date);
        policy.rank(instance, date, &mut ready);

        let mut admitted = 0;
        for &item in &ready {
            if simulation.schedule.load_on(date) >= limit {
                break;
            }
            if simulation.gate.admits_on(item, date, &simulation.schedule) {
                simulation.admit(item, date);
                admitted += 1;
            }
        }

        if let Some(limits) = backtracking {
            let stalled = admitted == 0 && !ready.is_empty() && simulation.schedule.load_on(date) > 0;
            if stalled && moves < limits.max_moves && simulation.backtrack(date, limits.window_days) {
                moves += 1;
                continue;
            }
        }

        let Some(next) = date.succ_opt() else {
            break PartialReason::HorizonExhausted;
        };
        date = next;
    };

    let unscheduled: Vec<String> = instance
        .items()
        .iter()
        .zip(&simulation.scheduled)
        .filter(|&(_, &scheduled)| !scheduled)
        .map(|(item, _)| item.id.clone())
        .collect();

    if unscheduled.is_empty() {
        info!(items = instance.len(), iterations, moves, "scheduled every item");
    } else {
        warn!(?unscheduled, ?reason, iterations, "partial schedule");
    }

    Outcome::new(simulation.schedule, unscheduled, reason)
}
