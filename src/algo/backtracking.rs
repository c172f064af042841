use super::engine::{simulate, Backtracking as Limits, Policy};
use super::greedy::rank_by_priority;
use crate::core::{Config, Instance, Outcome};
use chrono::NaiveDate;

/// Greedy ranking that resolves stalled days by moving an active item earlier.
#[derive(Clone, Copy, Debug)]
pub struct Backtracking {
    limits: Limits,
}

impl Backtracking {
    #[must_use]
    pub const fn new(max_moves: usize, window_days: u32) -> Self {
        Self {
            limits: Limits {
                max_moves,
                window_days,
            },
        }
    }

    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self::new(config.options.max_backtracks, config.options.backtrack_window_days)
    }
}

impl Default for Backtracking {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Policy for Backtracking {
    fn rank(&mut self, instance: &Instance, _: NaiveDate, ready: &mut Vec<usize>) {
        rank_by_priority(instance, ready);
    }

    fn backtracking(&self) -> Option<Limits> {
        Some(self.limits)
    }
}

impl crate::core::Scheduler for Backtracking {
    fn schedule(&mut self, instance: &Instance, as_of: NaiveDate) -> Outcome {
        simulate(self, instance, as_of)
    }

    fn name(&self) -> &'static str {
        "backtracking"
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::algo::Greedy;
    use crate::core::{Interval, Item, ItemKind, Scheduler, Venue, VenueCategory};
    use crate::data::samples::{self, day};

    #[test]
    fn test_backtracking() {
        assert!(samples::verify(&mut Backtracking::default(), true).is_ok());
    }

    #[test]
    fn matches_greedy_without_stalls() -> anyhow::Result<()> {
        let instance = samples::two_papers()?;
        let greedy = Greedy.schedule(&instance, day(0));
        let backtracking = Backtracking::default().schedule(&instance, day(0));
        assert_eq!(greedy, backtracking);
        Ok(())
    }

    /// Abstract `a` is placed early on day 30 and blocks `w3`, which would
    /// otherwise start on day 30, until backtracking moves `a` to day 29.
    fn blocked_by_early_abstract() -> anyhow::Result<Instance> {
        let venue = Venue::new("conf", VenueCategory::Medical).with_deadline(ItemKind::Abstract, day(60));
        let items = vec![
            Item::new("a", ItemKind::Abstract).with_venue("conf"),
            Item::new("w1", ItemKind::WorkItem),
            Item::new("w2", ItemKind::WorkItem),
            Item::new("w3", ItemKind::WorkItem),
        ];
        let mut config = Config::with_max_concurrent(1);
        config.options.early_abstract_scheduling = true;
        Ok(Instance::new(items, vec![venue], config)?)
    }

    #[test]
    fn stalled_day_moves_active_item_earlier() -> anyhow::Result<()> {
        let instance = blocked_by_early_abstract()?;
        let outcome = Backtracking::new(5, 30).schedule(&instance, day(0));

        assert!(outcome.is_complete());
        assert_eq!(outcome.schedule.get("a").map(Interval::start), Some(day(29)));
        assert_eq!(outcome.schedule.get("w2").map(Interval::start), Some(day(14)));
        assert_eq!(outcome.schedule.get("w3").map(Interval::start), Some(day(30)));
        assert!(crate::core::validate(&outcome.schedule, &instance).is_valid);

        let greedy = Greedy.schedule(&instance, day(0));
        assert_eq!(greedy.schedule.get("a").map(Interval::start), Some(day(30)));
        assert_eq!(greedy.schedule.get("w3").map(Interval::start), Some(day(31)));
        Ok(())
    }

    #[test]
    fn no_moves_without_budget() -> anyhow::Result<()> {
        let instance = blocked_by_early_abstract()?;
        let outcome = Backtracking::new(0, 30).schedule(&instance, day(0));
        assert_eq!(outcome, Greedy.schedule(&instance, day(0)));
        Ok(())
    }
}
