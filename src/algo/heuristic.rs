use super::engine::{simulate, Policy};
use crate::core::constraints::latest_start;
use crate::core::{HeuristicRule, Instance, Outcome};
use chrono::NaiveDate;
use std::cmp::Reverse;

/// Ranks ready items by one named rule.
#[derive(Clone, Copy, Debug, Default)]
pub struct Heuristic {
    rule: HeuristicRule,
}

impl Heuristic {
    #[must_use]
    pub const fn new(rule: HeuristicRule) -> Self {
        Self { rule }
    }

    #[must_use]
    pub const fn rule(&self) -> HeuristicRule {
        self.rule
    }
}

/// Orders items by the rule. Items without a deadline go last for the deadline rules.
fn rank(rule: HeuristicRule, instance: &Instance, ready: &mut [usize]) {
    let graph = instance.graph();
    match rule {
        HeuristicRule::EarliestDeadline => ready.sort_by_key(|&i| {
            let deadline = instance.deadline(i);
            (deadline.is_none(), deadline)
        }),
        HeuristicRule::LatestStart => ready.sort_by_key(|&i| {
            let latest = latest_start(instance, i, 0);
            (latest.is_none(), Reverse(latest))
        }),
        HeuristicRule::ShortestProcessingTime => ready.sort_by_key(|&i| instance.duration(i)),
        HeuristicRule::LongestProcessingTime => ready.sort_by_key(|&i| Reverse(instance.duration(i))),
        HeuristicRule::CriticalPath => ready.sort_by_key(|&i| Reverse(graph.dependent_count(i))),
    }
}

impl Policy for Heuristic {
    fn rank(&mut self, instance: &Instance, _: NaiveDate, ready: &mut Vec<usize>) {
        rank(self.rule, instance, ready);
    }
}

impl crate::core::Scheduler for Heuristic {
    fn schedule(&mut self, instance: &Instance, as_of: NaiveDate) -> Outcome {
        simulate(self, instance, as_of)
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::{Config, Item, ItemKind, Venue, VenueCategory};
    use crate::data::samples::{self, day};

    #[test]
    fn test_heuristic() {
        for rule in HeuristicRule::ALL {
            assert!(samples::verify(&mut Heuristic::new(rule), true).is_ok(), "{rule:?}");
        }
    }

    fn instance() -> anyhow::Result<Instance> {
        let venue = Venue::new("conf", VenueCategory::Medical)
            .with_deadline(ItemKind::Paper, day(300))
            .with_deadline(ItemKind::Poster, day(100));
        let items = vec![
            Item::new("w", ItemKind::WorkItem),
            Item::new("p", ItemKind::Paper).with_venue("conf"),
            Item::new("q", ItemKind::Poster).with_venue("conf"),
            Item::new("d1", ItemKind::Abstract).with_dependency("w"),
            Item::new("d2", ItemKind::Abstract).with_dependency("w"),
        ];
        Ok(Instance::new(items, vec![venue], Config::default())?)
    }

    fn ranked(rule: HeuristicRule, instance: &Instance) -> Vec<&str> {
        let mut ready = vec![0, 1, 2];
        rank(rule, instance, &mut ready);
        ready.iter().map(|&i| instance.items()[i].id.as_str()).collect()
    }

    #[test]
    fn rules_order_ready_items() -> anyhow::Result<()> {
        let instance = instance()?;
        assert_eq!(ranked(HeuristicRule::EarliestDeadline, &instance), ["q", "p", "w"]);
        assert_eq!(ranked(HeuristicRule::LatestStart, &instance), ["p", "q", "w"]);
        assert_eq!(ranked(HeuristicRule::ShortestProcessingTime, &instance), ["w", "q", "p"]);
        assert_eq!(ranked(HeuristicRule::LongestProcessingTime, &instance), ["p", "q", "w"]);
        assert_eq!(ranked(HeuristicRule::CriticalPath, &instance), ["w", "p", "q"]);
        Ok(())
    }
}
