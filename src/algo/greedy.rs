use super::engine::{simulate, sort_by_score, Policy};
use crate::core::{Instance, Outcome};
use chrono::NaiveDate;

/// Ranks ready items by the static priority weight of their kind.
pub(super) fn rank_by_priority(instance: &Instance, ready: &mut [usize]) {
    let config = instance.config();
    sort_by_score(ready, |i| config.priority(&instance.items()[i]));
}

/// Admits ready items by descending priority weight.
#[derive(Clone, Copy, Debug, Default)]
pub struct Greedy;

impl Policy for Greedy {
    fn rank(&mut self, instance: &Instance, _: NaiveDate, ready: &mut Vec<usize>) {
        rank_by_priority(instance, ready);
    }
}

impl crate::core::Scheduler for Greedy {
    fn schedule(&mut self, instance: &Instance, as_of: NaiveDate) -> Outcome {
        simulate(self, instance, as_of)
    }

    fn name(&self) -> &'static str {
        "greedy"
    }
}
