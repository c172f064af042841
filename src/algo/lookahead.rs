use super::engine::{simulate, sort_by_score, Policy};
use crate::core::{Config, Instance, Outcome};
use chrono::NaiveDate;

/// Greedy ranking with a bonus for items that unblock others,
/// admitting only items that finish a buffer ahead of their deadline.
#[derive(Clone, Copy, Debug)]
pub struct Lookahead {
    bonus: f64,
    buffer_days: u32,
}

impl Lookahead {
    #[must_use]
    pub const fn new(bonus: f64, buffer_days: u32) -> Self {
        Self { bonus, buffer_days }
    }

    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self::new(config.options.lookahead_bonus, config.options.lookahead_buffer_days)
    }
}

impl Default for Lookahead {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Policy for Lookahead {
    #[allow(clippy::cast_precision_loss)]
    fn rank(&mut self, instance: &Instance, _: NaiveDate, ready: &mut Vec<usize>) {
        let config = instance.config();
        let graph = instance.graph();
        sort_by_score(ready, |i| {
            config.priority(&instance.items()[i]) + self.bonus * graph.dependent_count(i) as f64
        });
    }

    fn deadline_buffer_days(&self) -> u32 {
        self.buffer_days
    }
}

impl crate::core::Scheduler for Lookahead {
    fn schedule(&mut self, instance: &Instance, as_of: NaiveDate) -> Outcome {
        simulate(self, instance, as_of)
    }

    fn name(&self) -> &'static str {
        "lookahead"
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::{Interval, Item, ItemKind, Scheduler, Venue, VenueCategory};
    use crate::data::samples::{self, day};

    #[test]
    fn test_lookahead() {
        assert!(samples::verify(&mut Lookahead::default(), true).is_ok());
    }

    #[test]
    fn unblocking_item_goes_first() -> anyhow::Result<()> {
        let items = vec![
            Item::new("abstract", ItemKind::Abstract),
            Item::new("poster", ItemKind::Poster),
            Item::new("paper", ItemKind::Paper).with_dependency("abstract"),
            Item::new("talk", ItemKind::Poster).with_dependency("abstract"),
        ];
        let instance = Instance::new(items, Vec::new(), Config::with_max_concurrent(1))?;
        let outcome = Lookahead::default().schedule(&instance, day(0));

        assert_eq!(outcome.schedule.get("abstract").map(Interval::start), Some(day(0)));
        assert_eq!(outcome.schedule.get("poster").map(Interval::start), Some(day(1)));
        Ok(())
    }

    #[test]
    fn buffer_rejects_flush_deadlines() -> anyhow::Result<()> {
        let venue = Venue::new("conf", VenueCategory::Medical).with_deadline(ItemKind::Poster, day(40));
        let items = vec![Item::new("p", ItemKind::Poster).with_venue("conf")];
        let instance = Instance::new(items, vec![venue], Config::default())?;

        assert!(Lookahead::new(0.5, 0).schedule(&instance, day(0)).is_complete());
        let buffered = Lookahead::new(0.5, 30).schedule(&instance, day(0));
        assert_eq!(buffered.unscheduled(), ["p"]);
        Ok(())
    }
}
