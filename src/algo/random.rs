use super::engine::{simulate, Policy};
use crate::core::{Config, Instance, Outcome};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

fn rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}

/// Admits ready items in random order.
///
/// The generator is reseeded at the start of every run, so a fixed seed gives identical schedules.
#[derive(Clone, Debug)]
pub struct Random {
    seed: Option<u64>,
    rng: StdRng,
}

impl Random {
    #[must_use]
    pub fn new(seed: Option<u64>) -> Self {
        Self { seed, rng: rng(seed) }
    }
}

impl Default for Random {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Policy for Random {
    fn rank(&mut self, _: &Instance, _: NaiveDate, ready: &mut Vec<usize>) {
        ready.shuffle(&mut self.rng);
    }
}

impl crate::core::Scheduler for Random {
    fn schedule(&mut self, instance: &Instance, as_of: NaiveDate) -> Outcome {
        self.rng = rng(self.seed);
        simulate(self, instance, as_of)
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

/// Greedy ranking with uniform noise of at most `randomness` added to every score.
#[derive(Clone, Debug)]
pub struct Stochastic {
    seed: Option<u64>,
    randomness: f64,
    rng: StdRng,
}

impl Stochastic {
    #[must_use]
    pub fn new(seed: Option<u64>, randomness: f64) -> Self {
        Self {
            seed,
            randomness,
            rng: rng(seed),
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.options.seed, config.options.randomness_factor)
    }
}

impl Default for Stochastic {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Policy for Stochastic {
    fn rank(&mut self, instance: &Instance, _: NaiveDate, ready: &mut Vec<usize>) {
        let config = instance.config();
        let noise: Vec<f64> = if self.randomness > 0.0 {
            let range = -self.randomness..=self.randomness;
            ready.iter().map(|_| self.rng.gen_range(range.clone())).collect()
        } else {
            vec![0.0; ready.len()]
        };

        let mut scored: Vec<(usize, f64)> = ready
            .iter()
            .zip(noise)
            .map(|(&i, noise)| (i, config.priority(&instance.items()[i]) + noise))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        ready.clear();
        ready.extend(scored.into_iter().map(|(i, _)| i));
    }
}

impl crate::core::Scheduler for Stochastic {
    fn schedule(&mut self, instance: &Instance, as_of: NaiveDate) -> Outcome {
        self.rng = rng(self.seed);
        simulate(self, instance, as_of)
    }

    fn name(&self) -> &'static str {
        "stochastic"
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::algo::Greedy;
    use crate::core::Scheduler;
    use crate::data::samples::{self, day};

    #[test]
    fn test_random() {
        assert!(samples::verify(&mut Random::new(Some(0)), true).is_ok());
    }

    #[test]
    fn test_stochastic() {
        assert!(samples::verify(&mut Stochastic::new(Some(0), 0.1), true).is_ok());
    }

    #[test]
    fn seeded_runs_are_identical() -> anyhow::Result<()> {
        let instance = samples::portfolio()?;
        let mut random = Random::new(Some(42));
        let first = random.schedule(&instance, day(0));
        let second = random.schedule(&instance, day(0));
        assert_eq!(
            crate::data::to_string(&first)?,
            crate::data::to_string(&Random::new(Some(42)).schedule(&instance, day(0)))?
        );
        assert_eq!(first, second);

        let mut stochastic = Stochastic::new(Some(7), 0.1);
        assert_eq!(
            stochastic.schedule(&instance, day(0)),
            stochastic.schedule(&instance, day(0))
        );
        Ok(())
    }

    #[test]
    fn noiseless_stochastic_matches_greedy() -> anyhow::Result<()> {
        let instance = samples::portfolio()?;
        let stochastic = Stochastic::new(Some(1), 0.0).schedule(&instance, day(0));
        assert_eq!(stochastic, Greedy.schedule(&instance, day(0)));
        Ok(())
    }
}
