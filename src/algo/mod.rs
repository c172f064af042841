mod backtracking;
pub mod engine;
mod greedy;
#[cfg(feature = "gurobi")]
mod gurobi;
mod heuristic;
mod lookahead;
pub mod milp;
mod optimal;
mod random;

use crate::core::{Config, ConfigError, Scheduler};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub use backtracking::Backtracking;
pub use greedy::Greedy;
#[cfg(feature = "gurobi")]
pub use gurobi::Gurobi;
pub use heuristic::Heuristic;
pub use lookahead::Lookahead;
pub use optimal::Optimal;
pub use random::{Random, Stochastic};

/// Identifier of a scheduling strategy.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Greedy,
    Backtracking,
    Heuristic,
    Lookahead,
    Random,
    Stochastic,
    Optimal,
}

impl StrategyKind {
    /// Every strategy, in registry order.
    pub const ALL: [Self; 7] = [
        Self::Greedy,
        Self::Backtracking,
        Self::Heuristic,
        Self::Lookahead,
        Self::Random,
        Self::Stochastic,
        Self::Optimal,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Greedy => "greedy",
            Self::Backtracking => "backtracking",
            Self::Heuristic => "heuristic",
            Self::Lookahead => "lookahead",
            Self::Random => "random",
            Self::Stochastic => "stochastic",
            Self::Optimal => "optimal",
        }
    }

    /// Whether the strategy runs the day-by-day simulation and so never breaks a hard constraint.
    #[must_use]
    pub const fn is_greedy_family(self) -> bool {
        !matches!(self, Self::Optimal)
    }
}

impl Display for StrategyKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ConfigError::UnknownStrategy(s.into()))
    }
}

/// Builds a scheduler from the configuration.
pub type Constructor = fn(&Config) -> Box<dyn Scheduler>;

/// Every strategy with its constructor.
pub static SCHEDULERS: [(StrategyKind, Constructor); 7] = [
    (StrategyKind::Greedy, |_| Box::new(Greedy)),
    (StrategyKind::Backtracking, |config| Box::new(Backtracking::from_config(config))),
    (StrategyKind::Heuristic, |config| Box::new(Heuristic::new(config.options.heuristic))),
    (StrategyKind::Lookahead, |config| Box::new(Lookahead::from_config(config))),
    (StrategyKind::Random, |config| Box::new(Random::new(config.options.seed))),
    (StrategyKind::Stochastic, |config| Box::new(Stochastic::from_config(config))),
    (StrategyKind::Optimal, |config| Box::new(Optimal::from_config(config))),
];

/// Creates the scheduler of the given kind.
#[must_use]
pub fn create(kind: StrategyKind, config: &Config) -> Box<dyn Scheduler> {
    let Some((_, constructor)) = SCHEDULERS.iter().find(|(registered, _)| *registered == kind) else {
        unreachable!("Strategy {kind} is not registered");
    };
    constructor(config)
}
