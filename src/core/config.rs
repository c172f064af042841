use super::{ConfigError, Item, ItemKind, DAYS_PER_MONTH, DurationPolicy};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;

/// Longest duration, lead time or day offset an instance may configure.
pub const MAX_SPAN_DAYS: u32 = 36_500;

/// One value per item kind.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct KindTable<T> {
    #[serde(rename = "abstract")]
    pub abstract_: T,
    pub paper: T,
    pub poster: T,
    pub work_item: T,
}

impl<T: Copy> KindTable<T> {
    /// Returns the value for the given kind.
    #[must_use]
    pub const fn get(&self, kind: ItemKind) -> T {
        match kind {
            ItemKind::Abstract => self.abstract_,
            ItemKind::Paper => self.paper,
            ItemKind::Poster => self.poster,
            ItemKind::WorkItem => self.work_item,
        }
    }
}

impl Default for KindTable<u32> {
    fn default() -> Self {
        Self {
            abstract_: 0,
            paper: 90,
            poster: 30,
            work_item: 14,
        }
    }
}

/// Extra days a `before` item must wait after an `after` dependency completes.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct LeadTime {
    pub after: ItemKind,
    pub before: ItemKind,
    pub days: u32,
}

/// Static ranking weights, looked up by kind and engineering flag.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct PriorityWeights {
    pub engineering_paper: f64,
    pub medical_paper: f64,
    pub work_item: f64,
    pub poster: f64,
    #[serde(rename = "abstract")]
    pub abstract_: f64,
}

impl Default for PriorityWeights {
    fn default() -> Self {
        Self {
            engineering_paper: 2.0,
            medical_paper: 1.0,
            work_item: 1.5,
            poster: 1.0,
            abstract_: 0.5,
        }
    }
}

/// Costs charged for constraint violations.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct PenaltyCosts {
    /// Per day late, for items without their own cost.
    pub default_per_day: f64,
    /// Per day late for work items without their own cost.
    pub work_item_per_day: f64,
    /// Per violated dependency.
    pub dependency_violation: f64,
    /// Per item above the concurrency limit, per day.
    pub resource_violation: f64,
}

impl Default for PenaltyCosts {
    fn default() -> Self {
        Self {
            default_per_day: 2000.0,
            work_item_per_day: 1000.0,
            dependency_violation: 200.0,
            resource_violation: 200.0,
        }
    }
}

/// Ranking rule used by the heuristic strategy.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicRule {
    #[default]
    EarliestDeadline,
    LatestStart,
    ShortestProcessingTime,
    LongestProcessingTime,
    CriticalPath,
}

impl HeuristicRule {
    pub const ALL: [Self; 5] = [
        Self::EarliestDeadline,
        Self::LatestStart,
        Self::ShortestProcessingTime,
        Self::LongestProcessingTime,
        Self::CriticalPath,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::EarliestDeadline => "earliest_deadline",
            Self::LatestStart => "latest_start",
            Self::ShortestProcessingTime => "shortest_processing_time",
            Self::LongestProcessingTime => "longest_processing_time",
            Self::CriticalPath => "critical_path",
        }
    }
}

impl FromStr for HeuristicRule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|rule| rule.name() == s)
            .ok_or_else(|| ConfigError::UnknownHeuristic(s.into()))
    }
}

/// Named switches and knobs of the scheduling strategies.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct SchedulingOptions {
    /// Skip weekends and blackout dates in the day loop.
    pub working_days_only: bool,
    /// Place abstracts `abstract_advance_days` before their deadline ahead of the day loop.
    pub early_abstract_scheduling: bool,
    pub abstract_advance_days: u32,
    pub max_backtracks: usize,
    pub backtrack_window_days: u32,
    pub lookahead_buffer_days: u32,
    pub lookahead_bonus: f64,
    pub randomness_factor: f64,
    pub heuristic: HeuristicRule,
    /// Seed of the random and stochastic strategies. Absent means entropy.
    pub seed: Option<u64>,
    /// Hard bound on day-loop iterations.
    pub max_iterations: usize,
    /// Days added past the last relevant date when sizing the horizon.
    pub horizon_padding_days: u32,
    pub milp_timeout_secs: u64,
    pub auto_assign_venues: bool,
}

impl Default for SchedulingOptions {
    fn default() -> Self {
        Self {
            working_days_only: false,
            early_abstract_scheduling: false,
            abstract_advance_days: 30,
            max_backtracks: 5,
            backtrack_window_days: 30,
            lookahead_buffer_days: 30,
            lookahead_bonus: 0.5,
            randomness_factor: 0.1,
            heuristic: HeuristicRule::EarliestDeadline,
            seed: None,
            max_iterations: 50_000,
            horizon_padding_days: 90,
            milp_timeout_secs: 60,
            auto_assign_venues: false,
        }
    }
}

impl SchedulingOptions {
    #[must_use]
    pub const fn milp_timeout(&self) -> Duration {
        Duration::from_secs(self.milp_timeout_secs)
    }
}

/// Global scheduling parameters. Read-only for the duration of a run.
#[non_exhaustive]
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    pub max_concurrent: usize,
    /// Duration of items using [`DurationPolicy::KindDefault`].
    pub default_duration_days: KindTable<u32>,
    pub lead_times: Vec<LeadTime>,
    pub priority_weights: PriorityWeights,
    pub penalty_costs: PenaltyCosts,
    pub blackout_dates: BTreeSet<NaiveDate>,
    pub options: SchedulingOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            default_duration_days: KindTable::default(),
            lead_times: Vec::new(),
            priority_weights: PriorityWeights::default(),
            penalty_costs: PenaltyCosts::default(),
            blackout_dates: BTreeSet::new(),
            options: SchedulingOptions::default(),
        }
    }
}

impl Config {
    /// Creates the default configuration with the given concurrency limit.
    #[must_use]
    pub fn with_max_concurrent(max_concurrent: usize) -> Self {
        Self {
            max_concurrent,
            ..Self::default()
        }
    }

    /// Checks that every parameter is in range.
    ///
    /// # Errors
    /// - If the concurrency limit is zero.
    /// - If a weight, cost or factor is negative or not finite.
    /// - If the iteration bound is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::InvalidConfig(
                "max_concurrent must be at least 1".into(),
            ));
        }

        if self.options.max_iterations == 0 {
            return Err(ConfigError::InvalidConfig(
                "max_iterations must be at least 1".into(),
            ));
        }

        let options = &self.options;
        let spans = [
            ("default_duration_days.abstract", self.default_duration_days.abstract_),
            ("default_duration_days.paper", self.default_duration_days.paper),
            ("default_duration_days.poster", self.default_duration_days.poster),
            ("default_duration_days.work_item", self.default_duration_days.work_item),
            ("options.abstract_advance_days", options.abstract_advance_days),
            ("options.backtrack_window_days", options.backtrack_window_days),
            ("options.lookahead_buffer_days", options.lookahead_buffer_days),
            ("options.horizon_padding_days", options.horizon_padding_days),
        ];
        let rules = self.lead_times.iter().map(|rule| ("lead_times.days", rule.days));
        if let Some((name, value)) = spans.into_iter().chain(rules).find(|&(_, value)| value > MAX_SPAN_DAYS) {
            return Err(ConfigError::InvalidConfig(format!(
                "{name} must be at most {MAX_SPAN_DAYS} days, got {value}"
            )));
        }

        let weights = self.priority_weights;
        let costs = self.penalty_costs;
        let numbers = [
            ("priority_weights.engineering_paper", weights.engineering_paper),
            ("priority_weights.medical_paper", weights.medical_paper),
            ("priority_weights.work_item", weights.work_item),
            ("priority_weights.poster", weights.poster),
            ("priority_weights.abstract", weights.abstract_),
            ("penalty_costs.default_per_day", costs.default_per_day),
            ("penalty_costs.work_item_per_day", costs.work_item_per_day),
            ("penalty_costs.dependency_violation", costs.dependency_violation),
            ("penalty_costs.resource_violation", costs.resource_violation),
            ("options.lookahead_bonus", self.options.lookahead_bonus),
            ("options.randomness_factor", self.options.randomness_factor),
        ];

        match numbers.iter().find(|(_, value)| !value.is_finite() || *value < 0.0) {
            Some((name, value)) => Err(ConfigError::InvalidConfig(format!(
                "{name} must be a non-negative number, got {value}"
            ))),
            None => Ok(()),
        }
    }

    /// Returns the duration of the item in days.
    #[must_use]
    pub const fn duration_days(&self, item: &Item) -> u32 {
        match item.duration {
            DurationPolicy::Months(months) => months.saturating_mul(DAYS_PER_MONTH),
            DurationPolicy::Days(days) => days,
            DurationPolicy::KindDefault => self.default_duration_days.get(item.kind),
        }
    }

    /// Returns the static priority of the item. Higher is scheduled first.
    #[must_use]
    pub const fn priority(&self, item: &Item) -> f64 {
        let weights = &self.priority_weights;
        match (item.kind, item.engineering) {
            (ItemKind::Paper, true) => weights.engineering_paper,
            (ItemKind::Paper, false) => weights.medical_paper,
            (ItemKind::Abstract, _) => weights.abstract_,
            (ItemKind::Poster, _) => weights.poster,
            (ItemKind::WorkItem, _) => weights.work_item,
        }
    }

    /// Returns the cost of one day of lateness for the item.
    #[must_use]
    pub fn penalty_per_day(&self, item: &Item) -> f64 {
        item.penalty_cost_per_day.unwrap_or(match item.kind {
            ItemKind::WorkItem => self.penalty_costs.work_item_per_day,
            _ => self.penalty_costs.default_per_day,
        })
    }

    /// Returns the days `item` must wait after `dependency` completes:
    /// its own lead time plus the largest matching inter-kind rule.
    #[must_use]
    pub fn lead_days(&self, dependency: &Item, item: &Item) -> u32 {
        let rule = self
            .lead_times
            .iter()
            .filter(|rule| rule.after == dependency.kind && rule.before == item.kind)
            .map(|rule| rule.days)
            .max()
            .unwrap_or_default();
        item.lead_time_from_parents.saturating_add(rule)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn config_should_deserialize_partial_document() -> anyhow::Result<()> {
        let config: Config = serde_json::from_str(
            r#"{"max_concurrent": 1, "options": {"seed": 7, "heuristic": "critical_path"}}"#,
        )?;
        assert_eq!(config.max_concurrent, 1);
        assert_eq!(config.options.seed, Some(7));
        assert_eq!(config.options.heuristic, HeuristicRule::CriticalPath);
        assert_eq!(config.options.abstract_advance_days, 30);
        assert_eq!(config.default_duration_days.get(ItemKind::Paper), 90);
        Ok(())
    }

    #[test]
    fn zero_concurrency_is_invalid() {
        assert!(Config::with_max_concurrent(0).validate().is_err());
        assert!(Config::with_max_concurrent(1).validate().is_ok());
    }

    #[test]
    fn negative_weight_is_invalid() {
        let mut config = Config::default();
        config.priority_weights.poster = -1.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn oversized_spans_are_invalid() {
        let mut config = Config::default();
        config.options.horizon_padding_days = MAX_SPAN_DAYS + 1;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidConfig(_))));

        let mut config = Config::default();
        config.lead_times.push(LeadTime {
            after: ItemKind::WorkItem,
            before: ItemKind::Paper,
            days: u32::MAX,
        });
        assert!(matches!(config.validate(), Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn duration_follows_policy() {
        let config = Config::default();
        let paper = Item::new("p", ItemKind::Paper);
        assert_eq!(config.duration_days(&paper), 90);
        assert_eq!(config.duration_days(&paper.clone().with_duration(DurationPolicy::Months(2))), 60);
        assert_eq!(config.duration_days(&paper.with_duration(DurationPolicy::Days(5))), 5);
        assert_eq!(config.duration_days(&Item::new("a", ItemKind::Abstract)), 0);
        assert_eq!(
            config.duration_days(&Item::new("l", ItemKind::Paper).with_duration(DurationPolicy::Months(u32::MAX))),
            u32::MAX
        );
    }

    #[test]
    fn priority_depends_on_kind_and_engineering() {
        let config = Config::default();
        let paper = Item::new("p", ItemKind::Paper);
        assert!((config.priority(&paper) - 1.0).abs() < f64::EPSILON);
        assert!((config.priority(&paper.with_engineering(true)) - 2.0).abs() < f64::EPSILON);
        assert!((config.priority(&Item::new("w", ItemKind::WorkItem)) - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn lead_days_combine_item_and_rule() {
        let mut config = Config::default();
        config.lead_times.push(LeadTime {
            after: ItemKind::WorkItem,
            before: ItemKind::Paper,
            days: 14,
        });
        let work = Item::new("w", ItemKind::WorkItem);
        let paper = Item::new("p", ItemKind::Paper).with_lead_time(3);
        assert_eq!(config.lead_days(&work, &paper), 17);
        assert_eq!(config.lead_days(&paper, &work), 0);
    }

    #[test]
    fn heuristic_rule_parses_names() {
        assert_eq!("latest_start".parse(), Ok(HeuristicRule::LatestStart));
        assert_eq!(
            "fastest".parse::<HeuristicRule>(),
            Err(ConfigError::UnknownHeuristic("fastest".into()))
        );
    }
}
