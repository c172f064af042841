#![deny(clippy::all, clippy::cargo, clippy::expect_used, clippy::unwrap_used)]
#![deny(clippy::pedantic, clippy::nursery, unsafe_code)]
#![warn(clippy::unimplemented, clippy::redundant_type_annotations)]

use anyhow::Result;
use chrono::NaiveDate;
use std::io::BufRead;

pub mod algo;
pub mod core;
pub mod data;

pub use crate::algo::StrategyKind;
pub use crate::core::validate;
use crate::core::{ConfigError, Instance, Outcome};

/// Schedules the instance with the given strategy, built from the instance configuration.
/// Items without an earliest start may start on `as_of`.
#[must_use]
pub fn schedule(strategy: StrategyKind, instance: &Instance, as_of: NaiveDate) -> Outcome {
    algo::create(strategy, instance.config()).schedule(instance, as_of)
}

/// Schedules the instance with the strategy of the given name.
///
/// # Errors
/// - If no strategy has the given name.
pub fn schedule_by_name(strategy: &str, instance: &Instance, as_of: NaiveDate) -> Result<Outcome, ConfigError> {
    Ok(schedule(strategy.parse()?, instance, as_of))
}

/// Runs the given strategy on the instance read from reader and writes the outcome to stdout.
/// `seed` replaces the configured seed of the randomized strategies.
///
/// # Errors
/// - If the instance could not be read from the reader or is malformed.
/// - If the outcome could not be written to stdout.
///
/// # Panics
///  - If a greedy-family schedule breaks a constraint in debug mode.
pub fn run_reader(
    strategy: StrategyKind,
    as_of: NaiveDate,
    seed: Option<u64>,
    reader: &mut impl BufRead,
) -> Result<()> {
    let mut file: data::InstanceFile = data::deserialize(reader)?;
    if seed.is_some() {
        file.config.options.seed = seed;
    }
    let (instance, _) = file.into_instance(as_of)?;
    let outcome = schedule(strategy, &instance, as_of);

    debug_assert!(
        !strategy.is_greedy_family() || validate(&outcome.schedule, &instance).is_valid,
        "Schedule is invalid: {outcome:?}"
    );

    println!("{}", data::to_string(&outcome)?);

    Ok(())
}
