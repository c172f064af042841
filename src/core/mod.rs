mod assign;
pub mod calendar;
mod config;
pub mod constraints;
mod error;
mod graph;
mod problem;
mod solution;
mod validation;

pub use assign::*;
pub use config::*;
pub use error::*;
pub use graph::*;
pub use problem::*;
pub use solution::*;
pub use validation::*;

use chrono::NaiveDate;

/// Produces a schedule for an instance.
pub trait Scheduler {
    /// Schedules the items of the instance. Items without an earliest start may start on `as_of`.
    fn schedule(&mut self, instance: &Instance, as_of: NaiveDate) -> Outcome;

    /// Returns the name of the scheduler.
    fn name(&self) -> &str;
}
