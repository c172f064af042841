use crate::algo::{create, StrategyKind};
use crate::core::{validate, Instance};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result};
use std::time::Instant;

/// Comparison of several strategies on one instance.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Report {
    entries: Vec<ReportEntry>,
}

impl Report {
    /// Get the entries.
    #[must_use]
    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    /// Returns the entry of the given strategy.
    #[must_use]
    pub fn entry(&self, strategy: StrategyKind) -> Option<&ReportEntry> {
        self.entries.iter().find(|entry| entry.strategy == strategy)
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        writeln!(f, "-------------------")
    }
}

/// Result of a single strategy.
#[non_exhaustive]
#[derive(Debug, Deserialize, Serialize)]
pub struct ReportEntry {
    pub strategy: StrategyKind,
    pub status: String,
    pub scheduled: usize,
    pub total: usize,
    /// Share of scheduled items with a deadline that meet it, in percent.
    pub compliance: f64,
    pub penalty: f64,
    pub valid: bool,
    pub time: f64,
}

impl Display for ReportEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        write!(
            f,
            "{}: {} {}/{} items, {:.1}% on time, penalty {:.0}{} in {:.2} sec",
            self.strategy,
            self.status,
            self.scheduled,
            self.total,
            self.compliance,
            self.penalty,
            if self.valid { "" } else { " (violations)" },
            self.time
        )
    }
}

/// Runs every given strategy on the instance and validates each schedule.
#[must_use]
pub fn compare(instance: &Instance, as_of: NaiveDate, strategies: &[StrategyKind]) -> Report {
    let entries = strategies
        .iter()
        .map(|&strategy| {
            let mut scheduler = create(strategy, instance.config());

            let time = Instant::now();
            let outcome = scheduler.schedule(instance, as_of);
            let time = time.elapsed().as_secs_f64();

            let report = validate(&outcome.schedule, instance);
            ReportEntry {
                strategy,
                status: outcome.status.name().into(),
                scheduled: outcome.schedule.len(),
                total: instance.len(),
                compliance: report.deadlines.compliance_rate,
                penalty: report.penalties.total,
                valid: report.is_valid,
                time,
            }
        })
        .collect();

    Report { entries }
}
