mod run;
pub mod samples;

pub use run::*;

use crate::core::{assign_venues, Assignment, Config, ConfigError, Instance, Item, Venue};
use anyhow::Result;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::BufRead;

/// On-disk form of a problem: configuration, venues and items.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct InstanceFile {
    #[serde(default)]
    pub config: Config,
    #[serde(default)]
    pub venues: Vec<Venue>,
    pub items: Vec<Item>,
}

impl InstanceFile {
    /// Assigns venues when configured to and validates the result.
    ///
    /// # Errors
    /// - If venue assignment or instance validation fails.
    pub fn into_instance(self, as_of: NaiveDate) -> Result<(Instance, Vec<Assignment>), ConfigError> {
        let Self {
            config,
            venues,
            mut items,
        } = self;
        let assignments = if config.options.auto_assign_venues {
            assign_venues(&mut items, &venues, &config, as_of)?
        } else {
            Vec::new()
        };
        Ok((Instance::new(items, venues, config)?, assignments))
    }
}

/// Reads a JSON value from the reader.
///
/// # Errors
/// - If the input is not valid JSON for `T`.
pub fn deserialize<T: DeserializeOwned>(reader: &mut impl BufRead) -> Result<T> {
    Ok(serde_json::from_reader(reader)?)
}

/// Writes the value as pretty-printed JSON.
///
/// # Errors
/// - If the value cannot be serialized.
pub fn to_string<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Reads an [`InstanceFile`] and builds the validated instance.
///
/// # Errors
/// - If the input cannot be parsed.
/// - If the problem is malformed.
pub fn load(reader: &mut impl BufRead, as_of: NaiveDate) -> Result<Instance> {
    let file: InstanceFile = deserialize(reader)?;
    Ok(file.into_instance(as_of)?.0)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::ItemKind;
    use super::samples::day;

    #[test]
    fn bundled_sample_loads() -> Result<()> {
        let json = include_str!("../../samples/portfolio.json");
        let instance = load(&mut json.as_bytes(), day(0))?;

        assert_eq!(instance.len(), 7);
        assert_eq!(instance.config().max_concurrent, 2);
        assert_eq!(instance.item("paper-eng").map(|item| item.kind), Some(ItemKind::Paper));
        Ok(())
    }

    #[test]
    fn venues_are_assigned_when_enabled() -> Result<()> {
        let json = r#"{
            "config": {"options": {"auto_assign_venues": true}},
            "venues": [{"id": "conf", "deadlines": {"paper": "2025-12-01"}}],
            "items": [{"id": "p", "kind": "paper"}, {"id": "w", "kind": "work_item"}]
        }"#;
        let file: InstanceFile = serde_json::from_str(json)?;
        let (instance, assignments) = file.into_instance(day(0))?;

        assert_eq!(assignments.len(), 1);
        assert_eq!(instance.venue_of(0).map(|venue| venue.id.as_str()), Some("conf"));
        assert!(instance.venue_of(1).is_none());
        Ok(())
    }

    #[test]
    fn cycle_is_a_load_error() {
        let json = r#"{"items": [
            {"id": "a", "kind": "paper", "depends_on": ["b"]},
            {"id": "b", "kind": "paper", "depends_on": ["a"]}
        ]}"#;
        let error = load(&mut json.as_bytes(), day(0)).err();
        assert!(error.is_some_and(|error| matches!(
            error.downcast_ref::<ConfigError>(),
            Some(ConfigError::Cycle(_))
        )));
    }
}
