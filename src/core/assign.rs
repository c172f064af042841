use super::calendar::days;
use super::{Config, ConfigError, Item, ItemKind, Venue};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Venue given to an item by [`assign_venues`].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Assignment {
    pub item: String,
    pub venue: String,
}

/// Gives every submission without a venue the first compatible venue whose deadline it can still meet.
///
/// Preferred venues are tried in order. Without preferences, every venue is tried in id order.
/// Work items and items that already have a venue are left alone, as are items
/// no venue fits. Must run before the items are turned into an instance.
///
/// # Errors
/// - If a preferred venue is unknown.
pub fn assign_venues(
    items: &mut [Item],
    venues: &[Venue],
    config: &Config,
    as_of: NaiveDate,
) -> Result<Vec<Assignment>, ConfigError> {
    let mut by_id: Vec<&Venue> = venues.iter().collect();
    by_id.sort_unstable_by(|a, b| a.id.cmp(&b.id));

    let mut assignments = Vec::new();
    for item in items
        .iter_mut()
        .filter(|item| item.kind != ItemKind::WorkItem && item.venue.is_none())
    {
        let candidates = if item.preferred_venues.is_empty() {
            by_id.clone()
        } else {
            item.preferred_venues
                .iter()
                .map(|id| {
                    venues
                        .iter()
                        .find(|venue| venue.id == *id)
                        .ok_or_else(|| ConfigError::UnknownVenue {
                            item: item.id.clone(),
                            venue: id.clone(),
                        })
                })
                .collect::<Result<_, _>>()?
        };

        let start = item.earliest_start.map_or(as_of, |earliest| earliest.max(as_of));
        let duration = days(config.duration_days(item));
        let fits = |venue: &&Venue| {
            venue.accepts(item)
                && venue
                    .deadline(item.kind)
                    .is_some_and(|deadline| deadline - duration >= start)
        };

        if let Some(venue) = candidates.into_iter().find(fits) {
            debug!(item = %item.id, venue = %venue.id, "assigned venue");
            assignments.push(Assignment {
                item: item.id.clone(),
                venue: venue.id.clone(),
            });
            item.venue = Some(venue.id.clone());
        }
    }

    Ok(assignments)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::VenueCategory;
    use crate::data::samples::day;

    fn venues() -> Vec<Venue> {
        vec![
            Venue::new("eng", VenueCategory::Engineering).with_deadline(ItemKind::Paper, day(200)),
            Venue::new("med", VenueCategory::Medical).with_deadline(ItemKind::Paper, day(95)),
            Venue::new("late", VenueCategory::Medical).with_deadline(ItemKind::Paper, day(300)),
        ]
    }

    #[test]
    fn medical_paper_skips_engineering_and_tight_venues() -> anyhow::Result<()> {
        let mut items = vec![Item::new("p", ItemKind::Paper).with_earliest_start(day(10))];
        let assignments = assign_venues(&mut items, &venues(), &Config::default(), day(0))?;

        assert_eq!(items[0].venue.as_deref(), Some("late"));
        assert_eq!(assignments.len(), 1);
        Ok(())
    }

    #[test]
    fn preferred_venues_are_tried_in_order() -> anyhow::Result<()> {
        let mut items = vec![
            Item::new("p", ItemKind::Paper)
                .with_engineering(true)
                .with_preferred_venue("late")
                .with_preferred_venue("eng"),
            Item::new("w", ItemKind::WorkItem),
            Item::new("q", ItemKind::Paper).with_venue("med"),
        ];
        assign_venues(&mut items, &venues(), &Config::default(), day(0))?;

        assert_eq!(items[0].venue.as_deref(), Some("late"));
        assert_eq!(items[1].venue, None);
        assert_eq!(items[2].venue.as_deref(), Some("med"));
        Ok(())
    }

    #[test]
    fn unknown_preferred_venue_is_an_error() {
        let mut items = vec![Item::new("p", ItemKind::Paper).with_preferred_venue("nope")];
        let result = assign_venues(&mut items, &venues(), &Config::default(), day(0));
        assert!(matches!(result, Err(ConfigError::UnknownVenue { .. })));
    }
}
