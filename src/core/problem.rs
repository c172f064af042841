use super::{Config, ConfigError, DependencyGraph, MAX_SPAN_DAYS};
use ahash::{HashMap, HashMapExt};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Days counted for one month of drafting time.
pub const DAYS_PER_MONTH: u32 = 30;

/// Kind of a schedulable item.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Abstract,
    Paper,
    Poster,
    WorkItem,
}

impl ItemKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 4] = [Self::Abstract, Self::Paper, Self::Poster, Self::WorkItem];

    /// Returns the lowercase name of the kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Abstract => "abstract",
            Self::Paper => "paper",
            Self::Poster => "poster",
            Self::WorkItem => "work_item",
        }
    }
}

impl Display for ItemKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How long an item takes once started.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationPolicy {
    /// Whole months of [`DAYS_PER_MONTH`] days each.
    Months(u32),
    Days(u32),
    /// The per-kind default from [`Config`].
    #[default]
    KindDefault,
}

/// A unit of work: an abstract, paper, poster or internal work item.
#[non_exhaustive]
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Item {
    pub id: String,
    pub kind: ItemKind,
    #[serde(default)]
    pub title: String,
    /// Start is never earlier than this. Absent means the run's as-of date.
    #[serde(default)]
    pub earliest_start: Option<NaiveDate>,
    /// Absent for internally scheduled items, which have no deadline.
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub duration: DurationPolicy,
    #[serde(default)]
    pub engineering: bool,
    #[serde(default)]
    pub penalty_cost_per_day: Option<f64>,
    /// Extra days that must pass after every dependency completes.
    #[serde(default)]
    pub lead_time_from_parents: u32,
    /// Venue ids tried in order by venue assignment.
    #[serde(default)]
    pub preferred_venues: Vec<String>,
}

impl Item {
    /// Creates an item without venue, dependencies or explicit duration.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: ItemKind) -> Self {
        let id = id.into();
        Self {
            title: id.clone(),
            id,
            kind,
            earliest_start: None,
            venue: None,
            depends_on: Vec::new(),
            duration: DurationPolicy::KindDefault,
            engineering: false,
            penalty_cost_per_day: None,
            lead_time_from_parents: 0,
            preferred_venues: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_earliest_start(mut self, date: NaiveDate) -> Self {
        self.earliest_start = Some(date);
        self
    }

    #[must_use]
    pub fn with_venue(mut self, venue: impl Into<String>) -> Self {
        self.venue = Some(venue.into());
        self
    }

    #[must_use]
    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.depends_on.push(dependency.into());
        self
    }

    #[must_use]
    pub const fn with_duration(mut self, duration: DurationPolicy) -> Self {
        self.duration = duration;
        self
    }

    #[must_use]
    pub const fn with_engineering(mut self, engineering: bool) -> Self {
        self.engineering = engineering;
        self
    }

    #[must_use]
    pub const fn with_lead_time(mut self, days: u32) -> Self {
        self.lead_time_from_parents = days;
        self
    }

    #[must_use]
    pub fn with_preferred_venue(mut self, venue: impl Into<String>) -> Self {
        self.preferred_venues.push(venue.into());
        self
    }
}

/// Audience of a venue.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueCategory {
    Engineering,
    #[default]
    Medical,
}

/// How often a venue repeats.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    #[default]
    Annual,
    Biennial,
    Quarterly,
}

/// A deadline-setting venue (a conference) with one hard deadline per item kind.
#[non_exhaustive]
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Venue {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: VenueCategory,
    #[serde(default)]
    pub recurrence: Recurrence,
    #[serde(default)]
    pub deadlines: BTreeMap<ItemKind, NaiveDate>,
}

impl Venue {
    /// Creates a venue without deadlines.
    #[must_use]
    pub fn new(id: impl Into<String>, category: VenueCategory) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            category,
            recurrence: Recurrence::Annual,
            deadlines: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_deadline(mut self, kind: ItemKind, date: NaiveDate) -> Self {
        self.deadlines.insert(kind, date);
        self
    }

    /// Returns the deadline for the given kind.
    #[must_use]
    pub fn deadline(&self, kind: ItemKind) -> Option<NaiveDate> {
        self.deadlines.get(&kind).copied()
    }

    /// Returns whether the item may be submitted here: the kind has a deadline and
    /// medical work never goes to an engineering venue.
    #[must_use]
    pub fn accepts(&self, item: &Item) -> bool {
        self.deadlines.contains_key(&item.kind)
            && (item.engineering || self.category != VenueCategory::Engineering)
    }
}

/// Dates of items and venues must fall in years 1 to 9999.
fn check_date(owner: &str, field: &str, date: NaiveDate) -> Result<(), ConfigError> {
    if (1..=9999).contains(&date.year()) {
        Ok(())
    } else {
        Err(ConfigError::InvalidConfig(format!("{owner}: {field} {date} is out of range")))
    }
}

fn check_span(owner: &str, field: &str, days: u32) -> Result<(), ConfigError> {
    if days <= MAX_SPAN_DAYS {
        Ok(())
    } else {
        Err(ConfigError::InvalidConfig(format!(
            "{owner}: {field} must be at most {MAX_SPAN_DAYS} days, got {days}"
        )))
    }
}

/// A validated, read-only scheduling problem: items, venues and configuration.
///
/// All cross references are resolved and the dependency relation is acyclic.
/// Items are addressed by their position in [`Instance::items`].
#[derive(Clone, Debug)]
pub struct Instance {
    items: Vec<Item>,
    venues: Vec<Venue>,
    config: Config,
    index: HashMap<String, usize>,
    item_venue: Vec<Option<usize>>,
    graph: DependencyGraph,
}

impl Instance {
    /// Validates and indexes the problem.
    ///
    /// # Errors
    /// - If an item or venue id is defined twice.
    /// - If a dependency or venue reference does not resolve.
    /// - If an item depends on itself or the dependencies form a cycle.
    /// - If the configuration, a duration, a lead time or a date is out of range.
    pub fn new(items: Vec<Item>, venues: Vec<Venue>, config: Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut venue_index = HashMap::with_capacity(venues.len());
        for (i, venue) in venues.iter().enumerate() {
            if venue_index.insert(venue.id.clone(), i).is_some() {
                return Err(ConfigError::DuplicateVenue(venue.id.clone()));
            }
            for (kind, &deadline) in &venue.deadlines {
                check_date(&venue.id, &format!("{kind} deadline"), deadline)?;
            }
        }

        let mut index = HashMap::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            if index.insert(item.id.clone(), i).is_some() {
                return Err(ConfigError::DuplicateItem(item.id.clone()));
            }
            check_span(&item.id, "duration", config.duration_days(item))?;
            check_span(&item.id, "lead_time_from_parents", item.lead_time_from_parents)?;
            if let Some(earliest_start) = item.earliest_start {
                check_date(&item.id, "earliest_start", earliest_start)?;
            }
        }

        let item_venue = items
            .iter()
            .map(|item| match &item.venue {
                None => Ok(None),
                Some(venue) => venue_index.get(venue).copied().map(Some).ok_or_else(|| {
                    ConfigError::UnknownVenue {
                        item: item.id.clone(),
                        venue: venue.clone(),
                    }
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let graph = DependencyGraph::build(&items, &index)?;

        Ok(Self {
            items,
            venues,
            config,
            index,
            item_venue,
            graph,
        })
    }

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    #[must_use]
    pub fn venues(&self) -> &[Venue] {
        &self.venues
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the position of the item with the given id.
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Returns the item with the given id.
    #[must_use]
    pub fn item(&self, id: &str) -> Option<&Item> {
        self.position(id).map(|i| &self.items[i])
    }

    /// Returns the venue of the item at the given position.
    #[must_use]
    pub fn venue_of(&self, item: usize) -> Option<&Venue> {
        self.item_venue[item].map(|venue| &self.venues[venue])
    }

    /// Returns the venue deadline that applies to the item at the given position.
    #[must_use]
    pub fn deadline(&self, item: usize) -> Option<NaiveDate> {
        self.venue_of(item)
            .and_then(|venue| venue.deadline(self.items[item].kind))
    }

    /// Returns the duration in days of the item at the given position.
    #[must_use]
    pub fn duration(&self, item: usize) -> u32 {
        self.config.duration_days(&self.items[item])
    }

    /// Returns the days required between the end of `dependency` and the start of `item`.
    #[must_use]
    pub fn lead_days(&self, dependency: usize, item: usize) -> u32 {
        self.config
            .lead_days(&self.items[dependency], &self.items[item])
    }

    /// Returns the first date the item may start: its earliest start, never before `as_of`.
    #[must_use]
    pub fn earliest_start(&self, item: usize, as_of: NaiveDate) -> NaiveDate {
        self.items[item]
            .earliest_start
            .map_or(as_of, |earliest_start| earliest_start.max(as_of))
    }
}
