use thiserror::Error;

/// Malformed input. Returned before any scheduling happens, never alongside a partial schedule.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    #[error("item `{0}` is defined more than once")]
    DuplicateItem(String),

    #[error("venue `{0}` is defined more than once")]
    DuplicateVenue(String),

    #[error("item `{item}` depends on unknown item `{dependency}`")]
    UnknownDependency { item: String, dependency: String },

    #[error("item `{item}` references unknown venue `{venue}`")]
    UnknownVenue { item: String, venue: String },

    #[error("item `{0}` depends on itself")]
    SelfDependency(String),

    #[error("dependency cycle through item `{0}`")]
    Cycle(String),

    #[error("unknown strategy `{0}`")]
    UnknownStrategy(String),

    #[error("unknown heuristic rule `{0}`")]
    UnknownHeuristic(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
