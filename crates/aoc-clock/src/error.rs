//! Error types for calendar validation

/// Errors from puzzle date validation and lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid day {0}: must be between 1 and 25")]
    InvalidDay(u32),

    #[error("invalid year {0}: the event started in 2015")]
    InvalidYear(i32),

    #[error("no puzzle today: the event runs December 1-25 (UTC-5)")]
    OutOfSeason,

    #[error("date out of range for year {0}")]
    OutOfRange(i32),
}

/// Result alias for clock operations.
pub type Result<T> = std::result::Result<T, Error>;
