//! Calendar constants for the puzzle event

use std::time::Duration;

/// UTC hour at which each day's puzzle unlocks
pub const RELEASE_HOUR_UTC: u32 = 5;

/// Month the event runs in
pub const EVENT_MONTH: u32 = 12;

pub const FIRST_DAY: u32 = 1;
pub const LAST_DAY: u32 = 25;

/// First year the event ran
pub const FIRST_YEAR: i32 = 2015;

/// How long after an unlock it still counts as the "current" challenge
pub const DEFAULT_MARGIN: Duration = Duration::from_secs(23 * 60 * 60);
