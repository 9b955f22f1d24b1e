//! Release-time arithmetic for the advent puzzle calendar
//!
//! Puzzles unlock once per day from December 1 to December 25 at a fixed
//! instant (05:00 UTC). This crate answers the scheduling questions the CLI
//! needs before it touches the network: when does the next puzzle unlock,
//! which unlock just happened, and which day is "today".
//!
//! Everything here is pure. Each operation has an `_at` form taking an
//! explicit `now` so callers and tests can pin the clock.

pub mod clock;
pub mod constants;
pub mod error;

pub use clock::{ChallengeClock, PuzzleDate};
pub use constants::*;
pub use error::{Error, Result};
