//! Release-instant calculations
//!
//! A release instant is `RELEASE_HOUR_UTC` on December `day` of `year`. The
//! "next" and "previous" lookups follow the event calendar: before
//! December 1 everything points at the upcoming event, after the last
//! release everything points past it.

use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Timelike, Utc};

use crate::constants::{
    DEFAULT_MARGIN, EVENT_MONTH, FIRST_DAY, FIRST_YEAR, LAST_DAY, RELEASE_HOUR_UTC,
};
use crate::error::{Error, Result};

/// A validated (year, day) pair in the puzzle calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PuzzleDate {
    year: i32,
    day: u32,
}

impl PuzzleDate {
    /// Validate and build a puzzle date.
    ///
    /// Day must be within 1..=25 and year no earlier than 2015.
    pub fn new(year: i32, day: u32) -> Result<Self> {
        if !(FIRST_DAY..=LAST_DAY).contains(&day) {
            return Err(Error::InvalidDay(day));
        }
        if year < FIRST_YEAR {
            return Err(Error::InvalidYear(year));
        }
        Ok(Self { year, day })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    /// The instant this day's puzzle unlocks.
    pub fn release_instant(&self) -> Result<DateTime<Utc>> {
        release(self.year, self.day)
    }
}

impl std::fmt::Display for PuzzleDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} day {}", self.year, self.day)
    }
}

/// Computes release instants relative to "now".
#[derive(Debug, Clone, Copy)]
pub struct ChallengeClock {
    margin: Duration,
}

impl Default for ChallengeClock {
    fn default() -> Self {
        Self::new(DEFAULT_MARGIN)
    }
}

impl ChallengeClock {
    /// `margin` is how long after an unlock that unlock is still reported
    /// by [`ChallengeClock::current_challenge_start_time`].
    pub fn new(margin: Duration) -> Self {
        Self { margin }
    }

    pub fn margin(&self) -> Duration {
        self.margin
    }

    /// Map an explicit (year, day) to its release instant.
    pub fn challenge_start_time(year: i32, day: u32) -> Result<DateTime<Utc>> {
        PuzzleDate::new(year, day)?.release_instant()
    }

    pub fn next_challenge_start(&self) -> Result<DateTime<Utc>> {
        self.next_challenge_start_at(Utc::now())
    }

    /// Earliest release instant strictly after `now`, except that past the
    /// final release of a year it jumps to December 1 of the next year.
    pub fn next_challenge_start_at(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let year = now.year();
        let first = release(year, FIRST_DAY)?;
        if now < first {
            return Ok(first);
        }
        if now >= release(year, LAST_DAY)? {
            return release(year + 1, FIRST_DAY);
        }

        if now.hour() >= RELEASE_HOUR_UTC {
            release(year, now.day() + 1)
        } else {
            release(year, now.day())
        }
    }

    pub fn prev_challenge_start(&self) -> Result<DateTime<Utc>> {
        self.prev_challenge_start_at(Utc::now())
    }

    /// Most recent release instant at or before `now`.
    ///
    /// Before December 1 this returns December 1 of the *following* year,
    /// not the last release of the previous event. Callers relying on a past
    /// instant must check the month themselves.
    pub fn prev_challenge_start_at(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let year = now.year();
        if now < release(year, FIRST_DAY)? {
            return release(year + 1, FIRST_DAY);
        }
        let last = release(year, LAST_DAY)?;
        if now >= last {
            return Ok(last);
        }

        if now.hour() < RELEASE_HOUR_UTC {
            release(year, now.day() - 1)
        } else {
            release(year, now.day())
        }
    }

    pub fn current_challenge_start_time(&self) -> Result<DateTime<Utc>> {
        self.current_challenge_start_time_at(Utc::now())
    }

    /// The previous release if it happened less than `margin` ago, otherwise
    /// the next one.
    pub fn current_challenge_start_time_at(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let prev = self.prev_challenge_start_at(now)?;
        let margin = TimeDelta::from_std(self.margin).unwrap_or(TimeDelta::MAX);
        if now.signed_duration_since(prev) < margin {
            Ok(prev)
        } else {
            self.next_challenge_start_at(now)
        }
    }

    pub fn current_day(&self) -> Result<PuzzleDate> {
        self.current_day_at(Utc::now())
    }

    /// The puzzle whose release most recently passed, if the event is running.
    ///
    /// Days roll over at the release hour, so 04:59 UTC on December 2 is
    /// still day 1.
    pub fn current_day_at(&self, now: DateTime<Utc>) -> Result<PuzzleDate> {
        let shifted = now - TimeDelta::hours(i64::from(RELEASE_HOUR_UTC));
        if shifted.month() != EVENT_MONTH || shifted.day() > LAST_DAY {
            return Err(Error::OutOfSeason);
        }
        PuzzleDate::new(shifted.year(), shifted.day())
    }

    pub fn latest_event_year(&self) -> Result<i32> {
        self.latest_event_year_at(Utc::now())
    }

    /// Year of the most recent event that has at least one unlocked puzzle.
    pub fn latest_event_year_at(&self, now: DateTime<Utc>) -> Result<i32> {
        let year = now.year();
        if now >= release(year, FIRST_DAY)? {
            Ok(year)
        } else {
            Ok(year - 1)
        }
    }

    /// Time remaining until `instant`, zero if it has passed.
    pub fn until(instant: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
        instant
            .signed_duration_since(now)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

fn release(year: i32, day: u32) -> Result<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, EVENT_MONTH, day)
        .and_then(|date| date.and_hms_opt(RELEASE_HOUR_UTC, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or(Error::OutOfRange(year))
}
