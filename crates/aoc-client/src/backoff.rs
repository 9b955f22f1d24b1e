//! Exponential backoff without jitter
//!
//! `BackoffPolicy` holds the knobs and is shared by every call a client
//! makes. `Backoff` is the per-call state `(last_attempt, current)`: it is
//! created fresh for each logical request and never outlives it.

use std::time::Duration;

use tokio::time::Instant;

use crate::constants::{
    DEFAULT_BACKOFF_RATE, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_BACKOFF, DEFAULT_TIMEOUT_FLOOR,
};

/// Retry timing configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Backoff before the first growth step
    pub initial: Duration,
    /// Ceiling for the backoff
    pub max: Duration,
    /// Multiplier applied once per attempt
    pub rate: f64,
    /// Per-attempt timeout never drops below this
    pub timeout_floor: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: DEFAULT_INITIAL_BACKOFF,
            max: DEFAULT_MAX_BACKOFF,
            rate: DEFAULT_BACKOFF_RATE,
            timeout_floor: DEFAULT_TIMEOUT_FLOOR,
        }
    }
}

impl BackoffPolicy {
    /// Next backoff after `current`, capped at `max`.
    pub fn grow(&self, current: Duration) -> Duration {
        Duration::try_from_secs_f64(current.as_secs_f64() * self.rate)
            .unwrap_or(self.max)
            .min(self.max)
    }

    /// Timeout for an attempt made while the backoff is `current`.
    pub fn attempt_timeout(&self, current: Duration) -> Duration {
        current.max(self.timeout_floor)
    }
}

/// Backoff state for one logical request.
#[derive(Debug)]
pub struct Backoff<'a> {
    policy: &'a BackoffPolicy,
    last_attempt: Option<Instant>,
    current: Duration,
}

impl<'a> Backoff<'a> {
    pub fn new(policy: &'a BackoffPolicy) -> Self {
        Self {
            policy,
            last_attempt: None,
            current: policy.initial,
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    /// How long to wait at `now` before the next attempt may start.
    ///
    /// Zero before the first attempt.
    pub fn delay_before_attempt(&self, now: Instant) -> Duration {
        match self.last_attempt {
            None => Duration::ZERO,
            Some(last) => self
                .current
                .saturating_sub(now.saturating_duration_since(last)),
        }
    }

    /// Record an attempt starting at `now` and return its timeout.
    ///
    /// The backoff grows here, before the outcome is known.
    pub fn begin_attempt(&mut self, now: Instant) -> Duration {
        self.last_attempt = Some(now);
        self.current = self.policy.grow(self.current);
        self.policy.attempt_timeout(self.current)
    }
}
