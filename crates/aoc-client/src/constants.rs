//! Platform endpoints and retry defaults

use std::time::Duration;

/// Origin every request path is appended to
pub const DEFAULT_BASE_URL: &str = "https://adventofcode.com";

/// Cookie carrying the session credential
pub const SESSION_COOKIE: &str = "session";

/// Backoff multiplier applied before every attempt
pub const DEFAULT_BACKOFF_RATE: f64 = 1.1;

pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(1000);

pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_millis(30_000);

/// Lower bound on the per-attempt timeout
pub const DEFAULT_TIMEOUT_FLOOR: Duration = Duration::from_millis(5000);
