//! Credential store keys and prompt text

/// Service name every session is stored under
pub const SERVICE_NAME: &str = "aoc-session";

/// Account used when the user doesn't name one
pub const DEFAULT_ACCOUNT: &str = "default";

/// Path fetched to check a session. Day 1 of the first event is unlocked
/// for every account, and the platform refuses it without a valid session.
pub const DEFAULT_PROBE_PATH: &str = "/2015/day/1/input";

pub const PROMPT_MESSAGE: &str = "Session cookie (the `session` value from your browser):";

pub const RETRY_MESSAGE: &str = "Session cookie cannot be empty, paste it again:";

pub const INVALID_SESSION_MESSAGE: &str =
    "That session was rejected by the platform, paste a fresh one:";
