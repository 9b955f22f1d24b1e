//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The session token comes from the AOC_SESSION env var or the credential
//! store, never from the TOML, so config files can be shared safely.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use aoc_client::BackoffPolicy;
use common::Secret;
use serde::Deserialize;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "aoc.toml";

/// Upper bound for `margin_hours` (one leap year)
pub const MAX_MARGIN_HOURS: u64 = 366 * 24;

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub clock: ClockConfig,
    /// Named solution templates, e.g. `[templates.rust]`
    #[serde(default)]
    pub templates: BTreeMap<String, TemplateConfig>,
}

/// Request engine settings
#[derive(Debug, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_backoff_rate")]
    pub backoff_rate: f64,
    #[serde(default = "default_timeout_floor_ms")]
    pub timeout_floor_ms: u64,
}

/// Session lookup settings
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_account")]
    pub account: String,
    /// Where sessions are stored (defaults under the user config directory)
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,
    /// Probe stored and entered sessions against the platform
    #[serde(default = "default_verify")]
    pub verify: bool,
    #[serde(default = "default_probe_path")]
    pub probe_path: String,
    /// From AOC_SESSION; bypasses the credential store entirely
    #[serde(skip)]
    pub session: Option<Secret<String>>,
}

/// Release-window settings
#[derive(Debug, Deserialize)]
pub struct ClockConfig {
    #[serde(default = "default_margin_hours")]
    pub margin_hours: u64,
}

/// A solution template: files to scaffold and a command to run
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateConfig {
    /// Directory copied into each new day directory
    pub dir: PathBuf,
    /// Entry file inside the day directory, exposed to `run` as `{src}`
    pub src: String,
    #[serde(default)]
    pub run: Option<String>,
}

fn default_base_url() -> String {
    aoc_client::DEFAULT_BASE_URL.to_string()
}

fn default_initial_backoff_ms() -> u64 {
    aoc_client::DEFAULT_INITIAL_BACKOFF.as_millis() as u64
}

fn default_max_backoff_ms() -> u64 {
    aoc_client::DEFAULT_MAX_BACKOFF.as_millis() as u64
}

fn default_backoff_rate() -> f64 {
    aoc_client::DEFAULT_BACKOFF_RATE
}

fn default_timeout_floor_ms() -> u64 {
    aoc_client::DEFAULT_TIMEOUT_FLOOR.as_millis() as u64
}

fn default_account() -> String {
    aoc_auth::DEFAULT_ACCOUNT.to_string()
}

fn default_verify() -> bool {
    true
}

fn default_probe_path() -> String {
    aoc_auth::DEFAULT_PROBE_PATH.to_string()
}

fn default_margin_hours() -> u64 {
    aoc_clock::DEFAULT_MARGIN.as_secs() / 3600
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_rate: default_backoff_rate(),
            timeout_floor_ms: default_timeout_floor_ms(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            account: default_account(),
            credentials_file: None,
            verify: default_verify(),
            probe_path: default_probe_path(),
            session: None,
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            margin_hours: default_margin_hours(),
        }
    }
}

impl ClientConfig {
    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy {
            initial: Duration::from_millis(self.initial_backoff_ms),
            max: Duration::from_millis(self.max_backoff_ms),
            rate: self.backoff_rate,
            timeout_floor: Duration::from_millis(self.timeout_floor_ms),
        }
    }
}

impl ClockConfig {
    pub fn margin(&self) -> Duration {
        Duration::from_secs(self.margin_hours.saturating_mul(3600))
    }
}

/// Release margin from a user-supplied hour count, bounded to
/// `1..=MAX_MARGIN_HOURS`.
pub fn margin_from_hours(hours: u64) -> common::Result<Duration> {
    if hours == 0 || hours > MAX_MARGIN_HOURS {
        return Err(common::Error::Config(format!(
            "margin_hours must be between 1 and {MAX_MARGIN_HOURS}, got: {hours}"
        )));
    }
    Ok(Duration::from_secs(hours * 3600))
}

impl AuthConfig {
    /// Session file path: explicit setting, else `$XDG_CONFIG_HOME/aoc/`,
    /// else `~/.config/aoc/`, else the working directory.
    pub fn credentials_path(&self) -> PathBuf {
        if let Some(ref path) = self.credentials_file {
            return path.clone();
        }
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")));
        match base {
            Some(base) => base.join("aoc").join("sessions.json"),
            None => PathBuf::from(".aoc-sessions.json"),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Like [`Config::load`], but a missing `aoc.toml` in the working
    /// directory means "use defaults". An explicitly named file must exist.
    pub fn load_or_default(path: &Path) -> common::Result<Self> {
        if path == Path::new(DEFAULT_CONFIG_FILE) && !path.exists() {
            let mut config = Config::default();
            config.apply_env();
            config.validate()?;
            return Ok(config);
        }
        Self::load(path)
    }

    /// Resolve config file path from CLI arg or AOC_CONFIG env var.
    pub fn resolve_path(cli_path: Option<&Path>) -> PathBuf {
        if let Some(p) = cli_path {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("AOC_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    fn apply_env(&mut self) {
        if let Ok(session) = std::env::var("AOC_SESSION") {
            self.auth.session = Secret::from_trimmed(&session);
        }
    }

    fn validate(&self) -> common::Result<()> {
        let client = &self.client;
        if !client.base_url.starts_with("http://") && !client.base_url.starts_with("https://") {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                client.base_url
            )));
        }
        if client.initial_backoff_ms == 0 {
            return Err(common::Error::Config(
                "initial_backoff_ms must be greater than 0".into(),
            ));
        }
        if client.max_backoff_ms < client.initial_backoff_ms {
            return Err(common::Error::Config(format!(
                "max_backoff_ms ({}) must not be below initial_backoff_ms ({})",
                client.max_backoff_ms, client.initial_backoff_ms
            )));
        }
        if !client.backoff_rate.is_finite() || client.backoff_rate < 1.0 {
            return Err(common::Error::Config(format!(
                "backoff_rate must be at least 1.0, got: {}",
                client.backoff_rate
            )));
        }
        if client.timeout_floor_ms == 0 {
            return Err(common::Error::Config(
                "timeout_floor_ms must be greater than 0".into(),
            ));
        }
        margin_from_hours(self.clock.margin_hours)?;
        if self.auth.account.trim().is_empty() {
            return Err(common::Error::Config("account must not be empty".into()));
        }
        Ok(())
    }
}
