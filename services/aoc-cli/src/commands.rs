//! Subcommand handlers

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result, bail};
use aoc_auth::{
    ConsolePrompter, CredentialBroker, FileStore, HttpValidator, SERVICE_NAME, SecretStore,
};
use aoc_client::{CancellationToken, Part, RetryingClient, SubmissionOutcome};
use aoc_clock::{ChallengeClock, PuzzleDate};
use chrono::{DateTime, Datelike, Utc};
use common::Secret;
use tracing::{debug, info};

use crate::config::{self, Config};
use crate::workspace;

/// Everything a subcommand needs, built once from the config.
pub struct App {
    config: Config,
    account: String,
    clock: ChallengeClock,
    client: RetryingClient,
    cancel: CancellationToken,
}

impl App {
    pub fn new(config: Config, account: Option<String>, cancel: CancellationToken) -> Result<Self> {
        let client = RetryingClient::new(&config.client.base_url, config.client.backoff_policy())
            .context("building HTTP client")?;
        let clock = ChallengeClock::new(config.clock.margin());
        let account = account.unwrap_or_else(|| config.auth.account.clone());
        Ok(Self {
            config,
            account,
            clock,
            client,
            cancel,
        })
    }

    pub async fn login(&self, no_verify: bool) -> Result<()> {
        if self.config.auth.session.is_some() {
            println!("AOC_SESSION is set; the stored session is not used while it is.");
        }
        let broker = self.broker().await?;
        let verify = self.config.auth.verify && !no_verify;
        self.interruptible(broker.session_token(&self.account, verify))
            .await?;
        println!("Session for account '{}' is ready.", self.account);
        Ok(())
    }

    pub async fn logout(&self) -> Result<()> {
        let store = self.file_store().await?;
        let broker = self.broker_with(store.clone());
        if broker.forget(&self.account).await? {
            println!(
                "Removed session for account '{}' from {}.",
                self.account,
                store.path().display()
            );
            return Ok(());
        }
        let accounts = store.accounts(SERVICE_NAME).await;
        if accounts.is_empty() {
            println!("No sessions stored.");
        } else {
            println!(
                "No session stored for account '{}' (stored: {}).",
                self.account,
                accounts.join(", ")
            );
        }
        Ok(())
    }

    pub async fn input(&self, year: Option<i32>, day: Option<u32>, stdout: bool) -> Result<()> {
        let date = resolve_date_at(&self.clock, year, day, Utc::now())?;
        self.save_input(date, stdout).await
    }

    pub async fn puzzle(&self, year: Option<i32>, day: Option<u32>) -> Result<()> {
        let date = resolve_date_at(&self.clock, year, day, Utc::now())?;
        let session = self.stored_session().await?;
        let html = self
            .interruptible(self.client.fetch_puzzle(date, session.as_ref()))
            .await
            .with_context(|| format!("fetching puzzle for {date}"))?;
        let dir = workspace::dir_for_day(date.day())?;
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join("puzzle.html");
        tokio::fs::write(&path, html).await?;
        println!("{}", path.display());
        Ok(())
    }

    pub async fn submit(
        &self,
        part: u8,
        answer: &str,
        year: Option<i32>,
        day: Option<u32>,
    ) -> Result<()> {
        let part = Part::try_from(part)?;
        if answer.trim().is_empty() {
            bail!("answer must not be empty");
        }
        let date = resolve_date_at(&self.clock, year, day, Utc::now())?;
        let session = self.session().await?;
        let outcome = self
            .interruptible(self.client.submit_answer(date, part, answer, &session))
            .await
            .with_context(|| format!("submitting answer for {date}"))?;
        println!("{}", describe_outcome(&outcome));
        if outcome == SubmissionOutcome::Incorrect {
            bail!("answer rejected");
        }
        Ok(())
    }

    /// Sleep until the current release window opens, then optionally fetch it.
    pub async fn wait(&self, margin_hours: Option<u64>, fetch: bool) -> Result<()> {
        let clock = match margin_hours {
            Some(hours) => ChallengeClock::new(config::margin_from_hours(hours)?),
            None => self.clock,
        };
        let now = Utc::now();
        let target = wait_target_at(&clock, now)?;
        let remaining = ChallengeClock::until(target, now);
        if !remaining.is_zero() {
            println!(
                "Waiting {} for {}",
                format_countdown(remaining),
                format_instant(target)
            );
            info!(
                target = %target,
                remaining_secs = remaining.as_secs(),
                margin_hours = clock.margin().as_secs() / 3600,
                "waiting for release"
            );
            tokio::select! {
                _ = self.cancel.cancelled() => bail!("interrupted"),
                _ = tokio::time::sleep(remaining) => {}
            }
        }
        let date = PuzzleDate::new(target.year(), target.day())?;
        println!("{date} is unlocked.");
        if fetch {
            self.save_input(date, false).await?;
        }
        Ok(())
    }

    pub fn when(&self, year: Option<i32>, day: Option<u32>) -> Result<()> {
        let now = Utc::now();
        if year.is_some() || day.is_some() {
            let date = resolve_date_at(&self.clock, year, day, now)?;
            let release = date.release_instant()?;
            println!("{date}: {}", describe_release(release, now));
            return Ok(());
        }
        match self.clock.current_day_at(now) {
            Ok(today) => println!("Today: {today}"),
            Err(aoc_clock::Error::OutOfSeason) => println!("Today: no event running"),
            Err(e) => return Err(e.into()),
        }
        let prev = self.clock.prev_challenge_start_at(now)?;
        let next = self.clock.next_challenge_start_at(now)?;
        println!("Previous release: {}", describe_release(prev, now));
        println!("Next release: {}", describe_release(next, now));
        Ok(())
    }

    pub async fn init(&self, template: Option<&str>, day: Option<u32>) -> Result<()> {
        let (name, template) = workspace::select_template(&self.config.templates, template)?;
        let date = resolve_date_at(&self.clock, None, day, Utc::now())?;
        let dir = workspace::dir_for_day(date.day())?;
        let created = workspace::scaffold(&template.dir, &dir).await.with_context(|| {
            format!(
                "copying template '{name}' from {} to {}",
                template.dir.display(),
                dir.display()
            )
        })?;
        println!("{}: {created} file(s) from template '{name}'", dir.display());
        Ok(())
    }

    pub async fn run(&self, template: Option<&str>, day: Option<u32>) -> Result<()> {
        let (name, template) = workspace::select_template(&self.config.templates, template)?;
        let command = template
            .run
            .as_deref()
            .ok_or_else(|| crate::error::Error::NoRunCommand(name.to_string()))?;
        let date = resolve_date_at(&self.clock, None, day, Utc::now())?;
        let src = workspace::src_for_day(template, date.day());
        let command = workspace::interpolate_command(command, &src)?;
        tokio::select! {
            _ = self.cancel.cancelled() => bail!("interrupted"),
            result = workspace::run_command(&command) => Ok(result?),
        }
    }

    async fn save_input(&self, date: PuzzleDate, stdout: bool) -> Result<()> {
        let session = self.session().await?;
        let input = self
            .interruptible(self.client.fetch_input(date, &session))
            .await
            .with_context(|| format!("fetching input for {date}"))?;
        if stdout {
            print!("{input}");
            return Ok(());
        }
        let dir = workspace::dir_for_day(date.day())?;
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join("input.txt");
        tokio::fs::write(&path, input).await?;
        println!("{}", path.display());
        Ok(())
    }

    /// AOC_SESSION, else the broker (which may prompt).
    async fn session(&self) -> Result<Secret<String>> {
        if let Some(ref session) = self.config.auth.session {
            debug!("using session from AOC_SESSION");
            return Ok(session.clone());
        }
        let broker = self.broker().await?;
        let verify = self.config.auth.verify;
        self.interruptible(broker.session_token(&self.account, verify))
            .await
    }

    /// AOC_SESSION or a stored session, never prompting.
    async fn stored_session(&self) -> Result<Option<Secret<String>>> {
        if let Some(ref session) = self.config.auth.session {
            return Ok(Some(session.clone()));
        }
        let store = self.file_store().await?;
        Ok(store.get(SERVICE_NAME, &self.account).await?)
    }

    async fn file_store(&self) -> Result<Arc<FileStore>> {
        let path = self.config.auth.credentials_path();
        let store = FileStore::load(path.clone())
            .await
            .with_context(|| format!("opening session file {}", path.display()))?;
        Ok(Arc::new(store))
    }

    async fn broker(&self) -> Result<CredentialBroker> {
        Ok(self.broker_with(self.file_store().await?))
    }

    fn broker_with(&self, store: Arc<FileStore>) -> CredentialBroker {
        let validator = HttpValidator::new(self.client.clone(), &self.config.auth.probe_path);
        CredentialBroker::new(store, Arc::new(ConsolePrompter), Arc::new(validator))
    }

    async fn interruptible<T, E>(&self, fut: impl Future<Output = Result<T, E>>) -> Result<T>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        tokio::select! {
            _ = self.cancel.cancelled() => bail!("interrupted"),
            result = fut => Ok(result?),
        }
    }
}

/// Fill in whatever the user left out.
///
/// Without a day, the event must be running and today's puzzle is used.
/// Without a year, the most recent event is used.
pub fn resolve_date_at(
    clock: &ChallengeClock,
    year: Option<i32>,
    day: Option<u32>,
    now: DateTime<Utc>,
) -> Result<PuzzleDate> {
    let date = match (year, day) {
        (Some(year), Some(day)) => PuzzleDate::new(year, day)?,
        (None, Some(day)) => PuzzleDate::new(clock.latest_event_year_at(now)?, day)?,
        (year, None) => {
            let today = clock
                .current_day_at(now)
                .context("no puzzle today; pass --day")?;
            PuzzleDate::new(year.unwrap_or(today.year()), today.day())?
        }
    };
    Ok(date)
}

/// Release `wait` should sleep until.
///
/// Before December the clock's current release is next year's first day,
/// so the earlier of it and the next release wins.
pub fn wait_target_at(clock: &ChallengeClock, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let current = clock.current_challenge_start_time_at(now)?;
    let next = clock.next_challenge_start_at(now)?;
    Ok(current.min(next))
}

pub fn describe_outcome(outcome: &SubmissionOutcome) -> String {
    match outcome {
        SubmissionOutcome::Correct => "That's the right answer!".to_string(),
        SubmissionOutcome::Incorrect => "That's not the right answer.".to_string(),
        SubmissionOutcome::TooSoon { wait: Some(wait) } => {
            format!("Answered too recently; {wait} left to wait.")
        }
        SubmissionOutcome::TooSoon { wait: None } => "Answered too recently.".to_string(),
        SubmissionOutcome::AlreadyCompleted => "This part is already completed.".to_string(),
        SubmissionOutcome::Unknown => "Unrecognised response from the platform.".to_string(),
    }
}

fn describe_release(release: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let remaining = ChallengeClock::until(release, now);
    if remaining.is_zero() {
        format!("{} (released)", format_instant(release))
    } else {
        format!("{} (in {})", format_instant(release), format_countdown(remaining))
    }
}

fn format_instant(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// `1d 02h 03m 04s`, dropping leading zero units.
pub fn format_countdown(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    let (days, hours, mins, secs) = (secs / 86_400, secs / 3600 % 24, secs / 60 % 60, secs % 60);
    if days > 0 {
        format!("{days}d {hours:02}h {mins:02}m {secs:02}s")
    } else if hours > 0 {
        format!("{hours}h {mins:02}m {secs:02}s")
    } else if mins > 0 {
        format!("{mins}m {secs:02}s")
    } else {
        format!("{secs}s")
    }
}
