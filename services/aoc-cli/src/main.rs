//! Advent puzzle command-line helper
//!
//! Single binary that:
//! 1. Keeps a session cookie per account (prompting once, storing it)
//! 2. Fetches inputs and puzzle pages, submits answers, retrying on outages
//! 3. Knows when puzzles unlock and can sleep until the next one
//! 4. Scaffolds and runs per-day solutions from configured templates

mod commands;
mod config;
mod error;
mod workspace;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::App;
use crate::config::Config;
use aoc_client::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "aoc", version, about = "Advent puzzle helper")]
struct Cli {
    /// Config file (default: AOC_CONFIG, then ./aoc.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Account whose session to use
    #[arg(long, global = true)]
    account: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a session for the account, prompting if none is stored
    Login {
        /// Accept the entered session without probing the platform
        #[arg(long)]
        no_verify: bool,
    },
    /// Remove the stored session for the account
    Logout,
    /// Download puzzle input into <day>/input.txt
    Input {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        day: Option<u32>,
        /// Print instead of writing the file
        #[arg(long)]
        stdout: bool,
    },
    /// Download the puzzle page into <day>/puzzle.html
    Puzzle {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        day: Option<u32>,
    },
    /// Submit an answer
    Submit {
        /// 1 or 2
        part: u8,
        answer: String,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        day: Option<u32>,
    },
    /// Sleep until the current puzzle unlocks
    Wait {
        /// How long after a release it still counts as current
        #[arg(long)]
        margin_hours: Option<u64>,
        /// Download the input once unlocked
        #[arg(long)]
        fetch: bool,
    },
    /// Copy a solution template into the day directory
    Init {
        #[arg(long)]
        template: Option<String>,
        #[arg(long)]
        day: Option<u32>,
    },
    /// Run a template's command for a day
    Run {
        #[arg(long)]
        template: Option<String>,
        #[arg(long)]
        day: Option<u32>,
    },
    /// Show release times
    When {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        day: Option<u32>,
    },
}

fn init_tracing(json: bool) {
    // Logs go to stderr so stdout stays clean for command output
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config_path = Config::resolve_path(cli.config.as_deref());
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    debug!(path = %config_path.display(), "config loaded");

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let app = App::new(config, cli.account, cancel)?;
    match cli.command {
        Command::Login { no_verify } => app.login(no_verify).await,
        Command::Logout => app.logout().await,
        Command::Input { year, day, stdout } => app.input(year, day, stdout).await,
        Command::Puzzle { year, day } => app.puzzle(year, day).await,
        Command::Submit {
            part,
            answer,
            year,
            day,
        } => app.submit(part, &answer, year, day).await,
        Command::Wait {
            margin_hours,
            fetch,
        } => app.wait(margin_hours, fetch).await,
        Command::Init { template, day } => app.init(template.as_deref(), day).await,
        Command::Run { template, day } => app.run(template.as_deref(), day).await,
        Command::When { year, day } => app.when(year, day),
    }
}

/// Cancel in-flight work on SIGINT or SIGTERM.
async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => debug!("received SIGINT, cancelling"),
        _ = terminate => debug!("received SIGTERM, cancelling"),
    }
    cancel.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_submit_with_globals_after_subcommand() {
        let cli = Cli::try_parse_from([
            "aoc", "submit", "2", "1234", "--day", "5", "--account", "work",
        ])
        .unwrap();
        assert_eq!(cli.account.as_deref(), Some("work"));
        match cli.command {
            Command::Submit {
                part,
                answer,
                year,
                day,
            } => {
                assert_eq!(part, 2);
                assert_eq!(answer, "1234");
                assert_eq!(year, None);
                assert_eq!(day, Some(5));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_wait_flags() {
        let cli = Cli::try_parse_from(["aoc", "--log-json", "wait", "--margin-hours", "2"]).unwrap();
        assert!(cli.log_json);
        assert!(matches!(
            cli.command,
            Command::Wait {
                margin_hours: Some(2),
                fetch: false
            }
        ));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["aoc"]).is_err());
    }

    #[test]
    fn rejects_non_numeric_day() {
        assert!(Cli::try_parse_from(["aoc", "input", "--day", "three"]).is_err());
    }
}
