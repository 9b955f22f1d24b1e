//! Service-specific error types

use thiserror::Error;

/// Errors raised by the CLI itself rather than by the library crates.
#[derive(Error, Debug)]
pub enum Error {
    #[error("no template named '{0}' in the config file")]
    UnknownTemplate(String),

    #[error("no templates configured; add a [templates.<name>] section to the config file")]
    NoTemplates,

    #[error("several templates configured ({0}); pick one with --template")]
    AmbiguousTemplate(String),

    #[error("template '{0}' has no run command")]
    NoRunCommand(String),

    #[error("unknown variable '{0}' in command")]
    UnknownVariable(String),

    #[error("command failed: {0}")]
    CommandFailed(String),
}

/// Result alias using service Error
pub type Result<T> = std::result::Result<T, Error>;
