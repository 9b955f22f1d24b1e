//! Error types for credential operations

/// Errors from credential lookup, storage, and validation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A stored session exists but the platform no longer accepts it
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("prompt failed: {0}")]
    Prompt(String),

    #[error("aborted by user")]
    Aborted,
}

impl From<aoc_client::Error> for Error {
    fn from(e: aoc_client::Error) -> Self {
        Error::Http(e.to_string())
    }
}

/// Result alias for credential operations.
pub type Result<T> = std::result::Result<T, Error>;
