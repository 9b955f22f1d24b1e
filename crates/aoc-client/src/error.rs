//! Error types for platform requests

/// Errors from platform requests.
///
/// Transport failures and 5xx responses never surface here: they are
/// retried inside the client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Non-retryable status (>= 300, < 500). The message is the raw body.
    #[error("{body}")]
    Rejected { status: u16, body: String },

    #[error("request cancelled")]
    Cancelled,

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid puzzle part {0}: must be 1 or 2")]
    InvalidPart(u8),
}

impl Error {
    /// HTTP status of a rejected request.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
