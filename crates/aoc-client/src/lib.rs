//! Resilient HTTP client for the advent puzzle platform
//!
//! Every request goes through a per-call backoff state machine: transport
//! failures and 5xx responses are retried indefinitely with exponential
//! backoff, anything else at or above 300 ends the call with the response
//! body as the error message.
//!
//! Request lifecycle:
//! 1. `Waiting`: sleep until the current backoff has elapsed since the last attempt
//! 2. Grow the backoff (capped) and derive the attempt timeout from it
//! 3. `Attempting`: send the request, classify the outcome
//! 4. `Succeeded` / `TerminalFailure` end the call, anything else goes back to 1
//!
//! Callers that need bounded execution pass a `CancellationToken`, checked at
//! every suspension point.

pub mod backoff;
pub mod client;
pub mod constants;
pub mod error;
pub mod puzzle;
pub mod retry;

pub use backoff::{Backoff, BackoffPolicy};
pub use client::{FormData, RetryingClient};
pub use constants::*;
pub use error::{Error, Result};
pub use puzzle::{Part, SubmissionOutcome, classify_submission};
pub use retry::{AttemptOutcome, ResponseClass, RetryState, classify_status, handle_outcome};
pub use tokio_util::sync::CancellationToken;
