//! Request state machine
//!
//! Pure transitions: the client loop performs the sleep and the send, then
//! feeds the attempt outcome back through [`handle_outcome`].

use std::time::Duration;

use crate::error::Error;

/// States of one logical request.
#[derive(Debug)]
pub enum RetryState {
    /// Backing off before the next attempt
    Waiting,
    /// Request in flight with the given timeout
    Attempting { timeout: Duration },
    /// Terminal: response body
    Succeeded(String),
    /// Terminal: non-retryable failure
    TerminalFailure(Error),
}

/// What a single attempt produced.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// Connection error, timeout, or body read failure
    Transport(String),
    /// Any HTTP response, with its body decoded as text
    Response { status: u16, body: String },
}

/// How a response status drives the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    Success,
    /// Server-side failure, try again after backing off
    Retryable,
    /// Redirects and client errors, never retried
    Terminal,
}

/// Classify an HTTP status: < 300 succeeds, >= 500 retries, the rest is terminal.
pub fn classify_status(status: u16) -> ResponseClass {
    match status {
        0..=299 => ResponseClass::Success,
        500.. => ResponseClass::Retryable,
        _ => ResponseClass::Terminal,
    }
}

/// Transition out of `Attempting`. Pure function: no I/O.
pub fn handle_outcome(outcome: AttemptOutcome) -> RetryState {
    match outcome {
        AttemptOutcome::Transport(_) => RetryState::Waiting,
        AttemptOutcome::Response { status, body } => match classify_status(status) {
            ResponseClass::Success => RetryState::Succeeded(body),
            ResponseClass::Retryable => RetryState::Waiting,
            ResponseClass::Terminal => RetryState::TerminalFailure(Error::Rejected { status, body }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> AttemptOutcome {
        AttemptOutcome::Response {
            status,
            body: body.into(),
        }
    }

    #[test]
    fn classify_success_range() {
        assert_eq!(classify_status(200), ResponseClass::Success);
        assert_eq!(classify_status(204), ResponseClass::Success);
        assert_eq!(classify_status(299), ResponseClass::Success);
    }

    #[test]
    fn classify_redirect_and_client_errors_terminal() {
        for status in [300, 302, 400, 401, 404, 429, 499] {
            assert_eq!(classify_status(status), ResponseClass::Terminal, "{status}");
        }
    }

    #[test]
    fn classify_server_errors_retryable() {
        for status in [500, 502, 503, 504, 599] {
            assert_eq!(classify_status(status), ResponseClass::Retryable, "{status}");
        }
    }

    #[test]
    fn transport_error_goes_back_to_waiting() {
        let state = handle_outcome(AttemptOutcome::Transport("connection refused".into()));
        assert!(matches!(state, RetryState::Waiting));
    }

    #[test]
    fn server_error_goes_back_to_waiting() {
        assert!(matches!(
            handle_outcome(response(503, "try later")),
            RetryState::Waiting
        ));
    }

    #[test]
    fn success_carries_body() {
        match handle_outcome(response(200, "ok")) {
            RetryState::Succeeded(body) => assert_eq!(body, "ok"),
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[test]
    fn client_error_is_terminal_with_body() {
        match handle_outcome(response(400, "Please don't repeatedly request this endpoint")) {
            RetryState::TerminalFailure(Error::Rejected { status, body }) => {
                assert_eq!(status, 400);
                assert_eq!(body, "Please don't repeatedly request this endpoint");
            }
            other => panic!("unexpected state: {other:?}"),
        }
    }
}
