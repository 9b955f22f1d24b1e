//! Retrying request engine
//!
//! `RetryingClient` is cheap to clone and safe to share between tasks. The
//! backoff state lives inside each `request` call, so concurrent calls
//! never influence each other's timing.

use std::collections::BTreeMap;

use common::Secret;
use reqwest::header::{COOKIE, HeaderValue};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::backoff::{Backoff, BackoffPolicy};
use crate::constants::SESSION_COOKIE;
use crate::error::{Error, Result};
use crate::retry::{AttemptOutcome, RetryState, handle_outcome};

/// Flat form body for POST requests.
pub type FormData = BTreeMap<String, String>;

#[derive(Debug, Clone)]
pub struct RetryingClient {
    http: reqwest::Client,
    base_url: String,
    policy: BackoffPolicy,
}

impl RetryingClient {
    /// Build a client for `base_url` (scheme + host, no trailing path).
    ///
    /// Redirects are not followed: a 3xx is a terminal response.
    pub fn new(base_url: &str, policy: BackoffPolicy) -> Result<Self> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Http(format!("building HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            policy,
        })
    }

    pub async fn get(&self, path: &str, session: Option<&Secret<String>>) -> Result<String> {
        self.request(path, session, None).await
    }

    pub async fn post_form(
        &self,
        path: &str,
        session: Option<&Secret<String>>,
        form: &FormData,
    ) -> Result<String> {
        self.request(path, session, Some(form)).await
    }

    /// GET `path` (or POST `form` when present) until a non-retryable outcome.
    ///
    /// A missing or empty session sends the request without a cookie.
    pub async fn request(
        &self,
        path: &str,
        session: Option<&Secret<String>>,
        form: Option<&FormData>,
    ) -> Result<String> {
        self.request_with_cancel(path, session, form, &CancellationToken::new())
            .await
    }

    /// Same as [`RetryingClient::request`], giving up with `Error::Cancelled`
    /// once `cancel` fires. The token is observed during the backoff sleep
    /// and while an attempt is in flight.
    #[instrument(skip_all, fields(path = %path, post = form.is_some()))]
    pub async fn request_with_cancel(
        &self,
        path: &str,
        session: Option<&Secret<String>>,
        form: Option<&FormData>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let url = self.url(path);
        let cookie = session.map(session_cookie).transpose()?.flatten();

        let mut backoff = Backoff::new(&self.policy);
        let mut state = RetryState::Waiting;
        let mut attempt: u32 = 0;

        loop {
            state = match state {
                RetryState::Waiting => {
                    let delay = backoff.delay_before_attempt(Instant::now());
                    if !delay.is_zero() {
                        debug!(delay_ms = delay.as_millis() as u64, "backing off");
                        tokio::select! {
                            _ = cancel.cancelled() => return Err(Error::Cancelled),
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                    if cancel.is_cancelled() {
                        return Err(Error::Cancelled);
                    }
                    attempt += 1;
                    RetryState::Attempting {
                        timeout: backoff.begin_attempt(Instant::now()),
                    }
                }
                RetryState::Attempting { timeout } => {
                    let outcome = tokio::select! {
                        _ = cancel.cancelled() => return Err(Error::Cancelled),
                        outcome = self.attempt(&url, cookie.as_ref(), form, timeout) => outcome,
                    };
                    match &outcome {
                        AttemptOutcome::Transport(error) => warn!(
                            attempt,
                            error = %error,
                            next_backoff_ms = backoff.current().as_millis() as u64,
                            "request failed, retrying"
                        ),
                        AttemptOutcome::Response { status, .. } if *status >= 500 => warn!(
                            attempt,
                            status,
                            next_backoff_ms = backoff.current().as_millis() as u64,
                            "server error, retrying"
                        ),
                        AttemptOutcome::Response { status, .. } => {
                            debug!(attempt, status, "response received")
                        }
                    }
                    handle_outcome(outcome)
                }
                RetryState::Succeeded(body) => return Ok(body),
                RetryState::TerminalFailure(error) => return Err(error),
            };
        }
    }

    /// Single GET with no retry, returning only the status.
    ///
    /// Used to check whether a session is accepted by the platform.
    pub async fn probe(&self, path: &str, session: &Secret<String>) -> Result<u16> {
        let mut request = self
            .http
            .get(self.url(path))
            .timeout(self.policy.timeout_floor);
        if let Some(cookie) = session_cookie(session)? {
            request = request.header(COOKIE, cookie);
        }
        let response = request
            .send()
            .await
            .map_err(|e| Error::Http(format!("probe request failed: {e}")))?;
        Ok(response.status().as_u16())
    }

    async fn attempt(
        &self,
        url: &str,
        cookie: Option<&HeaderValue>,
        form: Option<&FormData>,
        timeout: std::time::Duration,
    ) -> AttemptOutcome {
        let mut request = match form {
            Some(form) => self.http.post(url).form(form),
            None => self.http.get(url),
        };
        request = request.timeout(timeout);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie.clone());
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return AttemptOutcome::Transport(e.to_string()),
        };
        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => AttemptOutcome::Response { status, body },
            Err(e) => AttemptOutcome::Transport(format!("reading response body: {e}")),
        }
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

/// `session=<token>` header value, or `None` for an empty token.
fn session_cookie(token: &Secret<String>) -> Result<Option<HeaderValue>> {
    if token.expose().is_empty() {
        return Ok(None);
    }
    let raw = Secret::new(format!("{SESSION_COOKIE}={}", token.expose()));
    let mut value = HeaderValue::from_str(raw.expose())
        .map_err(|_| Error::InvalidRequest("session token contains invalid characters".into()))?;
    value.set_sensitive(true);
    Ok(Some(value))
}
