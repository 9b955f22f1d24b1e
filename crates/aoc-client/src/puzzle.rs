//! Puzzle endpoints
//!
//! Thin wrappers over [`RetryingClient::request`] for the three pages the
//! CLI needs. Response bodies are returned raw; only the answer page is
//! inspected, to tell the caller whether the submission was accepted.

use aoc_clock::PuzzleDate;
use common::Secret;
use tracing::info;

use crate::client::{FormData, RetryingClient};
use crate::error::{Error, Result};

/// Which half of a day's puzzle an answer is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    One,
    Two,
}

impl Part {
    /// Value of the `level` form field.
    pub fn level(self) -> &'static str {
        match self {
            Part::One => "1",
            Part::Two => "2",
        }
    }
}

impl TryFrom<u8> for Part {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Part::One),
            2 => Ok(Part::Two),
            other => Err(Error::InvalidPart(other)),
        }
    }
}

/// Result of posting an answer, read from the response page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Correct,
    Incorrect,
    /// Rate limited; `wait` is the platform's own description, e.g. "35s"
    TooSoon { wait: Option<String> },
    AlreadyCompleted,
    Unknown,
}

const CORRECT_PATTERNS: &[&str] = &["that's the right answer"];

const INCORRECT_PATTERNS: &[&str] = &["that's not the right answer"];

const TOO_SOON_PATTERNS: &[&str] = &["you gave an answer too recently"];

const COMPLETED_PATTERNS: &[&str] = &[
    "did you already complete it",
    "you don't seem to be solving the right level",
];

/// Classify an answer response body. Matching is case-insensitive.
pub fn classify_submission(body: &str) -> SubmissionOutcome {
    let lower = body.to_lowercase();
    let matches = |patterns: &[&str]| patterns.iter().any(|p| lower.contains(p));

    if matches(CORRECT_PATTERNS) {
        SubmissionOutcome::Correct
    } else if matches(INCORRECT_PATTERNS) {
        SubmissionOutcome::Incorrect
    } else if matches(TOO_SOON_PATTERNS) {
        SubmissionOutcome::TooSoon {
            wait: extract_wait(&lower),
        }
    } else if matches(COMPLETED_PATTERNS) {
        SubmissionOutcome::AlreadyCompleted
    } else {
        SubmissionOutcome::Unknown
    }
}

/// Pull "35s" out of "you have 35s left to wait".
fn extract_wait(lower: &str) -> Option<String> {
    let end = lower.find(" left to wait")?;
    let start = lower[..end].rfind("you have ")? + "you have ".len();
    let wait = lower[start..end].trim();
    (!wait.is_empty()).then(|| wait.to_string())
}

impl RetryingClient {
    /// Personal puzzle input. Requires a session.
    pub async fn fetch_input(&self, date: PuzzleDate, session: &Secret<String>) -> Result<String> {
        let path = format!("/{}/day/{}/input", date.year(), date.day());
        self.get(&path, Some(session)).await
    }

    /// Puzzle page HTML. Part two is only present with a session that
    /// solved part one.
    pub async fn fetch_puzzle(
        &self,
        date: PuzzleDate,
        session: Option<&Secret<String>>,
    ) -> Result<String> {
        let path = format!("/{}/day/{}", date.year(), date.day());
        self.get(&path, session).await
    }

    pub async fn submit_answer(
        &self,
        date: PuzzleDate,
        part: Part,
        answer: &str,
        session: &Secret<String>,
    ) -> Result<SubmissionOutcome> {
        let path = format!("/{}/day/{}/answer", date.year(), date.day());
        let mut form = FormData::new();
        form.insert("level".into(), part.level().into());
        form.insert("answer".into(), answer.trim().into());

        let body = self.post_form(&path, Some(session), &form).await?;
        let outcome = classify_submission(&body);
        info!(%date, ?part, ?outcome, "answer submitted");
        Ok(outcome)
    }
}
