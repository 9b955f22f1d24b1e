//! Interactive session entry

use std::future::Future;
use std::pin::Pin;

use common::Secret;
use inquire::error::InquireError;
use inquire::{Password, PasswordDisplayMode};

use crate::error::{Error, Result};

/// Asks the user for a value.
pub trait Prompter: Send + Sync {
    /// Ask with `message`, re-asking with `retry_message` until the trimmed
    /// answer is non-empty.
    fn ask_non_empty<'a>(
        &'a self,
        message: &'a str,
        retry_message: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Secret<String>>> + Send + 'a>>;
}

/// Masked terminal prompt.
///
/// inquire blocks on stdin, so each prompt runs on the blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePrompter;

impl Prompter for ConsolePrompter {
    fn ask_non_empty<'a>(
        &'a self,
        message: &'a str,
        retry_message: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Secret<String>>> + Send + 'a>> {
        let message = message.to_owned();
        let retry_message = retry_message.to_owned();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || ask_until_non_empty(&message, &retry_message))
                .await
                .map_err(|e| Error::Prompt(format!("prompt task failed: {e}")))?
        })
    }
}

fn ask_until_non_empty(message: &str, retry_message: &str) -> Result<Secret<String>> {
    let mut prompt = message;
    loop {
        let answer = Password::new(prompt)
            .without_confirmation()
            .with_display_mode(PasswordDisplayMode::Masked)
            .prompt()
            .map(Secret::new)
            .map_err(prompt_error)?;
        if let Some(token) = Secret::from_trimmed(answer.expose()) {
            return Ok(token);
        }
        prompt = retry_message;
    }
}

fn prompt_error(e: InquireError) -> Error {
    match e {
        InquireError::OperationCanceled | InquireError::OperationInterrupted => Error::Aborted,
        other => Error::Prompt(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_and_interrupt_abort() {
        assert!(matches!(
            prompt_error(InquireError::OperationCanceled),
            Error::Aborted
        ));
        assert!(matches!(
            prompt_error(InquireError::OperationInterrupted),
            Error::Aborted
        ));
    }

    #[test]
    fn other_prompt_failures_are_reported() {
        let err = prompt_error(InquireError::NotTTY);
        assert!(matches!(err, Error::Prompt(_)));
    }
}
