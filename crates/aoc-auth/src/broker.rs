//! Session acquisition
//!
//! A stored session is trusted as long as it passes validation; it is never
//! refreshed or replaced automatically. Only a missing session leads to a
//! prompt, and only a prompted session is written back.

use std::sync::Arc;

use common::Secret;
use tracing::{debug, info, warn};

use crate::constants::{INVALID_SESSION_MESSAGE, PROMPT_MESSAGE, RETRY_MESSAGE, SERVICE_NAME};
use crate::error::{Error, Result};
use crate::prompt::Prompter;
use crate::store::SecretStore;
use crate::validate::Validator;

pub struct CredentialBroker {
    store: Arc<dyn SecretStore>,
    prompter: Arc<dyn Prompter>,
    validator: Arc<dyn Validator>,
}

impl CredentialBroker {
    pub fn new(
        store: Arc<dyn SecretStore>,
        prompter: Arc<dyn Prompter>,
        validator: Arc<dyn Validator>,
    ) -> Self {
        Self {
            store,
            prompter,
            validator,
        }
    }

    /// Session for `account_id`, from the store or from the user.
    ///
    /// A stored session that fails validation is an `Error::Authentication`;
    /// the user is not asked for a replacement and the store is left alone.
    /// A prompted session is re-asked until it validates (when `verify`),
    /// then persisted exactly once.
    pub async fn session_token(&self, account_id: &str, verify: bool) -> Result<Secret<String>> {
        if let Some(token) = self.store.get(SERVICE_NAME, account_id).await? {
            if verify && !self.validator.is_valid(&token).await? {
                warn!(account_id, "stored session rejected by the platform");
                return Err(Error::Authentication(format!(
                    "stored session for account '{account_id}' is no longer accepted; run `aoc logout` and log in again"
                )));
            }
            debug!(account_id, verified = verify, "using stored session");
            return Ok(token);
        }

        info!(account_id, "no stored session, asking the user");
        let token = self.acquire(verify).await?;
        self.store.set(SERVICE_NAME, account_id, &token).await?;
        info!(account_id, "stored new session");
        Ok(token)
    }

    /// Drop the stored session for `account_id`.
    pub async fn forget(&self, account_id: &str) -> Result<bool> {
        let removed = self.store.remove(SERVICE_NAME, account_id).await?;
        if removed {
            info!(account_id, "removed stored session");
        }
        Ok(removed)
    }

    async fn acquire(&self, verify: bool) -> Result<Secret<String>> {
        let mut message = PROMPT_MESSAGE;
        loop {
            let token = self.prompter.ask_non_empty(message, RETRY_MESSAGE).await?;
            if !verify || self.validator.is_valid(&token).await? {
                return Ok(token);
            }
            warn!("entered session rejected by the platform, asking again");
            message = INVALID_SESSION_MESSAGE;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_ACCOUNT;
    use crate::store::{MemoryStore, StoreFuture};
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// MemoryStore that counts calls.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        writes: AtomicUsize,
    }

    impl SecretStore for CountingStore {
        fn get<'a>(
            &'a self,
            service: &'a str,
            account: &'a str,
        ) -> StoreFuture<'a, Option<Secret<String>>> {
            self.inner.get(service, account)
        }

        fn set<'a>(
            &'a self,
            service: &'a str,
            account: &'a str,
            token: &'a Secret<String>,
        ) -> StoreFuture<'a, ()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.set(service, account, token)
        }

        fn remove<'a>(&'a self, service: &'a str, account: &'a str) -> StoreFuture<'a, bool> {
            self.inner.remove(service, account)
        }
    }

    /// Hands out scripted answers; fails the test if it runs out.
    struct ScriptedPrompter {
        answers: Mutex<VecDeque<&'static str>>,
        asked: AtomicUsize,
    }

    impl ScriptedPrompter {
        fn new(answers: &[&'static str]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().copied().collect()),
                asked: AtomicUsize::new(0),
            }
        }
    }

    impl Prompter for ScriptedPrompter {
        fn ask_non_empty<'a>(
            &'a self,
            _message: &'a str,
            _retry_message: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Secret<String>>> + Send + 'a>> {
            self.asked.fetch_add(1, Ordering::SeqCst);
            let answer = self.answers.lock().unwrap().pop_front();
            Box::pin(async move {
                answer
                    .and_then(Secret::from_trimmed)
                    .ok_or(Error::Aborted)
            })
        }
    }

    /// Accepts exactly the listed tokens.
    struct AllowList {
        valid: Vec<&'static str>,
        checks: AtomicUsize,
    }

    impl AllowList {
        fn new(valid: &[&'static str]) -> Self {
            Self {
                valid: valid.to_vec(),
                checks: AtomicUsize::new(0),
            }
        }
    }

    impl Validator for AllowList {
        fn is_valid<'a>(
            &'a self,
            token: &'a Secret<String>,
        ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
            self.checks.fetch_add(1, Ordering::SeqCst);
            let ok = self.valid.contains(&token.expose().as_str());
            Box::pin(async move { Ok(ok) })
        }
    }

    fn broker(
        store: &Arc<CountingStore>,
        prompter: &Arc<ScriptedPrompter>,
        validator: &Arc<AllowList>,
    ) -> CredentialBroker {
        CredentialBroker::new(store.clone(), prompter.clone(), validator.clone())
    }

    #[tokio::test]
    async fn empty_store_prompts_once_and_writes_once() {
        let store = Arc::new(CountingStore::default());
        let prompter = Arc::new(ScriptedPrompter::new(&["  fresh-token \n"]));
        let validator = Arc::new(AllowList::new(&[]));

        let token = broker(&store, &prompter, &validator)
            .session_token(DEFAULT_ACCOUNT, false)
            .await
            .unwrap();

        assert_eq!(token.expose(), "fresh-token");
        assert_eq!(prompter.asked.load(Ordering::SeqCst), 1);
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
        assert_eq!(validator.checks.load(Ordering::SeqCst), 0);
        let stored = store.get(SERVICE_NAME, DEFAULT_ACCOUNT).await.unwrap();
        assert_eq!(stored.unwrap().expose(), "fresh-token");
    }

    #[tokio::test]
    async fn stored_token_rejected_is_authentication_error() {
        let store = Arc::new(CountingStore::default());
        store
            .inner
            .set(SERVICE_NAME, DEFAULT_ACCOUNT, &Secret::new("stale".into()))
            .await
            .unwrap();
        let prompter = Arc::new(ScriptedPrompter::new(&["never-asked"]));
        let validator = Arc::new(AllowList::new(&["other"]));

        let result = broker(&store, &prompter, &validator)
            .session_token(DEFAULT_ACCOUNT, true)
            .await;

        assert!(matches!(result, Err(Error::Authentication(_))));
        assert_eq!(prompter.asked.load(Ordering::SeqCst), 0);
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stored_token_returned_without_verification() {
        let store = Arc::new(CountingStore::default());
        store
            .inner
            .set(SERVICE_NAME, "work", &Secret::new("stored".into()))
            .await
            .unwrap();
        let prompter = Arc::new(ScriptedPrompter::new(&[]));
        let validator = Arc::new(AllowList::new(&[]));

        let token = broker(&store, &prompter, &validator)
            .session_token("work", false)
            .await
            .unwrap();

        assert_eq!(token.expose(), "stored");
        assert_eq!(validator.checks.load(Ordering::SeqCst), 0);
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stored_token_passing_verification_is_returned() {
        let store = Arc::new(CountingStore::default());
        store
            .inner
            .set(SERVICE_NAME, DEFAULT_ACCOUNT, &Secret::new("good".into()))
            .await
            .unwrap();
        let prompter = Arc::new(ScriptedPrompter::new(&[]));
        let validator = Arc::new(AllowList::new(&["good"]));

        let token = broker(&store, &prompter, &validator)
            .session_token(DEFAULT_ACCOUNT, true)
            .await
            .unwrap();

        assert_eq!(token.expose(), "good");
        assert_eq!(validator.checks.load(Ordering::SeqCst), 1);
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn prompt_repeats_until_token_validates() {
        let store = Arc::new(CountingStore::default());
        let prompter = Arc::new(ScriptedPrompter::new(&["typo", "expired", "good"]));
        let validator = Arc::new(AllowList::new(&["good"]));

        let token = broker(&store, &prompter, &validator)
            .session_token(DEFAULT_ACCOUNT, true)
            .await
            .unwrap();

        assert_eq!(token.expose(), "good");
        assert_eq!(prompter.asked.load(Ordering::SeqCst), 3);
        assert_eq!(validator.checks.load(Ordering::SeqCst), 3);
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn aborted_prompt_writes_nothing() {
        let store = Arc::new(CountingStore::default());
        let prompter = Arc::new(ScriptedPrompter::new(&[]));
        let validator = Arc::new(AllowList::new(&[]));

        let result = broker(&store, &prompter, &validator)
            .session_token(DEFAULT_ACCOUNT, false)
            .await;

        assert!(matches!(result, Err(Error::Aborted)));
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn accounts_are_independent() {
        let store = Arc::new(CountingStore::default());
        let prompter = Arc::new(ScriptedPrompter::new(&["home-token", "work-token"]));
        let validator = Arc::new(AllowList::new(&[]));
        let broker = broker(&store, &prompter, &validator);

        let home = broker.session_token("home", false).await.unwrap();
        let work = broker.session_token("work", false).await.unwrap();
        let home_again = broker.session_token("home", false).await.unwrap();

        assert_eq!(home.expose(), "home-token");
        assert_eq!(work.expose(), "work-token");
        assert_eq!(home_again.expose(), "home-token");
        assert_eq!(prompter.asked.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn forget_removes_stored_session() {
        let store = Arc::new(CountingStore::default());
        let prompter = Arc::new(ScriptedPrompter::new(&["t"]));
        let validator = Arc::new(AllowList::new(&[]));
        let broker = broker(&store, &prompter, &validator);

        broker.session_token(DEFAULT_ACCOUNT, false).await.unwrap();
        assert!(broker.forget(DEFAULT_ACCOUNT).await.unwrap());
        assert!(!broker.forget(DEFAULT_ACCOUNT).await.unwrap());
    }
}
