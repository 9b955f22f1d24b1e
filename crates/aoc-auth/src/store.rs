//! Session storage
//!
//! `SecretStore` is the get/set capability the broker needs. `FileStore`
//! keeps a JSON file of `{ service: { account: token } }`; all writes use
//! atomic temp-file + rename and a tokio Mutex serializes them, so
//! concurrent brokers sharing one store never interleave a write.
//! `MemoryStore` backs tests and one-off runs.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use common::Secret;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Boxed future returned by store operations (dyn-compatible).
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

type Sessions = BTreeMap<String, BTreeMap<String, String>>;

/// Persistent secret storage keyed by (service, account).
///
/// Uses `Pin<Box<dyn Future>>` return types so brokers can hold `Arc<dyn SecretStore>`.
pub trait SecretStore: Send + Sync {
    fn get<'a>(&'a self, service: &'a str, account: &'a str)
    -> StoreFuture<'a, Option<Secret<String>>>;

    fn set<'a>(
        &'a self,
        service: &'a str,
        account: &'a str,
        token: &'a Secret<String>,
    ) -> StoreFuture<'a, ()>;

    /// Delete a stored token. Returns whether one existed.
    fn remove<'a>(&'a self, service: &'a str, account: &'a str) -> StoreFuture<'a, bool>;
}

/// JSON-file-backed store with 0600 permissions.
pub struct FileStore {
    path: PathBuf,
    state: Mutex<Sessions>,
}

impl FileStore {
    /// Load sessions from `path`.
    ///
    /// A missing file is created as `{}` (and its parent directory with it).
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading session file: {e}")))?;
            let sessions: Sessions = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing session file: {e}")))?;
            info!(path = %path.display(), services = sessions.len(), "loaded sessions");
            sessions
        } else {
            info!(path = %path.display(), "session file not found, starting with empty store");
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(dir)
                    .await
                    .map_err(|e| Error::Io(format!("creating session directory: {e}")))?;
            }
            let sessions = Sessions::new();
            write_atomic(&path, &sessions).await?;
            sessions
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accounts with a stored token for `service`.
    pub async fn accounts(&self, service: &str) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .get(service)
            .map(|accounts| accounts.keys().cloned().collect())
            .unwrap_or_default()
    }

    async fn get_session(&self, service: &str, account: &str) -> Option<Secret<String>> {
        let state = self.state.lock().await;
        state
            .get(service)
            .and_then(|accounts| accounts.get(account))
            .map(|token| Secret::new(token.clone()))
    }

    async fn set_session(&self, service: &str, account: &str, token: &Secret<String>) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .entry(service.to_owned())
            .or_default()
            .insert(account.to_owned(), token.expose().clone());
        debug!(service, account, "stored session");
        write_atomic(&self.path, &state).await
    }

    async fn remove_session(&self, service: &str, account: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        let removed = match state.get_mut(service) {
            Some(accounts) => accounts.remove(account).is_some(),
            None => false,
        };
        if removed {
            if state.get(service).is_some_and(|a| a.is_empty()) {
                state.remove(service);
            }
            debug!(service, account, "removed session");
            write_atomic(&self.path, &state).await?;
        }
        Ok(removed)
    }
}

impl SecretStore for FileStore {
    fn get<'a>(
        &'a self,
        service: &'a str,
        account: &'a str,
    ) -> StoreFuture<'a, Option<Secret<String>>> {
        Box::pin(async move { Ok(self.get_session(service, account).await) })
    }

    fn set<'a>(
        &'a self,
        service: &'a str,
        account: &'a str,
        token: &'a Secret<String>,
    ) -> StoreFuture<'a, ()> {
        Box::pin(self.set_session(service, account, token))
    }

    fn remove<'a>(&'a self, service: &'a str, account: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(self.remove_session(service, account))
    }
}

/// In-process store; nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<Sessions>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemoryStore {
    fn get<'a>(
        &'a self,
        service: &'a str,
        account: &'a str,
    ) -> StoreFuture<'a, Option<Secret<String>>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            Ok(state
                .get(service)
                .and_then(|accounts| accounts.get(account))
                .map(|token| Secret::new(token.clone())))
        })
    }

    fn set<'a>(
        &'a self,
        service: &'a str,
        account: &'a str,
        token: &'a Secret<String>,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state
                .entry(service.to_owned())
                .or_default()
                .insert(account.to_owned(), token.expose().clone());
            Ok(())
        })
    }

    fn remove<'a>(&'a self, service: &'a str, account: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            Ok(state
                .get_mut(service)
                .is_some_and(|accounts| accounts.remove(account).is_some()))
        })
    }
}

/// Write sessions to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Sets file permissions to 0600 (owner read/write only) since
/// the file contains session cookies.
async fn write_atomic(path: &Path, data: &Sessions) -> Result<()> {
    let json = Secret::new(
        serde_json::to_string_pretty(data)
            .map_err(|e| Error::CredentialParse(format!("serializing sessions: {e}")))?,
    );

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Io("session path has no file name".into()))?
        .to_string_lossy();
    let tmp_path = dir.join(format!(".{file_name}.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.expose().as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp session file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting session file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp session file: {e}")))?;

    debug!(path = %path.display(), "persisted sessions");
    Ok(())
}
