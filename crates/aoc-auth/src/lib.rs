//! Session credential management for the advent puzzle platform
//!
//! The platform authenticates with a single opaque `session` cookie. This
//! crate finds one for an account and keeps it around:
//!
//! 1. `CredentialBroker::session_token()` looks the account up in a `SecretStore`
//! 2. A stored token is optionally probed via `Validator` and returned as-is
//! 3. Without one, the `Prompter` asks the user (again and again if it fails validation)
//! 4. The new token is written back to the store
//!
//! Store, prompter, and validator are trait objects so the CLI can plug in
//! the file store and terminal prompt while tests use in-memory stubs.

pub mod broker;
pub mod constants;
pub mod error;
pub mod prompt;
pub mod store;
pub mod validate;

pub use broker::CredentialBroker;
pub use constants::*;
pub use error::{Error, Result};
pub use prompt::{ConsolePrompter, Prompter};
pub use store::{FileStore, MemoryStore, SecretStore};
pub use validate::{HttpValidator, Validator};
