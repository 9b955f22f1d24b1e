//! Shared types for the advent client workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
