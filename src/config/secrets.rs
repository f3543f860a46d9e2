//! Secret handling utilities.
//!
//! Re-exports secrecy types used for the ClickUp API token.

pub use secrecy::{ExposeSecret, SecretString};
