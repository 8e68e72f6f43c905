//! vr-core: shared error type, job identifiers, and configuration.
//!
//! This crate is the foundational dependency for the other vr-* crates. It
//! has no async runtime dependency and performs no network I/O.

pub mod config;
pub mod error;
pub mod ids;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::*;
