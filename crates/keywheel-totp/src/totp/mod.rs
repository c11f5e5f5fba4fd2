//! TOTP crate: sub-modules.

pub mod types;
pub mod core;
pub mod expiry;
pub mod uri;

// Re-export top-level items for convenience.
pub use types::*;
