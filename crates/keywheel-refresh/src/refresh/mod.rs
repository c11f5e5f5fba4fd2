//! Refresh crate: sub-modules.

pub mod types;
pub mod traits;
pub mod scheduler;
pub mod service;

// Re-export top-level items for convenience.
pub use types::*;
pub use traits::*;
pub use scheduler::RefreshScheduler;
pub use service::{RefreshService, SchedulerState, DEFAULT_TICK_INTERVAL};
