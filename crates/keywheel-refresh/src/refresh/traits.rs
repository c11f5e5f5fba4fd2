//! Collaborator seams.
//!
//! The scheduler consumes a clock, a secret resolver, and an error reporter,
//! and produces code batches into a sink. All four are trait objects injected
//! at construction so tests can substitute deterministic fakes.

use chrono::Utc;
use keywheel_totp::totp::types::{OtpConfig, OtpError};
use std::sync::Arc;

use crate::refresh::types::CodeUpdate;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Consumed
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Wall-clock time. Skew is tolerated, not corrected.
pub trait TimeSource: Send + Sync {
    fn now_unix(&self) -> u64;
}

/// System wall clock.
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_unix(&self) -> u64 {
        Utc::now().timestamp().max(0) as u64
    }
}

/// Resolves an item id to its derivation config. Consulted only when an item
/// enters tracking or is force-refreshed while untracked — never per tick.
pub trait SecretProvider: Send + Sync {
    fn resolve(&self, item_id: &str) -> Result<Arc<OtpConfig>, OtpError>;
}

/// Fire-and-forget reporting for permanent failures.
pub trait ErrorSink: Send + Sync {
    fn report(&self, error: &OtpError, context: &str);
}

/// Reports through the `log` facade. Error messages never contain secret
/// material, so logging them verbatim is safe.
pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn report(&self, error: &OtpError, context: &str) {
        log::warn!("{}: {}", context, error);
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Produced
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Receives one atomic batch per tick that produced at least one due item,
/// and a single-element batch per forced refresh.
///
/// Called with the scheduler lock held — implementations must return quickly
/// and must not call back into the scheduler.
pub trait CodeSink: Send + Sync {
    fn on_codes_updated(&self, batch: &[CodeUpdate]);
}
