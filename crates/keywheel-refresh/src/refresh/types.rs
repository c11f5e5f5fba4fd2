//! Scheduling-layer value types.

use keywheel_totp::totp::types::{Code, OtpConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Tracked item
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One visible account being kept fresh by the scheduler.
///
/// The config is shared with the external secret store via `Arc` — the
/// engine never copies or persists key material. Mutable state is only
/// touched by the scheduler on tick or forced refresh.
#[derive(Debug)]
pub struct TrackedItem {
    /// Opaque identity supplied by the caller.
    pub id: String,
    pub config: Arc<OtpConfig>,
    /// Most recently derived code, if any.
    pub last_code: Option<Code>,
    /// Last time-step index a code was computed for (-1 before the first).
    pub last_boundary_index: i64,
    /// A permanent generator failure is reported once per tracked lifetime.
    pub(crate) error_reported: bool,
}

impl TrackedItem {
    pub fn new(id: String, config: Arc<OtpConfig>) -> Self {
        Self {
            id,
            config,
            last_code: None,
            last_boundary_index: -1,
            error_reported: false,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Period bucket
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Items sharing a period cross boundaries in lockstep, so they share one
/// boundary index. Rebuilt whenever the registry changes.
#[derive(Debug)]
pub(crate) struct PeriodBucket {
    pub item_ids: Vec<String>,
    pub last_boundary_index: i64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Batch element
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One entry of the batch published to the `CodeSink`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeUpdate {
    pub item_id: String,
    pub code: Code,
    /// Fraction of the period already elapsed at emission time, `[0, 1]`.
    pub elapsed_fraction: f64,
}
