//! # KeyWheel – code refresh scheduling
//!
//! Keeps many independently-keyed, independently-perioded codes fresh with
//! exactly one recurring timer:
//!
//! - **Period buckets** – items sharing a period cross boundaries in lockstep
//!   and are recomputed together
//! - **No-op fast path** – ticks between boundaries cost one integer compare
//!   per bucket and zero HMAC work
//! - **Batched emission** – each tick publishes one atomic batch of updates
//! - **Injectable seams** – clock, secret resolution, and error reporting are
//!   trait objects supplied at construction

pub mod refresh;
