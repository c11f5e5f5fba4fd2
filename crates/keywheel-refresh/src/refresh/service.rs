//! Timer ownership around the scheduler.
//!
//! One `RefreshService` drives one visible set of items with exactly one
//! recurring tokio interval, however many items are tracked. The interval
//! task holds only a `Weak` reference to the scheduler, so a service that is
//! dropped without `cleanup()` stops ticking on its own — but owners should
//! still call `cleanup()` on every teardown path.

use std::sync::{Arc, Weak};
use std::time::Duration;

use keywheel_totp::totp::types::{Code, OtpError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::refresh::scheduler::RefreshScheduler;
use crate::refresh::traits::{CodeSink, ErrorSink, SecretProvider, TimeSource};

/// Default tick cadence. Bounds countdown jitter to 250 ms while staying far
/// under the shortest supported period (30 s in practice).
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Shared scheduler handle the interval task upgrades on every tick.
pub type SchedulerState = Arc<Mutex<RefreshScheduler>>;

pub struct RefreshService {
    scheduler: SchedulerState,
    ticker: Option<JoinHandle<()>>,
    tick_interval: Duration,
}

impl RefreshService {
    pub fn new(
        time: Arc<dyn TimeSource>,
        secrets: Arc<dyn SecretProvider>,
        errors: Arc<dyn ErrorSink>,
        codes: Arc<dyn CodeSink>,
    ) -> Self {
        Self {
            scheduler: Arc::new(Mutex::new(RefreshScheduler::new(time, secrets, errors, codes))),
            ticker: None,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    /// Override the tick cadence (tests mostly).
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Direct access to the scheduler state, for callers that need to inspect
    /// tracked items.
    pub fn state(&self) -> &SchedulerState {
        &self.scheduler
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Operations
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Replace the tracked set. Arms the timer when the set becomes
    /// non-empty, releases it when the set empties.
    pub async fn configure_scheduling(&mut self, item_ids: &[String]) {
        let idle = {
            let mut scheduler = self.scheduler.lock().await;
            scheduler.configure_scheduling(item_ids);
            scheduler.is_idle()
        };
        if idle {
            self.release_ticker();
        } else {
            self.ensure_ticker();
        }
    }

    /// Immediate out-of-band recompute + emission for one item.
    pub async fn force_refresh(&self, item_id: &str) -> Result<Code, OtpError> {
        self.scheduler.lock().await.force_refresh(item_id)
    }

    /// Release the tick task. Mandatory on owner teardown; idempotent.
    pub fn cleanup(&mut self) {
        self.release_ticker();
    }

    /// Whether a tick task is currently running.
    pub fn has_active_ticker(&self) -> bool {
        self.ticker.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Internal
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    fn ensure_ticker(&mut self) {
        if self.has_active_ticker() {
            return;
        }
        self.ticker = Some(spawn_refresh_ticker(
            Arc::downgrade(&self.scheduler),
            self.tick_interval,
        ));
    }

    fn release_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
            log::debug!("refresh ticker released");
        }
    }
}

impl Drop for RefreshService {
    fn drop(&mut self) {
        self.release_ticker();
    }
}

/// Spawn the single recurring tick task.
///
/// The task exits on its own when the scheduler has been dropped (upgrade
/// fails), so it never keeps a dismissed owner alive.
fn spawn_refresh_ticker(
    scheduler: Weak<Mutex<RefreshScheduler>>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let Some(state) = scheduler.upgrade() else {
                break;
            };
            state.lock().await.tick_now();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refresh::types::CodeUpdate;
    use keywheel_totp::totp::types::{Algorithm, OtpConfig, OtpError, OtpErrorKind};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex as StdMutex;

    const SECRET_B32: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    struct FixedTime(AtomicU64);

    impl FixedTime {
        fn at(now: u64) -> Arc<Self> {
            Arc::new(Self(AtomicU64::new(now)))
        }

        fn set(&self, now: u64) {
            self.0.store(now, Ordering::SeqCst);
        }
    }

    impl TimeSource for FixedTime {
        fn now_unix(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    struct MapSecrets(HashMap<String, Arc<OtpConfig>>);

    impl SecretProvider for MapSecrets {
        fn resolve(&self, item_id: &str) -> Result<Arc<OtpConfig>, OtpError> {
            self.0.get(item_id).cloned().ok_or_else(|| {
                OtpError::new(OtpErrorKind::NotFound, format!("no secret for {}", item_id))
            })
        }
    }

    #[derive(Default)]
    struct RecordingSink(StdMutex<Vec<Vec<CodeUpdate>>>);

    impl RecordingSink {
        fn batch_count(&self) -> usize {
            self.0.lock().unwrap().len()
        }
    }

    impl CodeSink for RecordingSink {
        fn on_codes_updated(&self, batch: &[CodeUpdate]) {
            self.0.lock().unwrap().push(batch.to_vec());
        }
    }

    struct NullErrors;

    impl ErrorSink for NullErrors {
        fn report(&self, _error: &OtpError, _context: &str) {}
    }

    fn service(now: u64, secrets: Vec<(&str, u32)>) -> (RefreshService, Arc<FixedTime>, Arc<RecordingSink>) {
        let time = FixedTime::at(now);
        let sink = Arc::new(RecordingSink::default());
        let map = secrets
            .into_iter()
            .map(|(id, period)| {
                let config =
                    OtpConfig::from_base32(SECRET_B32, period, 6, Algorithm::Sha1).unwrap();
                (id.to_string(), Arc::new(config))
            })
            .collect();
        let svc = RefreshService::new(
            time.clone(),
            Arc::new(MapSecrets(map)),
            Arc::new(NullErrors),
            sink.clone(),
        );
        (svc, time, sink)
    }

    fn ids(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| s.to_string()).collect()
    }

    // ── Timer lifecycle ──────────────────────────────────────────

    #[tokio::test]
    async fn ticker_arms_on_first_items_and_releases_on_empty() {
        let (mut svc, _time, _sink) = service(5, vec![("a", 30)]);
        assert!(!svc.has_active_ticker());

        svc.configure_scheduling(&ids(&["a"])).await;
        assert!(svc.has_active_ticker());

        svc.configure_scheduling(&[]).await;
        assert!(!svc.has_active_ticker());

        // Re-arming after an empty configure works.
        svc.configure_scheduling(&ids(&["a"])).await;
        assert!(svc.has_active_ticker());
    }

    #[tokio::test]
    async fn cleanup_is_explicit_and_idempotent() {
        let (mut svc, _time, _sink) = service(5, vec![("a", 30)]);
        svc.configure_scheduling(&ids(&["a"])).await;
        svc.cleanup();
        assert!(!svc.has_active_ticker());
        svc.cleanup();
        assert!(!svc.has_active_ticker());
    }

    // ── Timer-driven refresh ─────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn ticker_drives_boundary_recomputation() {
        let (mut svc, time, sink) = service(5, vec![("a", 30)]);
        svc.configure_scheduling(&ids(&["a"])).await;

        // Let a few ticks elapse inside the current step: nothing due.
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(sink.batch_count(), 0);

        // Cross the 30 s boundary; the next tick picks it up.
        time.set(31);
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(sink.batch_count(), 1);

        // And stays quiet until the following boundary.
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(sink.batch_count(), 1);

        svc.cleanup();
    }

    #[tokio::test(start_paused = true)]
    async fn released_ticker_stops_refreshing() {
        let (mut svc, time, sink) = service(5, vec![("a", 30)]);
        svc.configure_scheduling(&ids(&["a"])).await;
        svc.configure_scheduling(&[]).await;

        time.set(31);
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(sink.batch_count(), 0);
    }

    // ── Forced refresh pass-through ──────────────────────────────

    #[tokio::test]
    async fn force_refresh_emits_through_sink() {
        let (mut svc, _time, sink) = service(5, vec![("a", 30)]);
        svc.configure_scheduling(&ids(&["a"])).await;

        let code = svc.force_refresh("a").await.unwrap();
        assert_eq!(code.value.len(), 6);
        assert_eq!(sink.batch_count(), 1);

        svc.cleanup();
    }

    #[tokio::test]
    async fn force_refresh_unknown_id_errors() {
        let (svc, _time, sink) = service(5, vec![]);
        let err = svc.force_refresh("ghost").await.unwrap_err();
        assert_eq!(err.kind, OtpErrorKind::NotFound);
        assert_eq!(sink.batch_count(), 0);
    }
}
