//! Boundary-crossing refresh logic.
//!
//! The scheduler tracks the currently visible items, buckets them by period,
//! and recomputes exactly the buckets whose time-step index changed since the
//! last tick. It owns no timer of its own — `service` drives `tick_now` from
//! a single recurring tokio interval, and tests drive `on_tick` directly.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use keywheel_totp::totp::core;
use keywheel_totp::totp::expiry;
use keywheel_totp::totp::types::{Code, OtpError};

use crate::refresh::traits::{CodeSink, ErrorSink, SecretProvider, TimeSource};
use crate::refresh::types::{CodeUpdate, PeriodBucket, TrackedItem};

pub struct RefreshScheduler {
    items: HashMap<String, TrackedItem>,
    /// `BTreeMap` so batches come out in stable period order.
    buckets: BTreeMap<u32, PeriodBucket>,
    time: Arc<dyn TimeSource>,
    secrets: Arc<dyn SecretProvider>,
    errors: Arc<dyn ErrorSink>,
    codes: Arc<dyn CodeSink>,
}

impl RefreshScheduler {
    pub fn new(
        time: Arc<dyn TimeSource>,
        secrets: Arc<dyn SecretProvider>,
        errors: Arc<dyn ErrorSink>,
        codes: Arc<dyn CodeSink>,
    ) -> Self {
        Self {
            items: HashMap::new(),
            buckets: BTreeMap::new(),
            time,
            secrets,
            errors,
            codes,
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Registry
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Rebuild the registry from the currently visible item ids.
    ///
    /// Replaces, never merges: ids absent from `item_ids` stop being tracked.
    /// Retained ids keep their config and last code; new ids are resolved
    /// through the `SecretProvider` (a resolution failure is reported and the
    /// id skipped). Bucket boundary indices restart at the current time step,
    /// so freshly (re)configured items emit on the next boundary crossing.
    pub fn configure_scheduling(&mut self, item_ids: &[String]) {
        let now = self.time.now_unix();
        let mut items = HashMap::with_capacity(item_ids.len());
        let mut buckets: BTreeMap<u32, PeriodBucket> = BTreeMap::new();

        for id in item_ids {
            if items.contains_key(id) {
                continue;
            }
            let item = match self.items.remove(id) {
                Some(existing) => existing,
                None => match self.secrets.resolve(id) {
                    Ok(config) => TrackedItem::new(id.clone(), config),
                    Err(err) => {
                        self.errors.report(&err, "configure_scheduling");
                        continue;
                    }
                },
            };
            let period = item.config.period;
            let bucket = buckets.entry(period).or_insert_with(|| PeriodBucket {
                item_ids: Vec::new(),
                last_boundary_index: core::time_step_at(now, period) as i64,
            });
            bucket.item_ids.push(id.clone());
            items.insert(id.clone(), item);
        }

        log::debug!(
            "refresh registry rebuilt: {} items across {} period buckets",
            items.len(),
            buckets.len()
        );
        self.items = items;
        self.buckets = buckets;
    }

    /// No items tracked.
    pub fn is_idle(&self) -> bool {
        self.items.is_empty()
    }

    pub fn tracked_len(&self) -> usize {
        self.items.len()
    }

    pub fn tracked_item(&self, item_id: &str) -> Option<&TrackedItem> {
        self.items.get(item_id)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Tick
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Read the injected clock and process one tick.
    pub fn tick_now(&mut self) {
        let now = self.time.now_unix();
        self.on_tick(now);
    }

    /// Process one tick at `now`.
    ///
    /// Buckets whose time-step index is unchanged are skipped without any
    /// generator work. For each bucket that crossed a boundary, every member
    /// is recomputed and the combined due set is emitted as one batch. A
    /// backward-moving clock changes the index too and simply recomputes.
    pub fn on_tick(&mut self, now: u64) {
        let mut batch: Vec<CodeUpdate> = Vec::new();

        for (&period, bucket) in self.buckets.iter_mut() {
            let index = core::time_step_at(now, period) as i64;
            if index == bucket.last_boundary_index {
                continue;
            }
            bucket.last_boundary_index = index;

            for id in &bucket.item_ids {
                let Some(item) = self.items.get_mut(id) else {
                    continue;
                };
                match core::compute(&item.config, now) {
                    Ok(code) => {
                        item.last_boundary_index = index;
                        batch.push(CodeUpdate {
                            item_id: id.clone(),
                            elapsed_fraction: expiry::elapsed_fraction(&code, now),
                            code: code.clone(),
                        });
                        item.last_code = Some(code);
                    }
                    Err(err) => {
                        // Permanent failure: surface once, leave the item in
                        // its bucket for the caller to drop.
                        if !item.error_reported {
                            self.errors.report(&err, "on_tick");
                            item.error_reported = true;
                        }
                    }
                }
            }
        }

        if !batch.is_empty() {
            log::debug!("tick recomputed {} due items", batch.len());
            self.codes.on_codes_updated(&batch);
        }
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    //  Forced refresh
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Recompute and emit a single item immediately, independent of its
    /// bucket's boundary index.
    ///
    /// Untracked ids are resolved through the `SecretProvider` without being
    /// added to the registry (detail screens open for items outside the
    /// visible list).
    pub fn force_refresh(&mut self, item_id: &str) -> Result<Code, OtpError> {
        let now = self.time.now_unix();
        let config = match self.items.get(item_id) {
            Some(item) => Arc::clone(&item.config),
            None => self.secrets.resolve(item_id).map_err(|err| {
                self.errors.report(&err, "force_refresh");
                err
            })?,
        };

        match core::compute(&config, now) {
            Ok(code) => {
                if let Some(item) = self.items.get_mut(item_id) {
                    item.last_boundary_index = core::time_step_at(now, config.period) as i64;
                    item.last_code = Some(code.clone());
                }
                let update = CodeUpdate {
                    item_id: item_id.to_string(),
                    elapsed_fraction: expiry::elapsed_fraction(&code, now),
                    code: code.clone(),
                };
                self.codes.on_codes_updated(std::slice::from_ref(&update));
                Ok(code)
            }
            Err(err) => {
                let first_failure = match self.items.get_mut(item_id) {
                    Some(item) => {
                        let first = !item.error_reported;
                        item.error_reported = true;
                        first
                    }
                    None => true,
                };
                if first_failure {
                    self.errors.report(&err, "force_refresh");
                }
                Err(err)
            }
        }
    }
}
