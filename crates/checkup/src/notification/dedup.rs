use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::NotificationKind;
use crate::clock::Clock;

/// Interval of the reset tick
const RESET_TICK: Duration = Duration::from_secs(60);

/// Notification kinds already sent, per monitor and local calendar day
#[derive(Debug, Default)]
pub struct NotificationDedupCache {
    sent: Mutex<HashMap<String, HashSet<String>>>,
}

impl NotificationDedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache key for a monitor on a given day, e.g. `m1-2024-06-01`
    pub fn key(monitor_id: &str, day: NaiveDate) -> String {
        format!("{monitor_id}-{}", day.format("%Y-%m-%d"))
    }

    /// Atomically mark `kind` as sent; false when it already was
    pub fn try_claim(&self, monitor_id: &str, day: NaiveDate, kind: NotificationKind) -> bool {
        self.lock().entry(Self::key(monitor_id, day)).or_default().insert(kind.tag())
    }

    /// Undo a claim whose dispatch failed
    pub fn release(&self, monitor_id: &str, day: NaiveDate, kind: NotificationKind) {
        let key = Self::key(monitor_id, day);
        let mut sent = self.lock();
        if let Some(kinds) = sent.get_mut(&key) {
            kinds.remove(&kind.tag());
            if kinds.is_empty() {
                sent.remove(&key);
            }
        }
    }

    pub fn contains(&self, monitor_id: &str, day: NaiveDate, kind: NotificationKind) -> bool {
        self.lock()
            .get(&Self::key(monitor_id, day))
            .is_some_and(|kinds| kinds.contains(&kind.tag()))
    }

    /// Number of (monitor, day) entries
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Clear everything when `now` falls in the first minute of a day
    pub fn clear_if_day_start(&self, now: NaiveDateTime) -> bool {
        if now.hour() != 0 || now.minute() != 0 {
            return false;
        }
        let mut sent = self.lock();
        let entries = sent.len();
        sent.clear();
        info!(entries, "Certificate notification cache cleared");
        true
    }

    /// Spawn the once-a-minute tick that resets the cache at midnight
    pub fn spawn_daily_reset(self: &Arc<Self>, clock: Arc<dyn Clock>) -> JoinHandle<()> {
        let cache = Arc::clone(self);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(RESET_TICK);

            loop {
                interval.tick().await;

                if !cache.clear_if_day_start(clock.now()) {
                    debug!("Notification cache reset tick, not midnight yet");
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, HashSet<String>>> {
        self.sent.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
