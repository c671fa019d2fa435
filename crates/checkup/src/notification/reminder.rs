use std::sync::Arc;

use chrono::{NaiveDateTime, Timelike};
use tracing::{debug, error, info, warn};

use super::{NotificationDedupCache, NotificationKind, Notifier, StatusStore};
use crate::clock::Clock;
use crate::config::CheckerOptions;
use crate::types::MonitorStatus;

/// Daily slot in which reminders may fire, `[hour:00, hour:minutes)` local time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderWindow {
    pub hour: u32,
    pub minutes: u32,
}

impl Default for ReminderWindow {
    fn default() -> Self {
        Self { hour: 12, minutes: 5 }
    }
}

impl ReminderWindow {
    pub fn from_options(options: &CheckerOptions) -> Self {
        Self { hour: options.reminder_hour, minutes: options.reminder_window_minutes }
    }

    pub fn contains(&self, now: NaiveDateTime) -> bool {
        now.hour() == self.hour && now.minute() < self.minutes
    }
}

/// What a reminder attempt ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderOutcome {
    /// Monitor is up, nothing to remind about
    NotDown,
    OutsideWindow,
    /// Same kind already went out today
    AlreadySent,
    Dispatched(NotificationKind),
    /// Notifier failed; the claim was released
    Failed(NotificationKind),
}

/// Sends at most one reminder per monitor, kind and day while a certificate keeps failing
pub struct DailyReminder {
    cache: Arc<NotificationDedupCache>,
    clock: Arc<dyn Clock>,
    store: Arc<dyn StatusStore>,
    notifier: Arc<dyn Notifier>,
    window: ReminderWindow,
}

impl DailyReminder {
    pub fn new(
        cache: Arc<NotificationDedupCache>,
        clock: Arc<dyn Clock>,
        store: Arc<dyn StatusStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { cache, clock, store, notifier, window: ReminderWindow::default() }
    }

    pub fn with_window(mut self, window: ReminderWindow) -> Self {
        self.window = window;
        self
    }

    /// Dispatch the daily reminder for a DOWN certificate verdict, if one is due
    ///
    /// Failures of the store or notifier are logged and never surface to the caller.
    pub async fn maybe_notify_daily(
        &self,
        monitor_id: &str,
        monitor_name: &str,
        days_remaining: Option<i64>,
        status: MonitorStatus,
    ) -> ReminderOutcome {
        if status != MonitorStatus::Down {
            return ReminderOutcome::NotDown;
        }

        let now = self.clock.now();
        if !self.window.contains(now) {
            return ReminderOutcome::OutsideWindow;
        }

        let today = now.date();
        let kind = NotificationKind::for_days_remaining(days_remaining);
        if !self.cache.try_claim(monitor_id, today, kind) {
            debug!(monitor_id, %kind, "Daily reminder already sent today");
            return ReminderOutcome::AlreadySent;
        }

        let previous_status = match self.store.last_status(monitor_id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(monitor_id, "Failed to load last monitor status: {e:#}");
                None
            }
        };

        let message = kind.message(monitor_name);
        match self.notifier.dispatch(monitor_id, MonitorStatus::Down, &message, previous_status).await {
            Ok(()) => {
                info!(monitor_id, monitor_name, %kind, "Daily certificate reminder sent");
                ReminderOutcome::Dispatched(kind)
            }
            Err(e) => {
                error!(monitor_id, monitor_name, %kind, "Failed to send daily certificate reminder: {e:#}");
                self.cache.release(monitor_id, today, kind);
                ReminderOutcome::Failed(kind)
            }
        }
    }
}
