//! Daily certificate reminders and their deduplication.

mod dedup;
mod reminder;

use std::fmt;

use async_trait::async_trait;

use crate::IMMINENT_EXPIRY_DAYS;
use crate::types::MonitorStatus;

pub use dedup::NotificationDedupCache;
pub use reminder::{DailyReminder, ReminderOutcome, ReminderWindow};

/// Delivers status notifications; delivery channels live outside this crate
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn dispatch(
        &self,
        monitor_id: &str,
        status: MonitorStatus,
        message: &str,
        previous_status: Option<MonitorStatus>,
    ) -> crate::Result<()>;
}

/// Read access to persisted monitor state
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Last recorded status of a monitor, `None` if it was never checked
    async fn last_status(&self, monitor_id: &str) -> crate::Result<Option<MonitorStatus>>;
}

/// Kind of daily reminder; each kind fires at most once per monitor and day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    ExpiredCritical,
    /// Keyed by the day count so each remaining day gets its own reminder
    ExpiringCritical(i64),
    CheckFailedDaily,
}

impl NotificationKind {
    /// Select the reminder kind for a DOWN monitor
    pub fn for_days_remaining(days_remaining: Option<i64>) -> Self {
        match days_remaining {
            Some(days) if days <= 0 => NotificationKind::ExpiredCritical,
            Some(days) if days <= IMMINENT_EXPIRY_DAYS => NotificationKind::ExpiringCritical(days),
            _ => NotificationKind::CheckFailedDaily,
        }
    }

    /// Tag stored in the dedup cache
    pub fn tag(&self) -> String {
        match self {
            NotificationKind::ExpiredCritical => "expired-critical".to_string(),
            NotificationKind::ExpiringCritical(days) => format!("expiring-critical-{days}"),
            NotificationKind::CheckFailedDaily => "check-failed-daily".to_string(),
        }
    }

    pub fn message(&self, monitor_name: &str) -> String {
        match self {
            NotificationKind::ExpiredCritical => format!(
                "[Certificate expired] The SSL certificate of {monitor_name} is expired or invalid! \
                 Immediate action required!"
            ),
            NotificationKind::ExpiringCritical(days) => format!(
                "[Certificate urgent] The SSL certificate of {monitor_name} expires within {days} \
                 days (service marked as down)! Renew it now!"
            ),
            NotificationKind::CheckFailedDaily => format!(
                "[Certificate daily reminder] The SSL certificate check of {monitor_name} failed, \
                 the monitor is currently down."
            ),
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}
