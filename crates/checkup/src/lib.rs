//! Checkup - health check evaluation core
//!
//! This library decides whether an HTTP(S) endpoint is up or down, folds TLS
//! certificate expiry into that verdict, and keeps daily expiry reminders from
//! firing more than once per monitor and day. Transport, certificate retrieval,
//! persistence and notification delivery are reached through traits so callers
//! can plug in their own collaborators.

pub mod certificate;
pub mod checker;
pub mod clock;
pub mod config;
pub mod error;
pub mod notification;
pub mod settings;
pub mod status;
pub mod transport;
pub mod types;
pub mod validation;

// Re-export main types
pub use certificate::{CertificateEvaluator, CertificateInspector, CertificateVerdict};
pub use checker::MonitorChecker;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CheckType, CheckerOptions, MonitorCheckConfig};
pub use error::{OptionsError, TransportError, ValidationError};
pub use notification::{
    DailyReminder, NotificationDedupCache, NotificationKind, Notifier, ReminderOutcome,
    ReminderWindow, StatusStore,
};
pub use settings::Settings;
pub use status::{AcceptedStatusCodes, StatusRangeError, classify};
pub use transport::{HttpRequest, HttpResponse, ProxyAwareTransport, ReqwestTransport, Transport};
pub use types::{CertificateInfo, MonitorCheckResult, MonitorStatus};

/// Checkup result type for collaborator seams
pub type Result<T> = anyhow::Result<T>;

/// Certificates expiring within this many days mark the monitor as down
pub const IMMINENT_EXPIRY_DAYS: i64 = 7;
