//! Shared collaborators for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use checkup::{
    CertificateInfo, CertificateInspector, CheckerOptions, DailyReminder, HttpRequest,
    HttpResponse, ManualClock, MonitorChecker, MonitorStatus, NotificationDedupCache, Notifier,
    StatusStore, Transport, TransportError,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, day).unwrap().and_hms_opt(hour, minute, 0).unwrap()
}

/// Transport answering every request with the same status and body
pub struct MockTransport {
    status: u16,
    body: String,
    delay: Option<Duration>,
    calls: AtomicUsize,
    last: Mutex<Option<(HttpRequest, bool)>>,
}

impl MockTransport {
    pub fn responding(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            status,
            body: body.to_string(),
            delay: None,
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        })
    }

    /// Transport that never answers within any sensible timeout
    pub fn hanging() -> Arc<Self> {
        Arc::new(Self {
            status: 200,
            body: String::new(),
            delay: Some(Duration::from_secs(3600)),
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<(HttpRequest, bool)> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(
        &self,
        request: &HttpRequest,
        ignore_tls: bool,
    ) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some((request.clone(), ignore_tls));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(HttpResponse::new(self.status, self.body.clone()))
    }
}

/// Transport that always fails with the given error
pub struct FailingTransport(pub TransportError);

#[async_trait]
impl Transport for FailingTransport {
    async fn fetch(
        &self,
        _request: &HttpRequest,
        _ignore_tls: bool,
    ) -> Result<HttpResponse, TransportError> {
        Err(self.0.clone())
    }
}

/// Inspector returning fixed certificate metadata
pub struct MockInspector {
    info: Result<CertificateInfo, TransportError>,
    calls: AtomicUsize,
}

impl MockInspector {
    pub fn certificate(valid: bool, days_remaining: i64) -> Arc<Self> {
        Arc::new(Self {
            info: Ok(CertificateInfo { valid, days_remaining }),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(error: TransportError) -> Arc<Self> {
        Arc::new(Self { info: Err(error), calls: AtomicUsize::new(0) })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CertificateInspector for MockInspector {
    async fn inspect(&self, _hostname: &str, _port: u16) -> Result<CertificateInfo, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.info.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub monitor_id: String,
    pub status: MonitorStatus,
    pub message: String,
    pub previous_status: Option<MonitorStatus>,
}

/// Notifier recording every dispatch, optionally failing them
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Dispatched>>,
    fail: bool,
    delay: Option<Duration>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self { fail: true, ..Self::default() })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self { delay: Some(delay), ..Self::default() })
    }

    pub fn sent(&self) -> Vec<Dispatched> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn dispatch(
        &self,
        monitor_id: &str,
        status: MonitorStatus,
        message: &str,
        previous_status: Option<MonitorStatus>,
    ) -> checkup::Result<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            anyhow::bail!("webhook unreachable");
        }
        self.sent.lock().unwrap().push(Dispatched {
            monitor_id: monitor_id.to_string(),
            status,
            message: message.to_string(),
            previous_status,
        });
        Ok(())
    }
}

/// In-memory status store
#[derive(Default)]
pub struct MemoryStore {
    statuses: HashMap<String, MonitorStatus>,
    broken: bool,
}

impl MemoryStore {
    pub fn with(monitor_id: &str, status: MonitorStatus) -> Arc<Self> {
        let mut statuses = HashMap::new();
        statuses.insert(monitor_id.to_string(), status);
        Arc::new(Self { statuses, broken: false })
    }

    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn broken() -> Arc<Self> {
        Arc::new(Self { broken: true, ..Self::default() })
    }
}

#[async_trait]
impl StatusStore for MemoryStore {
    async fn last_status(&self, monitor_id: &str) -> checkup::Result<Option<MonitorStatus>> {
        if self.broken {
            anyhow::bail!("database is locked");
        }
        Ok(self.statuses.get(monitor_id).copied())
    }
}

/// A reminder wired to fresh collaborators, with the clock at `now`
pub struct ReminderFixture {
    pub cache: Arc<NotificationDedupCache>,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub reminder: Arc<DailyReminder>,
}

impl ReminderFixture {
    pub fn new(now: NaiveDateTime, notifier: Arc<RecordingNotifier>, store: Arc<dyn StatusStore>) -> Self {
        let cache = Arc::new(NotificationDedupCache::new());
        let clock = Arc::new(ManualClock::new(now));
        let reminder = Arc::new(DailyReminder::new(
            cache.clone(),
            clock.clone(),
            store,
            notifier.clone(),
        ));
        Self { cache, clock, notifier, reminder }
    }
}

pub fn checker(transport: Arc<dyn Transport>, inspector: Arc<dyn CertificateInspector>) -> MonitorChecker {
    MonitorChecker::new(transport, inspector, CheckerOptions::default())
}
