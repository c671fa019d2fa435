//! Certificate evaluation.
//!
//! The evaluator turns certificate metadata into a monitor verdict. Imminent
//! expiry is treated as an outage, not a warning: a certificate with a week or
//! less left marks the monitor down.

mod tls;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, timeout};
use tracing::{debug, warn};

use crate::IMMINENT_EXPIRY_DAYS;
use crate::error::TransportError;
use crate::types::{CertificateInfo, MonitorCheckResult, MonitorStatus};
use crate::validation::validate_https_endpoint;

pub use tls::TlsCertificateInspector;

/// Retrieves certificate metadata for a TLS endpoint
#[async_trait]
pub trait CertificateInspector: Send + Sync {
    async fn inspect(&self, hostname: &str, port: u16) -> Result<CertificateInfo, TransportError>;
}

/// Outcome of classifying certificate metadata, first matching rule wins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateVerdict {
    /// Valid, but expiring within [`IMMINENT_EXPIRY_DAYS`]
    ImminentExpiry { days_remaining: i64 },
    /// Past its expiry date (or expiring today)
    Expired { days_past: i64 },
    /// Failed verification while still inside its validity period
    Invalid,
    /// Valid with more than [`IMMINENT_EXPIRY_DAYS`] left
    Healthy { days_remaining: i64 },
}

impl CertificateVerdict {
    pub fn classify(info: &CertificateInfo) -> Self {
        let days = info.days_remaining;
        if info.valid && days > 0 && days <= IMMINENT_EXPIRY_DAYS {
            CertificateVerdict::ImminentExpiry { days_remaining: days }
        } else if days <= 0 {
            CertificateVerdict::Expired { days_past: -days }
        } else if !info.valid {
            CertificateVerdict::Invalid
        } else {
            CertificateVerdict::Healthy { days_remaining: days }
        }
    }

    pub fn status(&self) -> MonitorStatus {
        match self {
            CertificateVerdict::Healthy { .. } => MonitorStatus::Up,
            _ => MonitorStatus::Down,
        }
    }
}

impl fmt::Display for CertificateVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CertificateVerdict::ImminentExpiry { days_remaining } => write!(
                f,
                "[Certificate urgent] Expires in {days_remaining} days (service marked as down)!"
            ),
            CertificateVerdict::Expired { days_past } => {
                write!(f, "[Certificate expired] Expired {days_past} days ago!")
            }
            CertificateVerdict::Invalid => {
                write!(f, "[Certificate invalid] Certificate verification failed!")
            }
            CertificateVerdict::Healthy { days_remaining } => {
                write!(f, "HTTPS certificate valid ({days_remaining} days remaining)")
            }
        }
    }
}

/// Maps certificate metadata for a URL into a check result
#[derive(Clone)]
pub struct CertificateEvaluator {
    inspector: Arc<dyn CertificateInspector>,
    timeout: Duration,
}

impl CertificateEvaluator {
    pub fn new(inspector: Arc<dyn CertificateInspector>, timeout: Duration) -> Self {
        Self { inspector, timeout }
    }

    /// Evaluate the certificate served at `url`
    ///
    /// Never fails: validation problems, retrieval errors and timeouts all come
    /// back as DOWN results. Certificate days are only set when metadata was
    /// actually retrieved.
    pub async fn evaluate(
        &self,
        url: &str,
        monitor_id: Option<&str>,
        monitor_name: Option<&str>,
    ) -> MonitorCheckResult {
        let start = Instant::now();
        let monitor_id = monitor_id.unwrap_or_default();
        let monitor_name = monitor_name.unwrap_or_default();

        let (hostname, port) = match validate_https_endpoint(url) {
            Ok(endpoint) => endpoint,
            Err(e) => return MonitorCheckResult::down(e.to_string(), early_ping(url, start)),
        };

        let info = match timeout(self.timeout, self.inspector.inspect(&hostname, port)).await {
            Ok(Ok(info)) => info,
            Ok(Err(e)) => return certificate_failure(monitor_id, monitor_name, &e, start),
            Err(_) => {
                return certificate_failure(monitor_id, monitor_name, &TransportError::Timeout, start);
            }
        };

        let verdict = CertificateVerdict::classify(&info);
        debug!(monitor_id, hostname = %hostname, port, ?verdict, "Certificate evaluated");

        let result = match verdict.status() {
            MonitorStatus::Up => MonitorCheckResult::up(verdict.to_string(), elapsed_ms(start)),
            MonitorStatus::Down => MonitorCheckResult::down(verdict.to_string(), elapsed_ms(start)),
        };
        result.with_certificate_days(info.days_remaining)
    }
}

fn certificate_failure(
    monitor_id: &str,
    monitor_name: &str,
    error: &TransportError,
    start: Instant,
) -> MonitorCheckResult {
    warn!(monitor_id, monitor_name, "Failed to retrieve certificate: {error}");
    MonitorCheckResult::down(format!("Certificate check failed: {error}"), elapsed_ms(start))
}

/// Empty and non-https URLs are rejected without any work, so they report zero
fn early_ping(url: &str, start: Instant) -> u64 {
    if url.trim().is_empty() || !url.starts_with("https://") { 0 } else { elapsed_ms(start) }
}

pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
