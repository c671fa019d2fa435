//! Check orchestration.
//!
//! [`MonitorChecker::check`] is the single entry point. It dispatches on the
//! configured [`CheckType`], composes the certificate evaluator into HTTP
//! checks and always resolves to a [`MonitorCheckResult`].

use std::sync::Arc;

use tokio::time::{Instant, timeout};
use tracing::{debug, info, warn};

use crate::certificate::{CertificateEvaluator, CertificateInspector, elapsed_ms};
use crate::config::{CheckType, CheckerOptions, MonitorCheckConfig};
use crate::error::{TransportError, ValidationError};
use crate::notification::DailyReminder;
use crate::status::AcceptedStatusCodes;
use crate::transport::{HttpRequest, HttpResponse, Transport, build_request};
use crate::types::{MonitorCheckResult, MonitorStatus};
use crate::validation::{validate_keyword, validate_url_present};

/// Runs monitor checks against the configured collaborators
pub struct MonitorChecker {
    transport: Arc<dyn Transport>,
    certificates: CertificateEvaluator,
    reminder: Option<Arc<DailyReminder>>,
    options: CheckerOptions,
}

impl MonitorChecker {
    pub fn new(
        transport: Arc<dyn Transport>,
        inspector: Arc<dyn CertificateInspector>,
        options: CheckerOptions,
    ) -> Self {
        let certificates = CertificateEvaluator::new(inspector, options.certificate_timeout());
        Self { transport, certificates, reminder: None, options }
    }

    /// Send daily reminders for failing certificates through `reminder`
    pub fn with_reminder(mut self, reminder: Arc<DailyReminder>) -> Self {
        self.reminder = Some(reminder);
        self
    }

    /// Run the check selected by `config.check_type`
    pub async fn check(&self, config: &MonitorCheckConfig) -> MonitorCheckResult {
        let result = match config.check_type {
            CheckType::Http => self.check_http(config).await,
            CheckType::HttpsCert => self.check_certificate(config).await,
            CheckType::Keyword => self.check_keyword(config).await,
        };

        debug!(
            monitor_id = config.monitor_id.as_deref().unwrap_or_default(),
            check_type = ?config.check_type,
            status = %result.status,
            ping = result.ping,
            "Check finished: {}",
            result.message
        );
        result
    }

    /// Certificate-only check
    pub async fn check_certificate(&self, config: &MonitorCheckConfig) -> MonitorCheckResult {
        let result = self
            .certificates
            .evaluate(&config.url, config.monitor_id.as_deref(), config.monitor_name.as_deref())
            .await;

        if let Some((monitor_id, monitor_name)) = config.identity() {
            self.remind(monitor_id, monitor_name, &result).await;
        }
        result
    }

    /// HTTP check, preceded by the certificate check when expiry notifications are on
    pub async fn check_http(&self, config: &MonitorCheckConfig) -> MonitorCheckResult {
        let start = Instant::now();

        if let Err(e) = validate_url_present(&config.url) {
            return MonitorCheckResult::down(e.to_string(), 0);
        }

        if config.notify_cert_expiry {
            if let Some(verdict) = self.certificate_precheck(config).await {
                return verdict;
            }
        }

        let (request, accepted) = match self.prepare(config) {
            Ok(prepared) => prepared,
            Err(e) => return MonitorCheckResult::down(e.to_string(), elapsed_ms(start)),
        };

        let response = match self.fetch(&request, config.ignore_tls).await {
            Ok(response) => response,
            Err(e) => return transport_failure(config, &e, start),
        };

        let status_code = response.status();
        let result = if accepted.accepts(status_code) {
            MonitorCheckResult::up(format!("Status code: {status_code}"), elapsed_ms(start))
        } else {
            MonitorCheckResult::down(format!("Unexpected status code: {status_code}"), elapsed_ms(start))
        };
        result.with_status_code(status_code)
    }

    /// HTTP check that also requires `keyword` in the response body
    pub async fn check_keyword(&self, config: &MonitorCheckConfig) -> MonitorCheckResult {
        let start = Instant::now();

        if let Err(e) = validate_url_present(&config.url) {
            return MonitorCheckResult::down(e.to_string(), 0);
        }
        let keyword = match validate_keyword(config.keyword.as_deref()) {
            Ok(keyword) => keyword,
            Err(e) => return MonitorCheckResult::down(e.to_string(), 0),
        };

        if self.options.keyword_certificate_precheck && config.notify_cert_expiry {
            if let Some(verdict) = self.certificate_precheck(config).await {
                return verdict;
            }
        }

        let (request, accepted) = match self.prepare(config) {
            Ok(prepared) => prepared,
            Err(e) => return MonitorCheckResult::down(e.to_string(), elapsed_ms(start)),
        };

        // Body reads share the request deadline
        let deadline = start + request.timeout;

        let response = match self.fetch(&request, config.ignore_tls).await {
            Ok(response) => response,
            Err(e) => return transport_failure(config, &e, start),
        };

        let status_code = response.status();
        if !accepted.accepts(status_code) {
            return MonitorCheckResult::down(
                format!("Unexpected status code: {status_code}"),
                elapsed_ms(start),
            )
            .with_status_code(status_code);
        }

        let body = match tokio::time::timeout_at(deadline, response.text()).await {
            Ok(Ok(body)) => body,
            Ok(Err(e)) => return transport_failure(config, &e, start),
            Err(_) => return transport_failure(config, &TransportError::Timeout, start),
        };

        let result = if body.contains(keyword) {
            MonitorCheckResult::up(
                format!("Keyword found, status code: {status_code}"),
                elapsed_ms(start),
            )
        } else {
            MonitorCheckResult::down("Keyword not found", elapsed_ms(start))
        };
        result.with_status_code(status_code)
    }

    /// Run the certificate check for identified https monitors; returns the verdict when DOWN
    async fn certificate_precheck(&self, config: &MonitorCheckConfig) -> Option<MonitorCheckResult> {
        let (monitor_id, monitor_name) = config.identity()?;
        if !config.url.starts_with("https://") {
            return None;
        }

        let verdict = self.certificates.evaluate(&config.url, Some(monitor_id), Some(monitor_name)).await;
        self.remind(monitor_id, monitor_name, &verdict).await;

        if verdict.is_down() {
            info!(monitor_id, monitor_name, "Certificate check failed, skipping request: {}", verdict.message);
            return Some(verdict);
        }
        None
    }

    fn prepare(
        &self,
        config: &MonitorCheckConfig,
    ) -> Result<(HttpRequest, AcceptedStatusCodes), ValidationError> {
        let accepted = AcceptedStatusCodes::parse(&config.accepted_status_range)?;
        let request = build_request(config, self.options.request_timeout())?;
        Ok((request, accepted))
    }

    async fn fetch(
        &self,
        request: &HttpRequest,
        ignore_tls: bool,
    ) -> Result<HttpResponse, TransportError> {
        match timeout(request.timeout, self.transport.fetch(request, ignore_tls)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        }
    }

    async fn remind(&self, monitor_id: &str, monitor_name: &str, result: &MonitorCheckResult) {
        if let Some(reminder) = &self.reminder {
            let outcome = reminder
                .maybe_notify_daily(monitor_id, monitor_name, result.certificate_days_remaining, result.status)
                .await;
            debug!(monitor_id, ?outcome, "Daily certificate reminder evaluated");
        }
    }
}

fn transport_failure(
    config: &MonitorCheckConfig,
    error: &TransportError,
    start: Instant,
) -> MonitorCheckResult {
    warn!(
        monitor_id = config.monitor_id.as_deref().unwrap_or_default(),
        url = %config.url,
        "Request failed: {error}"
    );
    MonitorCheckResult::down(error.to_string(), elapsed_ms(start))
}
