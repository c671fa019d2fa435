//! Wiring of the checker to real collaborators and one pass over the monitors.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use checkup::certificate::TlsCertificateInspector;
use checkup::{
    DailyReminder, MonitorCheckConfig, MonitorCheckResult, MonitorChecker, NotificationDedupCache,
    Notifier, ProxyAwareTransport, ReminderWindow, ReqwestTransport, SystemClock,
};
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::{Config, ConfigSettings, monitor_label};
use crate::notifier::{LogNotifier, WebhookNotifier};
use crate::state::StateFile;

/// One line of `check` output
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    pub monitor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitor_id: Option<String>,
    #[serde(flatten)]
    pub result: MonitorCheckResult,
}

pub struct Runner {
    checker: MonitorChecker,
    state: Arc<StateFile>,
}

impl Runner {
    pub fn new(checker: MonitorChecker, state: Arc<StateFile>) -> Self {
        Self { checker, state }
    }

    /// Build the runner for `config`, with daily reminders when `cache` is given
    pub fn from_config(
        config: &Config,
        state: Arc<StateFile>,
        cache: Option<Arc<NotificationDedupCache>>,
    ) -> Result<Self> {
        let settings = Arc::new(ConfigSettings::new(&config.proxy));
        let mut transport = ProxyAwareTransport::new(Arc::new(ReqwestTransport::direct()), settings);
        if let Some(proxy_url) = &config.proxy.url {
            transport = transport.with_proxy(Arc::new(ReqwestTransport::proxied(proxy_url.as_str())?));
        } else if config.proxy.enabled {
            warn!("Proxy is enabled but [proxy] url is missing");
        }

        let inspector = TlsCertificateInspector::with_native_roots()
            .context("Failed to set up certificate inspection")?;
        let mut checker =
            MonitorChecker::new(Arc::new(transport), Arc::new(inspector), config.checker.clone());

        if let Some(cache) = cache {
            let notifier: Arc<dyn Notifier> = match &config.notifier.webhook_url {
                Some(url) => Arc::new(WebhookNotifier::new(url)?),
                None => Arc::new(LogNotifier),
            };
            let reminder = DailyReminder::new(cache, Arc::new(SystemClock), state.clone(), notifier)
                .with_window(ReminderWindow::from_options(&config.checker));
            checker = checker.with_reminder(Arc::new(reminder));
        }

        Ok(Self::new(checker, state))
    }

    /// Check all `monitors` concurrently and record their statuses
    pub async fn run_pass(&self, monitors: &[&MonitorCheckConfig]) -> Result<Vec<CheckOutcome>> {
        let results = join_all(monitors.iter().map(|monitor| self.checker.check(monitor))).await;

        let outcomes: Vec<CheckOutcome> = monitors
            .iter()
            .zip(results)
            .map(|(monitor, result)| self.record(monitor, result))
            .collect();

        self.state.save().await?;

        let up = outcomes.iter().filter(|outcome| outcome.result.is_up()).count();
        info!(checked = outcomes.len(), up, down = outcomes.len() - up, "Check pass finished");
        Ok(outcomes)
    }

    /// Check one monitor and persist its status
    pub async fn run_monitor(&self, monitor: &MonitorCheckConfig) -> Result<CheckOutcome> {
        let outcome = self.record(monitor, self.checker.check(monitor).await);
        self.state.save().await?;
        debug!(monitor = %outcome.monitor, status = %outcome.result.status, "Monitor checked");
        Ok(outcome)
    }

    /// Check every monitor on its own `period`, sending outcomes to `outcomes`
    ///
    /// A slow monitor only delays its own next check.
    pub fn spawn_watchers(
        self: &Arc<Self>,
        monitors: &[&MonitorCheckConfig],
        period: Duration,
        outcomes: mpsc::UnboundedSender<CheckOutcome>,
    ) -> JoinSet<()> {
        let mut watchers = JoinSet::new();

        for monitor in monitors {
            let runner = Arc::clone(self);
            let monitor = (*monitor).clone();
            let outcomes = outcomes.clone();

            watchers.spawn(async move {
                let mut ticker = tokio::time::interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    ticker.tick().await;
                    match runner.run_monitor(&monitor).await {
                        Ok(outcome) => {
                            if outcomes.send(outcome).is_err() {
                                break;
                            }
                        }
                        Err(e) => error!(monitor = %monitor_label(&monitor), "Check failed: {e:#}"),
                    }
                }
            });
        }

        watchers
    }

    fn record(&self, monitor: &MonitorCheckConfig, result: MonitorCheckResult) -> CheckOutcome {
        if let Some(monitor_id) = monitor.monitor_id.as_deref() {
            self.state.record(monitor_id, &result);
        }
        CheckOutcome { monitor: monitor_label(monitor), monitor_id: monitor.monitor_id.clone(), result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use checkup::{CertificateInfo, CertificateInspector, CheckerOptions, MonitorStatus, TransportError};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct HealthyCertificates;

    #[async_trait]
    impl CertificateInspector for HealthyCertificates {
        async fn inspect(&self, _hostname: &str, _port: u16) -> Result<CertificateInfo, TransportError> {
            Ok(CertificateInfo { valid: true, days_remaining: 60 })
        }
    }

    #[tokio::test]
    async fn test_pass_records_identified_monitors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/up"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(StateFile::load(dir.path().join("state.json")).await.unwrap());
        let checker = MonitorChecker::new(
            Arc::new(ReqwestTransport::direct()),
            Arc::new(HealthyCertificates),
            CheckerOptions::default(),
        );
        let runner = Runner::new(checker, state.clone());

        let up = MonitorCheckConfig::http(format!("{}/up", server.uri())).with_monitor("m1", "Up");
        let down = MonitorCheckConfig::http(format!("{}/down", server.uri()));
        let outcomes = runner.run_pass(&[&up, &down]).await.unwrap();

        assert_eq!(outcomes[0].monitor, "Up");
        assert_eq!(outcomes[0].result.status, MonitorStatus::Up);
        assert_eq!(outcomes[1].result.message, "Unexpected status code: 503");
        assert_eq!(state.get("m1").unwrap().status, MonitorStatus::Up);
        assert!(state.path().exists());

        let line = serde_json::to_value(&outcomes[0]).unwrap();
        assert_eq!(line["monitorId"], "m1");
        assert_eq!(line["status"], "up");
        assert_eq!(line["statusCode"], 200);
    }

    #[tokio::test]
    async fn test_slow_monitor_does_not_hold_others() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fast"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(StateFile::load(dir.path().join("state.json")).await.unwrap());
        let checker = MonitorChecker::new(
            Arc::new(ReqwestTransport::direct()),
            Arc::new(HealthyCertificates),
            CheckerOptions::default(),
        );
        let runner = Arc::new(Runner::new(checker, state.clone()));

        let slow = MonitorCheckConfig::http(format!("{}/slow", server.uri())).with_monitor("s", "Slow");
        let fast = MonitorCheckConfig::http(format!("{}/fast", server.uri())).with_monitor("f", "Fast");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watchers =
            runner.spawn_watchers(&[&slow, &fast], Duration::from_millis(100), tx);

        // Several fast checks land while the first slow one is still in flight
        for _ in 0..3 {
            let outcome = tokio::time::timeout(Duration::from_secs(3), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(outcome.monitor, "Fast");
            assert_eq!(outcome.result.status, MonitorStatus::Up);
        }
        assert!(state.get("s").is_none());
        assert_eq!(state.get("f").unwrap().status, MonitorStatus::Up);

        watchers.abort_all();
    }
}
