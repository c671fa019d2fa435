//! Notification delivery channels.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use checkup::{MonitorStatus, Notifier};
use serde::Serialize;
use tracing::{info, warn};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON body posted to the webhook
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload<'a> {
    pub monitor_id: &'a str,
    pub status: MonitorStatus,
    pub message: &'a str,
    pub previous_status: Option<MonitorStatus>,
    pub sent_at: DateTime<Utc>,
}

/// Posts notifications as JSON to a webhook
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: reqwest::Url,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let url = reqwest::Url::parse(url).with_context(|| format!("Invalid webhook URL {url}"))?;
        let client = reqwest::Client::builder().timeout(WEBHOOK_TIMEOUT).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn dispatch(
        &self,
        monitor_id: &str,
        status: MonitorStatus,
        message: &str,
        previous_status: Option<MonitorStatus>,
    ) -> checkup::Result<()> {
        let payload = WebhookPayload { monitor_id, status, message, previous_status, sent_at: Utc::now() };

        self.client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await
            .context("Webhook request failed")?
            .error_for_status()
            .context("Webhook rejected notification")?;

        info!(monitor_id, %status, "Notification delivered to webhook");
        Ok(())
    }
}

/// Writes notifications to the log, used when no webhook is configured
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn dispatch(
        &self,
        monitor_id: &str,
        status: MonitorStatus,
        message: &str,
        previous_status: Option<MonitorStatus>,
    ) -> checkup::Result<()> {
        let previous = previous_status.map_or_else(|| "unknown".to_string(), |s| s.to_string());
        warn!(monitor_id, %status, previous_status = %previous, "{message}");
        Ok(())
    }
}
