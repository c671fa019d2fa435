//! Monitor and checker configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::OptionsError;

/// Type of monitoring check to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckType {
    /// Plain HTTP(S) request with status classification
    #[default]
    Http,
    /// Certificate validity and expiry only
    HttpsCert,
    /// HTTP request plus body keyword search
    Keyword,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_status_range() -> String {
    "200-299".to_string()
}

fn default_max_redirects() -> u32 {
    10
}

/// Configuration of a single check invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MonitorCheckConfig {
    #[serde(default)]
    pub check_type: CheckType,

    pub url: String,

    #[serde(default = "default_method")]
    pub http_method: String,

    /// Accepted status codes, e.g. `"200-299"` or `"200-299, 301"`
    #[serde(default = "default_status_range")]
    pub accepted_status_range: String,

    #[serde(default = "default_max_redirects")]
    pub max_redirects: u32,

    #[serde(default)]
    pub request_body: String,

    /// Raw JSON object of header name to value
    #[serde(default)]
    pub request_headers: String,

    #[serde(default)]
    pub notify_cert_expiry: bool,

    #[serde(default)]
    pub ignore_tls: bool,

    #[serde(default)]
    pub monitor_id: Option<String>,

    #[serde(default)]
    pub monitor_name: Option<String>,

    #[serde(default)]
    pub keyword: Option<String>,
}

impl MonitorCheckConfig {
    /// Plain HTTP check against `url` with default request settings
    pub fn http(url: impl Into<String>) -> Self {
        Self {
            check_type: CheckType::Http,
            url: url.into(),
            http_method: default_method(),
            accepted_status_range: default_status_range(),
            max_redirects: default_max_redirects(),
            request_body: String::new(),
            request_headers: String::new(),
            notify_cert_expiry: false,
            ignore_tls: false,
            monitor_id: None,
            monitor_name: None,
            keyword: None,
        }
    }

    /// Certificate-only check against `url`
    pub fn https_cert(url: impl Into<String>) -> Self {
        Self { check_type: CheckType::HttpsCert, ..Self::http(url) }
    }

    /// Keyword check against `url`
    pub fn keyword(url: impl Into<String>, keyword: impl Into<String>) -> Self {
        Self { check_type: CheckType::Keyword, keyword: Some(keyword.into()), ..Self::http(url) }
    }

    pub fn with_monitor(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.monitor_id = Some(id.into());
        self.monitor_name = Some(name.into());
        self
    }

    /// Monitor id and name, when both are present and non-empty
    pub fn identity(&self) -> Option<(&str, &str)> {
        let id = self.monitor_id.as_deref().filter(|id| !id.is_empty())?;
        let name = self.monitor_name.as_deref().filter(|name| !name.is_empty())?;
        Some((id, name))
    }
}

fn default_request_timeout() -> u64 {
    10
}

fn default_certificate_timeout() -> u64 {
    10
}

fn default_reminder_hour() -> u32 {
    12
}

fn default_reminder_minutes() -> u32 {
    5
}

/// Process-wide checker settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckerOptions {
    /// Upper bound on a whole HTTP exchange, independent of redirects
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_certificate_timeout")]
    pub certificate_timeout_secs: u64,

    /// Local hour at which daily certificate reminders may fire
    #[serde(default = "default_reminder_hour")]
    pub reminder_hour: u32,

    /// Width of the reminder window in minutes, starting at the top of the hour
    #[serde(default = "default_reminder_minutes")]
    pub reminder_window_minutes: u32,

    /// Run the certificate pre-check for keyword monitors as well
    #[serde(default)]
    pub keyword_certificate_precheck: bool,
}

impl Default for CheckerOptions {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            certificate_timeout_secs: default_certificate_timeout(),
            reminder_hour: default_reminder_hour(),
            reminder_window_minutes: default_reminder_minutes(),
            keyword_certificate_precheck: false,
        }
    }
}

impl CheckerOptions {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn certificate_timeout(&self) -> Duration {
        Duration::from_secs(self.certificate_timeout_secs)
    }

    /// Reject zero timeouts and reminder windows that can never match
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.request_timeout_secs == 0 {
            return Err(OptionsError::ZeroTimeout("request_timeout_secs"));
        }
        if self.certificate_timeout_secs == 0 {
            return Err(OptionsError::ZeroTimeout("certificate_timeout_secs"));
        }
        if self.reminder_hour > 23 {
            return Err(OptionsError::ReminderHourOutOfRange(self.reminder_hour));
        }
        if !(1..=60).contains(&self.reminder_window_minutes) {
            return Err(OptionsError::ReminderWindowOutOfRange(self.reminder_window_minutes));
        }
        Ok(())
    }
}
