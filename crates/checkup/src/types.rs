use serde::{Deserialize, Serialize};

/// Sentinel used by numeric consumers for "days remaining not determined"
pub const CERT_DAYS_UNDETERMINED: i64 = -1;

/// Status of a monitoring check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    Up,
    Down,
}

impl std::fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorStatus::Up => write!(f, "up"),
            MonitorStatus::Down => write!(f, "down"),
        }
    }
}

/// Result of a single check invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorCheckResult {
    /// Verdict of the check
    pub status: MonitorStatus,

    /// Human-readable explanation of the verdict
    pub message: String,

    /// Elapsed time in milliseconds
    pub ping: u64,

    /// Days until certificate expiry, negative once expired
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_days_remaining: Option<i64>,

    /// HTTP status code of the response the verdict was derived from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl MonitorCheckResult {
    /// Create an UP result
    pub fn up(message: impl Into<String>, ping: u64) -> Self {
        Self {
            status: MonitorStatus::Up,
            message: message.into(),
            ping,
            certificate_days_remaining: None,
            status_code: None,
        }
    }

    /// Create a DOWN result
    pub fn down(message: impl Into<String>, ping: u64) -> Self {
        Self {
            status: MonitorStatus::Down,
            message: message.into(),
            ping,
            certificate_days_remaining: None,
            status_code: None,
        }
    }

    /// Attach the number of days the certificate has left
    pub fn with_certificate_days(mut self, days_remaining: i64) -> Self {
        self.certificate_days_remaining = Some(days_remaining);
        self
    }

    /// Attach the response status code
    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn is_up(&self) -> bool {
        self.status == MonitorStatus::Up
    }

    pub fn is_down(&self) -> bool {
        self.status == MonitorStatus::Down
    }

    /// Days remaining, or [`CERT_DAYS_UNDETERMINED`] when unknown
    pub fn certificate_days_or_sentinel(&self) -> i64 {
        self.certificate_days_remaining.unwrap_or(CERT_DAYS_UNDETERMINED)
    }
}

/// Certificate metadata returned by a certificate inspector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateInfo {
    /// Whether the chain verified and the certificate is inside its validity period
    pub valid: bool,

    /// Whole days until `notAfter`, negative once expired
    pub days_remaining: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_serializes_camel_case() {
        let result = MonitorCheckResult::up("HTTPS certificate valid", 12).with_certificate_days(30);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["status"], "up");
        assert_eq!(json["certificateDaysRemaining"], 30);
        assert!(json.get("statusCode").is_none());
    }

    #[test]
    fn test_undetermined_days_sentinel() {
        let result = MonitorCheckResult::down("Certificate check failed", 5);
        assert_eq!(result.certificate_days_or_sentinel(), CERT_DAYS_UNDETERMINED);
        assert!(result.is_down());
    }
}
