//! Error taxonomy for checks.
//!
//! None of these cross [`MonitorChecker::check`](crate::MonitorChecker::check):
//! every variant is folded into a DOWN result whose message is the `Display`
//! output below.

use std::error::Error as StdError;
use std::io;

use thiserror::Error;

use crate::status::StatusRangeError;

/// Configuration problems detected before any network access
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("URL must not be empty")]
    EmptyUrl,
    #[error("Keyword must not be empty")]
    EmptyKeyword,
    #[error("Only HTTPS URLs are supported (must start with https://)")]
    SchemeMismatch,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("URL must have a valid host")]
    MissingHost,
    #[error("Invalid accepted status codes: {0}")]
    InvalidStatusRange(#[from] StatusRangeError),
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),
}

/// Checker options that would silently break every check or reminder
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OptionsError {
    #[error("{0} must be at least 1 second")]
    ZeroTimeout(&'static str),
    #[error("reminder_hour must be between 0 and 23, got {0}")]
    ReminderHourOutOfRange(u32),
    #[error("reminder_window_minutes must be between 1 and 60, got {0}")]
    ReminderWindowOutOfRange(u32),
}

/// Network failures, normalized into a handful of readable categories
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,
    #[error("DNS resolution failed: {0}")]
    Dns(String),
    #[error("Connection refused: {0}")]
    ConnectionRefused(String),
    #[error("TLS handshake failed: {0}")]
    Tls(String),
    #[error("Network error: {0}")]
    Other(String),
}

impl TransportError {
    /// Classify an arbitrary error by walking its source chain
    pub fn from_error(error: &(dyn StdError + 'static)) -> Self {
        let chain = error_chain(error);
        let lowered = chain.to_lowercase();

        if lowered.contains("timed out") || lowered.contains("timeout") {
            TransportError::Timeout
        } else if lowered.contains("dns")
            || lowered.contains("failed to lookup")
            || lowered.contains("name or service not known")
            || lowered.contains("no such host")
        {
            TransportError::Dns(chain)
        } else if lowered.contains("connection refused") {
            TransportError::ConnectionRefused(chain)
        } else if lowered.contains("certificate")
            || lowered.contains("tls")
            || lowered.contains("ssl")
            || lowered.contains("handshake")
        {
            TransportError::Tls(chain)
        } else {
            TransportError::Other(chain)
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return TransportError::Timeout;
        }
        TransportError::from_error(&error)
    }
}

impl From<io::Error> for TransportError {
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::TimedOut => TransportError::Timeout,
            io::ErrorKind::ConnectionRefused => {
                TransportError::ConnectionRefused(error.to_string())
            }
            io::ErrorKind::InvalidData => TransportError::Tls(error.to_string()),
            _ => TransportError::from_error(&error),
        }
    }
}

/// Join an error and its sources into one line
fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
