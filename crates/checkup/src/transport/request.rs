//! Request construction from a monitor configuration.

use std::time::Duration;

use reqwest::Method;
use serde_json::{Map, Value};
use tracing::warn;

use super::HttpRequest;
use crate::config::MonitorCheckConfig;
use crate::error::ValidationError;
use crate::validation::validate_http_method;

/// Build the outbound request for an HTTP or keyword check
pub fn build_request(
    config: &MonitorCheckConfig,
    timeout: Duration,
) -> Result<HttpRequest, ValidationError> {
    let method = validate_http_method(&config.http_method)?;

    // Bodies only ride along on methods that carry one
    let body = match method {
        Method::POST | Method::PUT | Method::PATCH if !config.request_body.is_empty() => {
            Some(config.request_body.clone())
        }
        _ => None,
    };

    Ok(HttpRequest {
        url: config.url.clone(),
        method,
        headers: parse_headers(&config.request_headers),
        body,
        max_redirects: config.max_redirects,
        timeout,
    })
}

/// Parse a raw JSON object of headers; anything unparsable yields no headers
pub fn parse_headers(raw: &str) -> Vec<(String, String)> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Map<String, Value>>(raw) {
        Ok(map) => map
            .into_iter()
            .map(|(name, value)| {
                let value = match value {
                    Value::String(value) => value,
                    other => other.to_string(),
                };
                (name, value)
            })
            .collect(),
        Err(e) => {
            warn!("Failed to parse request headers, sending none: {e}");
            Vec::new()
        }
    }
}
