//! Input validation performed before any network access.

use reqwest::Method;
use url::Url;

use crate::error::ValidationError;

/// Validate that a monitor URL is present
pub fn validate_url_present(target: &str) -> Result<(), ValidationError> {
    if target.trim().is_empty() {
        return Err(ValidationError::EmptyUrl);
    }
    Ok(())
}

/// Validate an HTTPS endpoint and return its host and port (default 443)
pub fn validate_https_endpoint(target: &str) -> Result<(String, u16), ValidationError> {
    validate_url_present(target)?;

    // Case-sensitive prefix, `HTTPS://` is rejected
    if !target.starts_with("https://") {
        return Err(ValidationError::SchemeMismatch);
    }

    let url = Url::parse(target).map_err(|e| ValidationError::InvalidUrl(e.to_string()))?;
    let host = url.host_str().filter(|host| !host.is_empty()).ok_or(ValidationError::MissingHost)?;

    // IPv6 literals come back bracketed
    let host = host.trim_start_matches('[').trim_end_matches(']').to_string();
    Ok((host, url.port().unwrap_or(443)))
}

/// Validate and normalize an HTTP method, defaulting to GET when empty
pub fn validate_http_method(method: &str) -> Result<Method, ValidationError> {
    let method = method.trim();
    if method.is_empty() {
        return Ok(Method::GET);
    }

    match method.to_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        "HEAD" => Ok(Method::HEAD),
        "OPTIONS" => Ok(Method::OPTIONS),
        _ => Err(ValidationError::UnsupportedMethod(method.to_string())),
    }
}

/// Validate the keyword of a keyword monitor
pub fn validate_keyword(keyword: Option<&str>) -> Result<&str, ValidationError> {
    match keyword {
        Some(keyword) if !keyword.is_empty() => Ok(keyword),
        _ => Err(ValidationError::EmptyKeyword),
    }
}
