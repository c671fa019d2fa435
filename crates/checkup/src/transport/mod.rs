//! HTTP transport seam.
//!
//! Checks talk to the network only through [`Transport`]. The shipped
//! implementation is [`ReqwestTransport`], in a direct and a proxied flavour,
//! picked per request by [`ProxyAwareTransport`].

mod client;
mod proxy;
mod request;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;

use crate::error::TransportError;

pub use client::ReqwestTransport;
pub use proxy::ProxyAwareTransport;
pub use request::{build_request, parse_headers};

/// A fully prepared outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    /// Redirects are followed only when this is above zero
    pub max_redirects: u32,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn follows_redirects(&self) -> bool {
        self.max_redirects > 0
    }
}

/// Lazily read response body
#[async_trait]
pub trait ResponseBody: Send {
    async fn read_text(self: Box<Self>) -> Result<String, TransportError>;
}

#[async_trait]
impl ResponseBody for String {
    async fn read_text(self: Box<Self>) -> Result<String, TransportError> {
        Ok(*self)
    }
}

#[async_trait]
impl ResponseBody for reqwest::Response {
    async fn read_text(self: Box<Self>) -> Result<String, TransportError> {
        Ok((*self).text().await?)
    }
}

/// Response status plus a body that is only read on demand
pub struct HttpResponse {
    status: u16,
    body: Box<dyn ResponseBody>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl ResponseBody + 'static) -> Self {
        Self { status, body: Box::new(body) }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Consume the response and read the whole body as text
    pub async fn text(self) -> Result<String, TransportError> {
        self.body.read_text().await
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse").field("status", &self.status).finish_non_exhaustive()
    }
}

/// Issues HTTP requests on behalf of checks
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform `request`, skipping certificate verification when `ignore_tls` is set
    async fn fetch(
        &self,
        request: &HttpRequest,
        ignore_tls: bool,
    ) -> Result<HttpResponse, TransportError>;
}
