//! reqwest-backed transport.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use tracing::{debug, warn};

use super::{HttpRequest, HttpResponse, Transport};
use crate::error::TransportError;

const USER_AGENT: &str = concat!("checkup/", env!("CARGO_PKG_VERSION"));

/// Redirect limit (0 means none) and whether certificate errors are ignored
type ClientKey = (u32, bool);

/// HTTP transport built on reqwest, either direct or through one proxy
///
/// Clients are shared per redirect limit and TLS mode so connection pools
/// survive across checks. Clones share the same clients.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    proxy: Option<String>,
    clients: Arc<Mutex<HashMap<ClientKey, reqwest::Client>>>,
}

impl ReqwestTransport {
    /// Transport that ignores any proxy, including proxy environment variables
    pub fn direct() -> Self {
        Self::default()
    }

    /// Transport that routes every request through `proxy_url`
    pub fn proxied(proxy_url: impl Into<String>) -> crate::Result<Self> {
        let proxy_url = proxy_url.into();
        reqwest::Proxy::all(&proxy_url)
            .map_err(|e| anyhow::anyhow!("Invalid proxy URL {proxy_url}: {e}"))?;
        Ok(Self { proxy: Some(proxy_url), ..Self::default() })
    }

    pub fn is_proxied(&self) -> bool {
        self.proxy.is_some()
    }

    /// Number of distinct clients built so far
    pub fn cached_clients(&self) -> usize {
        self.lock_clients().len()
    }

    fn client(&self, request: &HttpRequest, ignore_tls: bool) -> Result<reqwest::Client, TransportError> {
        let max_redirects = if request.follows_redirects() { request.max_redirects } else { 0 };
        let key = (max_redirects, ignore_tls);

        if let Some(client) = self.lock_clients().get(&key) {
            return Ok(client.clone());
        }

        let redirect = match max_redirects {
            0 => Policy::none(),
            limit => Policy::limited(limit as usize),
        };

        let builder = reqwest::Client::builder()
            .redirect(redirect)
            .danger_accept_invalid_certs(ignore_tls)
            .user_agent(USER_AGENT);

        let builder = match &self.proxy {
            Some(proxy_url) => builder.proxy(reqwest::Proxy::all(proxy_url)?),
            None => builder.no_proxy(),
        };

        let client = builder.build()?;
        debug!(max_redirects, ignore_tls, "Built HTTP client");
        Ok(self.lock_clients().entry(key).or_insert(client).clone())
    }

    fn lock_clients(&self) -> MutexGuard<'_, HashMap<ClientKey, reqwest::Client>> {
        self.clients.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn fetch(
        &self,
        request: &HttpRequest,
        ignore_tls: bool,
    ) -> Result<HttpResponse, TransportError> {
        debug!(
            method = %request.method,
            url = %request.url,
            proxied = self.is_proxied(),
            "Sending check request"
        );

        let client = self.client(request, ignore_tls)?;
        let mut http_request =
            client.request(request.method.clone(), &request.url).timeout(request.timeout);

        for (name, value) in &request.headers {
            match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
                (Ok(name), Ok(value)) => http_request = http_request.header(name, value),
                _ => warn!("Skipping invalid request header {name:?}"),
            }
        }

        if let Some(body) = &request.body {
            http_request = http_request.body(body.clone());
        }

        let response = http_request.send().await?;
        Ok(HttpResponse::new(response.status().as_u16(), response))
    }
}
