use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::{HttpRequest, HttpResponse, Transport};
use crate::error::TransportError;
use crate::settings::{Settings, proxy_enabled};

/// Chooses the direct or proxied transport from the current settings on every request
pub struct ProxyAwareTransport {
    direct: Arc<dyn Transport>,
    proxied: Option<Arc<dyn Transport>>,
    settings: Arc<dyn Settings>,
}

impl ProxyAwareTransport {
    pub fn new(direct: Arc<dyn Transport>, settings: Arc<dyn Settings>) -> Self {
        Self { direct, proxied: None, settings }
    }

    pub fn with_proxy(mut self, proxied: Arc<dyn Transport>) -> Self {
        self.proxied = Some(proxied);
        self
    }
}

#[async_trait]
impl Transport for ProxyAwareTransport {
    async fn fetch(
        &self,
        request: &HttpRequest,
        ignore_tls: bool,
    ) -> Result<HttpResponse, TransportError> {
        if !proxy_enabled(self.settings.as_ref()).await {
            return self.direct.fetch(request, ignore_tls).await;
        }

        match &self.proxied {
            Some(proxied) => proxied.fetch(request, ignore_tls).await,
            None => {
                warn!("Proxy is enabled but no proxy is configured, sending directly");
                self.direct.fetch(request, ignore_tls).await
            }
        }
    }
}
