//! Global settings consulted on every check.

use async_trait::async_trait;
use tracing::warn;

use crate::Result;

#[async_trait]
pub trait Settings: Send + Sync {
    /// Whether outbound checks should go through the configured proxy
    async fn is_proxy_enabled(&self) -> Result<bool>;
}

/// Settings fixed at construction time
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSettings {
    pub proxy_enabled: bool,
}

#[async_trait]
impl Settings for StaticSettings {
    async fn is_proxy_enabled(&self) -> Result<bool> {
        Ok(self.proxy_enabled)
    }
}

/// Read the proxy flag, treating a failed lookup as disabled
pub async fn proxy_enabled(settings: &dyn Settings) -> bool {
    match settings.is_proxy_enabled().await {
        Ok(enabled) => enabled,
        Err(e) => {
            warn!("Failed to read proxy settings, using direct transport: {e:#}");
            false
        }
    }
}
