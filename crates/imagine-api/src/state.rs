//! Application state shared by all handlers.

use anyhow::Context;
use imagine_core::ProxyConfig;
use imagine_processing::RasterBackend;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub config: ProxyConfig,
    /// Client used for every upstream fetch
    pub http_client: reqwest::Client,
    pub backend: Arc<RasterBackend>,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> Result<Self, anyhow::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .user_agent(concat!("imagine/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build upstream HTTP client")?;
        let backend = RasterBackend::new().with_max_output_pixels(config.max_output_pixels);

        Ok(Self {
            config,
            http_client,
            backend: Arc::new(backend),
        })
    }
}
