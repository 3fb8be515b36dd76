//! Application setup and initialization

pub mod routes;
pub mod server;

use crate::state::AppState;
use anyhow::{Context, Result};
use imagine_core::ProxyConfig;
use std::sync::Arc;

/// Initialize the entire application
pub fn initialize_app(config: ProxyConfig) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(config.log_format)
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    config
        .validate()
        .context("Configuration validation failed")?;

    tracing::info!(
        upstream = %config.upstream_url,
        environment = %config.environment,
        "Configuration loaded and validated successfully"
    );

    let state = Arc::new(AppState::new(config)?);
    let router = routes::setup_routes(state.clone());

    Ok((state, router))
}
