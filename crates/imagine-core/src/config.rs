//! Configuration module
//!
//! Proxy configuration loaded from the environment (and an optional `.env`
//! file): listen port, upstream origin, relay limits and logging options.

use std::env;

// Common constants
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_IMAGE_SIZE_MB: usize = 25;

/// Largest width x height a transformation may render, forty megapixels
pub const DEFAULT_MAX_OUTPUT_PIXELS: u64 = 40_000_000;

/// Log output format
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Image proxy configuration
#[derive(Clone, Debug)]
pub struct ProxyConfig {
    pub server_port: u16,
    /// Base URL images are fetched from; the key is appended as a path segment
    pub upstream_url: String,
    pub upstream_timeout_secs: u64,
    /// Upper bound on buffered upstream bytes per request
    pub max_image_size_bytes: usize,
    /// Upper bound on the pixel count of any intermediate or final image
    pub max_output_pixels: u64,
    pub environment: String,
    pub log_format: LogFormat,
}

impl ProxyConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let upstream_url = env::var("UPSTREAM_URL")
            .map_err(|_| anyhow::anyhow!("UPSTREAM_URL environment variable is required"))?;

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let max_image_size_mb = env::var("MAX_IMAGE_SIZE_MB")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_IMAGE_SIZE_MB);

        let log_format = match env::var("LOG_FORMAT").map(|v| v.to_lowercase()) {
            Ok(format) if format == "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let config = ProxyConfig {
            server_port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            upstream_url: upstream_url.trim_end_matches('/').to_string(),
            upstream_timeout_secs: env::var("UPSTREAM_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            max_image_size_bytes: max_image_size_mb * 1024 * 1024,
            max_output_pixels: env::var("MAX_OUTPUT_PIXELS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_OUTPUT_PIXELS),
            environment,
            log_format,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.upstream_url.starts_with("http://") || self.upstream_url.starts_with("https://"))
        {
            return Err(anyhow::anyhow!(
                "UPSTREAM_URL must be an http(s) URL, got: {}",
                self.upstream_url
            ));
        }

        if self.server_port == 0 {
            return Err(anyhow::anyhow!("PORT must be greater than 0"));
        }

        if self.max_image_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_IMAGE_SIZE_MB must be greater than 0"));
        }

        if self.max_output_pixels == 0 {
            return Err(anyhow::anyhow!("MAX_OUTPUT_PIXELS must be greater than 0"));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    /// Upstream URL for one image key.
    pub fn upstream_url_for(&self, key: &str) -> String {
        format!("{}/{}", self.upstream_url, key)
    }
}
