use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use reqwest::Url;
use secrecy::SecretString;

use crate::config::settings::{
    GuacamoleConfig, LogFormat, LoggingConfig, MetricsConfig, RetryConfig, ServerConfig,
    ServiceConfig,
};
use crate::utils::constants::*;
use crate::utils::logging::LogLevel;

/// Command line / environment settings of the relay.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[arg(long, env = "GUAC_URL", default_value = DEFAULT_GUAC_URL)]
    pub guac_url: String,
    #[arg(long, env = "GUAC_USERNAME", default_value = DEFAULT_GUAC_USERNAME)]
    pub guac_username: String,
    #[arg(long, env = "GUAC_PASSWORD", default_value = DEFAULT_GUAC_PASSWORD, hide_env_values = true)]
    pub guac_password: String,
    #[arg(long, env = "GUAC_DATASOURCE", default_value = DEFAULT_GUAC_DATASOURCE)]
    pub guac_datasource: String,
    #[arg(long, env = "GUAC_TOKEN_LIFETIME_SECS", default_value_t = DEFAULT_TOKEN_LIFETIME_SECS)]
    pub token_lifetime_secs: u64,
    #[arg(long, env = "GUAC_TIMEOUT_SECS", default_value_t = DEFAULT_HTTP_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,

    #[arg(long, env = "HOST", default_value = DEFAULT_HOST)]
    pub host: String,
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    #[arg(long, env = "LOG_LEVEL", value_enum)]
    pub log_level: Option<LogLevel>,
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    #[arg(long = "metrics", env = "METRICS_ENABLED")]
    pub metrics_enabled: bool,
    #[arg(long, env = "METRICS_PATH", default_value = DEFAULT_METRICS_PATH)]
    pub metrics_path: String,

    #[arg(long, env = "STARTUP_AUTH_ATTEMPTS", default_value_t = DEFAULT_STARTUP_ATTEMPTS)]
    pub startup_attempts: u32,
}

/// Validate parsed arguments and turn them into the service configuration
pub fn run(args: Args) -> Result<ServiceConfig> {
    let url = args.guac_url.trim().trim_end_matches('/').to_owned();
    let parsed = Url::parse(&url).map_err(|e| anyhow!("invalid GUAC_URL '{}': {}", url, e))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        bail!("GUAC_URL must use http or https, got '{}'", parsed.scheme());
    }
    if args.guac_username.trim().is_empty() {
        bail!("GUAC_USERNAME must not be empty");
    }
    let datasource = args.guac_datasource.trim();
    // interpolated into request paths unescaped
    let is_segment_char = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-';
    if datasource.is_empty() || !datasource.chars().all(is_segment_char) {
        bail!(
            "GUAC_DATASOURCE must be a non-empty identifier of [A-Za-z0-9_-], got '{}'",
            datasource
        );
    }
    if args.token_lifetime_secs == 0 {
        bail!("GUAC_TOKEN_LIFETIME_SECS must be greater than 0");
    }
    if args.request_timeout_secs == 0 {
        bail!("GUAC_TIMEOUT_SECS must be greater than 0");
    }
    if args.startup_attempts == 0 {
        bail!("STARTUP_AUTH_ATTEMPTS must be greater than 0");
    }
    let metrics_path = if args.metrics_path.starts_with('/') {
        args.metrics_path
    } else {
        format!("/{}", args.metrics_path)
    };

    Ok(ServiceConfig {
        guacamole: GuacamoleConfig {
            url,
            username: args.guac_username,
            password: SecretString::from(args.guac_password),
            datasource: datasource.to_owned(),
            token_lifetime: Duration::from_secs(args.token_lifetime_secs),
            request_timeout: Duration::from_secs(args.request_timeout_secs),
        },
        server: ServerConfig {
            host: args.host,
            port: args.port,
        },
        metrics: MetricsConfig {
            path: metrics_path,
            is_enabled: args.metrics_enabled,
        },
        logging: LoggingConfig::new(
            args.log_level
                .map(|level| level.as_str().to_owned())
                .unwrap_or_else(|| "info".to_owned()),
            args.log_format,
        ),
        startup_retry: RetryConfig {
            attempts: args.startup_attempts,
            base_delay_ms: STARTUP_RETRY_BASE_DELAY_MS,
            max_delay_ms: STARTUP_RETRY_MAX_DELAY_MS,
        },
    })
}
