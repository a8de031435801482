use std::time::Duration;

use clap::ValueEnum;
use secrecy::SecretString;

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub guacamole: GuacamoleConfig,
    pub server: ServerConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
    pub startup_retry: RetryConfig,
}

/// ================================
/// Upstream Guacamole
/// ================================
#[derive(Debug, Clone)]
pub struct GuacamoleConfig {
    /// base url without trailing slash, e.g. http://localhost:8080/guacamole
    pub url: String,
    pub username: String,
    pub password: SecretString,
    /// data partition queried by users/connections endpoints
    pub datasource: String,
    /// conservative local estimate of the server side token lifetime
    pub token_lifetime: Duration,
    pub request_timeout: Duration,
}

impl GuacamoleConfig {
    pub fn users_endpoint(&self) -> String {
        format!("session/data/{}/users", self.datasource)
    }

    pub fn connections_endpoint(&self) -> String {
        format!("session/data/{}/connections", self.datasource)
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub path: String,
    pub is_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub attempts: u32,
    /// will be mutiply by 2 on every attempt until max_delay_ms
    pub base_delay_ms: u64,
    /// invariant: >= base_delay_ms
    pub max_delay_ms: u64,
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Compact,
}
