//! Shared constants and invariants

pub const DEFAULT_GUAC_URL: &str = "http://localhost:8080/guacamole";
pub const DEFAULT_GUAC_USERNAME: &str = "guacadmin";
pub const DEFAULT_GUAC_PASSWORD: &str = "guacadmin";
pub const DEFAULT_GUAC_DATASOURCE: &str = "postgresql";

/// Guacamole tokens live ~60 minutes, refresh slightly early
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 55 * 60;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 5;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

pub const DEFAULT_STARTUP_ATTEMPTS: u32 = 3;
pub const STARTUP_RETRY_BASE_DELAY_MS: u64 = 500;
pub const STARTUP_RETRY_MAX_DELAY_MS: u64 = 4000;

// Guacamole REST API
pub const TOKEN_HEADER: &str = "Guacamole-Token";
pub const TOKENS_PATH: &str = "api/tokens";
pub const API_PREFIX: &str = "api";
