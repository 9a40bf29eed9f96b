//! Server configuration from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DATABASE_URL` | `postgres://localhost/forge` |
//! | `HOST` / `PORT` | `0.0.0.0` / `3000` |
//! | `SESSION_SECRET` | random per process (sessions do not survive restarts) |
//! | `COOKIE_SECURE` | `false` |
//! | `ALLOWED_ORIGINS` | `http://localhost:3000,http://localhost:5173` |
//! | `RATE_LIMIT_ENABLED` / `RATE_LIMIT_REQUESTS` / `RATE_LIMIT_PERIOD_SECS` | `true` / `100` / `60` |
//!
//! Chat provider settings (`CHAT_TIMEOUT_SECS`, `<PROVIDER>_BASE_URL`, ...)
//! are read by [`forge_inference::ProviderRegistry::from_env`].

use axum::http::HeaderValue;
use tracing::warn;

use forge_core::{Error, Result};
use forge_crypto::{MasterKey, MIN_SECRET_LENGTH};

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/forge";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";
pub const DEFAULT_RATE_LIMIT_REQUESTS: u32 = 100;
pub const DEFAULT_RATE_LIMIT_PERIOD_SECS: u64 = 60;

/// Request bodies above this size are rejected with 413.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Global request quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests: u32,
    pub period_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests: DEFAULT_RATE_LIMIT_REQUESTS,
            period_secs: DEFAULT_RATE_LIMIT_PERIOD_SECS,
        }
    }
}

/// Everything the server needs besides the chat provider registry.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// `None` means a random secret is generated at startup.
    pub session_secret: Option<String>,
    pub cookie_secure: bool,
    pub allowed_origins: Vec<HeaderValue>,
    pub rate_limit: RateLimitConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            session_secret: None,
            cookie_secure: false,
            allowed_origins: parse_allowed_origins(DEFAULT_ALLOWED_ORIGINS),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let rate_limit = RateLimitConfig {
            enabled: env_flag("RATE_LIMIT_ENABLED").unwrap_or(true),
            requests: std::env::var("RATE_LIMIT_REQUESTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RATE_LIMIT_REQUESTS),
            period_secs: std::env::var("RATE_LIMIT_PERIOD_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RATE_LIMIT_PERIOD_SECS),
        };

        Self {
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port,
            session_secret: std::env::var("SESSION_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            cookie_secure: env_flag("COOKIE_SECURE").unwrap_or(false),
            allowed_origins: parse_allowed_origins(
                &std::env::var("ALLOWED_ORIGINS").unwrap_or_default(),
            ),
            rate_limit,
        }
    }

    /// Socket address string to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Master key for session signing and key sealing.
    ///
    /// Without `SESSION_SECRET` a random key is generated, which logs users
    /// out and makes stored API keys unreadable on every restart.
    pub fn master_key(&self) -> Result<MasterKey> {
        match &self.session_secret {
            Some(secret) => MasterKey::from_secret(secret).map_err(|e| {
                Error::Config(format!(
                    "SESSION_SECRET must be at least {} characters: {}",
                    MIN_SECRET_LENGTH, e
                ))
            }),
            None => {
                warn!(
                    subsystem = "api",
                    component = "config",
                    "SESSION_SECRET not set; using a random per-process secret"
                );
                Ok(MasterKey::generate())
            }
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
}

/// Parse a comma-separated origin whitelist. Blank input yields the defaults;
/// entries that are not valid header values are dropped with a warning.
pub fn parse_allowed_origins(origins: &str) -> Vec<HeaderValue> {
    let source = if origins.trim().is_empty() {
        DEFAULT_ALLOWED_ORIGINS
    } else {
        origins
    };

    source
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<HeaderValue>() {
            Ok(v) if s.starts_with("http://") || s.starts_with("https://") => Some(v),
            Ok(_) => {
                warn!("Ignoring CORS origin without scheme: '{}'", s);
                None
            }
            Err(e) => {
                warn!("Invalid CORS origin '{}': {}", s, e);
                None
            }
        })
        .collect()
}
