//! Environment-driven configuration, read once at startup.

pub mod db;

use std::env;
use std::str::FromStr;
use std::time::Duration;

pub use db::{DbConfig, DbKind};

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub db: DbConfig,
    pub idempotency_ttl: Duration,
    pub reap_interval: Duration,
    pub tick_interval: Duration,
    pub tick_concurrency: usize,
    pub redis_url: Option<String>,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            host: env::var("BACKEND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_var("BACKEND_PORT", 3001u16)?,
            jwt_secret: must_var("BACKEND_JWT_SECRET")?,
            db: DbConfig::from_env()?,
            idempotency_ttl: Duration::from_secs(parse_var("IDEMPOTENCY_TTL_SECS", 86_400u64)?),
            reap_interval: Duration::from_secs(parse_var("IDEMPOTENCY_REAP_INTERVAL_SECS", 3_600u64)?),
            tick_interval: Duration::from_millis(parse_var("DRAFT_TICK_INTERVAL_MS", 1_000u64)?),
            tick_concurrency: parse_var("DRAFT_TICK_CONCURRENCY", 8usize)?,
            redis_url: env::var("REDIS_URL").ok().filter(|s| !s.is_empty()),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }
}

/// Get required environment variable or return error
pub(crate) fn must_var(name: &str) -> Result<String, AppError> {
    env::var(name)
        .map_err(|_| AppError::config(format!("Required environment variable '{name}' is not set")))
}

/// Parse an optional environment variable, falling back to `default` when unset.
pub(crate) fn parse_var<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AppError::config(format!("Invalid value for {name}: {e}"))),
    }
}
