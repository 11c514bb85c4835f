//! Runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into the
//! [`crate::Dashboard`]; nothing reads environment variables while serving
//! requests.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_DATABASE_PATH: &str = "medorder.db";
pub const DEFAULT_ORDER_PREFIX: &str = "ORD";
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_NOTIFICATION_LIMIT: u32 = 50;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Fixed-window rate limit settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests allowed per window and client
    pub max_requests: u32,
    pub window: Duration,
    /// How often expired windows are purged
    pub sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Dashboard configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DashboardConfig {
    pub database_path: PathBuf,
    /// Leading characters of every generated order number
    pub order_number_prefix: String,
    pub rate_limit: RateLimitConfig,
    pub default_page_size: u32,
    pub max_page_size: u32,
    /// Cap on notifications returned per inbox listing
    pub notification_limit: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            order_number_prefix: DEFAULT_ORDER_PREFIX.to_string(),
            rate_limit: RateLimitConfig::default(),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            notification_limit: DEFAULT_NOTIFICATION_LIMIT,
        }
    }
}

impl DashboardConfig {
    /// Resolve configuration from `MEDORDER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through an arbitrary key lookup.
    ///
    /// Missing or blank keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(path) = get("MEDORDER_DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(prefix) = get("MEDORDER_ORDER_PREFIX") {
            config.order_number_prefix = prefix;
        }
        if let Some(v) = get("MEDORDER_RATE_LIMIT_MAX") {
            config.rate_limit.max_requests = parse_positive("MEDORDER_RATE_LIMIT_MAX", &v)?;
        }
        if let Some(v) = get("MEDORDER_RATE_LIMIT_WINDOW_MS") {
            config.rate_limit.window =
                Duration::from_millis(parse_positive::<u64>("MEDORDER_RATE_LIMIT_WINDOW_MS", &v)?);
        }
        if let Some(v) = get("MEDORDER_RATE_LIMIT_SWEEP_MS") {
            config.rate_limit.sweep_interval =
                Duration::from_millis(parse_positive::<u64>("MEDORDER_RATE_LIMIT_SWEEP_MS", &v)?);
        }
        if let Some(v) = get("MEDORDER_PAGE_SIZE") {
            config.default_page_size = parse_positive("MEDORDER_PAGE_SIZE", &v)?;
        }
        if let Some(v) = get("MEDORDER_MAX_PAGE_SIZE") {
            config.max_page_size = parse_positive("MEDORDER_MAX_PAGE_SIZE", &v)?;
        }
        if let Some(v) = get("MEDORDER_NOTIFICATION_LIMIT") {
            config.notification_limit = parse_positive("MEDORDER_NOTIFICATION_LIMIT", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::Zero("rate limit max requests"));
        }
        if self.rate_limit.window.is_zero() {
            return Err(ConfigError::Zero("rate limit window"));
        }
        if self.rate_limit.sweep_interval.is_zero() {
            return Err(ConfigError::Zero("rate limit sweep interval"));
        }
        if self.default_page_size == 0 {
            return Err(ConfigError::Zero("default page size"));
        }
        if self.max_page_size < self.default_page_size {
            return Err(ConfigError::InvalidValue {
                key: "MEDORDER_MAX_PAGE_SIZE",
                value: self.max_page_size.to_string(),
            });
        }
        Ok(())
    }
}

fn parse_positive<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match value.parse::<T>() {
        Ok(parsed) if parsed > T::default() => Ok(parsed),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}
