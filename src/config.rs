//! Configuration module for environment variables and client settings

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::sync::DEFAULT_REFRESH_INTERVAL;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:4943/api";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the trading backend
    pub backend_url: String,

    /// How often portfolio, market data and trade history are refreshed
    pub refresh_interval: Duration,

    /// Per-request timeout. `None` means requests may wait indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            request_timeout: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let backend_url = lookup("QUANTUMIC_BACKEND_URL")
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        let refresh_interval = match parse_secs(&lookup, "QUANTUMIC_REFRESH_INTERVAL_SECS")? {
            Some(0) => return Err(ConfigError::Zero("QUANTUMIC_REFRESH_INTERVAL_SECS")),
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_REFRESH_INTERVAL,
        };

        let request_timeout = match parse_secs(&lookup, "QUANTUMIC_REQUEST_TIMEOUT_SECS")? {
            Some(0) => return Err(ConfigError::Zero("QUANTUMIC_REQUEST_TIMEOUT_SECS")),
            other => other.map(Duration::from_secs),
        };

        Ok(Self {
            backend_url,
            refresh_interval,
            request_timeout,
        })
    }
}

fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<u64>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { name, value }),
    }
}
