//! Configuration module for Homework Bot.
//!
//! This module handles parsing configuration from environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `PRACTICUM_TOKEN` | Yes | - | OAuth token for the homework status API |
//! | `TELEGRAM_TOKEN` | Yes | - | Telegram bot token |
//! | `TELEGRAM_CHAT_ID` | Yes | - | Chat that receives notifications |
//! | `HOMEWORK_ENDPOINT` | No | Practicum homework statuses URL | Status endpoint |
//! | `HOMEWORK_POLL_INTERVAL_SECS` | No | 600 | Seconds to sleep between polls |
//! | `HOMEWORK_LOOKBACK_DAYS` | No | 30 | How far back the first poll reaches |
//! | `TELEGRAM_API_URL` | No | `https://api.telegram.org` | Bot API base URL |
//!
//! # Example
//!
//! ```no_run
//! use homework_bot::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("Endpoint: {}", config.endpoint);
//! ```

use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Default homework status endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://practicum.yandex.ru/api/user_api/homework_statuses/";

/// Default Telegram Bot API base URL.
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Default pause between poll cycles.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 600;

/// Default age of the initial cursor.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 30;

/// Required secrets, in the order they are checked.
const REQUIRED_VARS: [&str; 3] = ["PRACTICUM_TOKEN", "TELEGRAM_TOKEN", "TELEGRAM_CHAT_ID"];

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required environment variable is missing or empty.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// A secret string that never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the secret value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Configuration for the Homework Bot.
#[derive(Debug, Clone)]
pub struct Config {
    /// OAuth token for the homework status API.
    pub practicum_token: Secret,

    /// Telegram bot token.
    pub telegram_token: Secret,

    /// Chat that receives status and failure notifications.
    pub telegram_chat_id: String,

    /// Homework status endpoint URL.
    pub endpoint: String,

    /// Telegram Bot API base URL, without trailing slash.
    pub telegram_api_url: String,

    /// Pause between poll cycles.
    pub poll_interval: Duration,

    /// Age of the cursor used for the first poll, in days.
    pub lookback_days: u32,
}

impl Config {
    /// Creates a new `Config` by parsing environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - `PRACTICUM_TOKEN`, `TELEGRAM_TOKEN` or `TELEGRAM_CHAT_ID` is unset or empty
    /// - `HOMEWORK_POLL_INTERVAL_SECS` or `HOMEWORK_LOOKBACK_DAYS` is not a positive integer
    pub fn from_env() -> Result<Self, ConfigError> {
        let [practicum_token, telegram_token, telegram_chat_id] = REQUIRED_VARS.map(required);
        let practicum_token = practicum_token?;
        let telegram_token = telegram_token?;
        let telegram_chat_id = telegram_chat_id?;

        let endpoint = env::var("HOMEWORK_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());

        let telegram_api_url = env::var("TELEGRAM_API_URL")
            .unwrap_or_else(|_| DEFAULT_TELEGRAM_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let poll_interval_secs =
            positive::<u64>("HOMEWORK_POLL_INTERVAL_SECS")?.unwrap_or(DEFAULT_POLL_INTERVAL_SECS);

        let lookback_days =
            positive::<u32>("HOMEWORK_LOOKBACK_DAYS")?.unwrap_or(DEFAULT_LOOKBACK_DAYS);

        Ok(Self {
            practicum_token: Secret::new(practicum_token),
            telegram_token: Secret::new(telegram_token),
            telegram_chat_id,
            endpoint,
            telegram_api_url,
            poll_interval: Duration::from_secs(poll_interval_secs),
            lookback_days,
        })
    }
}

/// Reads a required variable, treating an empty value as missing.
fn required(key: &str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(ConfigError::MissingEnvVar(key.to_string())),
    }
}

/// Reads an optional positive integer.
fn positive<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr + Default + PartialEq,
{
    let Ok(val) = env::var(key) else {
        return Ok(None);
    };

    let parsed = val
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected positive integer, got '{val}'"),
        })?;

    if parsed == T::default() {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "value must be greater than 0".to_string(),
        });
    }

    Ok(Some(parsed))
}
