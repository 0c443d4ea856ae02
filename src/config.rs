use std::time::Duration;

use reqwest::Url;

pub const API_URL_VAR: &str = "TRIVIA_API_URL";
pub const REQUEST_TIMEOUT_VAR: &str = "TRIVIA_REQUEST_TIMEOUT_SECS";

const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Errors that can occur while reading settings from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("TRIVIA_API_URL is not a valid URL ({value:?}): {reason}")]
    InvalidApiUrl { value: String, reason: String },
    #[error("TRIVIA_REQUEST_TIMEOUT_SECS must be a positive number of seconds, got {0:?}")]
    InvalidTimeout(String),
}

/// Everything the bot needs besides the Telegram token, which teloxide reads
/// from `TELOXIDE_TOKEN` itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: Url,
    pub request_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut raw_url = lookup(API_URL_VAR).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        // Endpoints are joined onto the base, which only keeps the last path
        // segment when it ends with a slash.
        if !raw_url.ends_with('/') {
            raw_url.push('/');
        }
        let api_url = Url::parse(&raw_url).map_err(|e| ConfigError::InvalidApiUrl {
            value: raw_url.clone(),
            reason: e.to_string(),
        })?;

        let request_timeout = match lookup(REQUEST_TIMEOUT_VAR) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or(ConfigError::InvalidTimeout(raw))?,
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        Ok(Self {
            api_url,
            request_timeout,
        })
    }
}
