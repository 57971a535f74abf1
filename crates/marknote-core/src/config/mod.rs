//! Client configuration.
//!
//! Values come from the process environment (optionally seeded from a
//! `.env` file by the binary) through an injectable lookup so they can be
//! tested without touching real variables.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::util::is_http_url;

/// Default period between background round trips.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(15);
/// Shortest allowed period between background round trips.
pub const MIN_SYNC_INTERVAL: Duration = Duration::from_secs(3);
/// Default window in which edits are coalesced into one push.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(1_000);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Runtime options for clients talking to a notes backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL without a trailing slash
    pub server_url: Option<String>,
    /// Overrides the user id stored in settings
    pub user_id: Option<String>,
    pub sync_interval: Duration,
    pub debounce_window: Duration,
    pub http_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            user_id: None,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            debounce_window: DEFAULT_DEBOUNCE_WINDOW,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let server_url = optional_trimmed(&lookup, "MARKNOTE_SERVER_URL")
            .map(|url| url.trim_end_matches('/').to_string());
        if let Some(url) = server_url.as_deref() {
            if !is_http_url(url) {
                return Err(ConfigError::Invalid(
                    "MARKNOTE_SERVER_URL must start with http:// or https://".to_string(),
                ));
            }
        }

        let user_id = optional_trimmed(&lookup, "MARKNOTE_USER_ID");

        let sync_interval_secs = parse_u64(&lookup, "MARKNOTE_SYNC_INTERVAL_SECS", 15)?;
        let sync_interval = clamp_sync_interval(Duration::from_secs(sync_interval_secs));

        let debounce_window =
            Duration::from_millis(parse_u64(&lookup, "MARKNOTE_DEBOUNCE_MS", 1_000)?);

        let timeout_secs = parse_u64(&lookup, "MARKNOTE_HTTP_TIMEOUT_SECS", 10)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "MARKNOTE_HTTP_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            server_url,
            user_id,
            sync_interval,
            debounce_window,
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Raise intervals below [`MIN_SYNC_INTERVAL`] to the floor.
pub fn clamp_sync_interval(interval: Duration) -> Duration {
    if interval < MIN_SYNC_INTERVAL {
        tracing::warn!(
            "Sync interval {:?} is below the {:?} floor; using the floor",
            interval,
            MIN_SYNC_INTERVAL
        );
        MIN_SYNC_INTERVAL
    } else {
        interval
    }
}

fn parse_u64(
    lookup: impl Fn(&str) -> Option<String>,
    name: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    optional_trimmed(lookup, name).map_or(Ok(default), |value| {
        value
            .parse::<u64>()
            .map_err(|_| ConfigError::Invalid(format!("{name} must be a non-negative integer")))
    })
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        ClientConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn empty_environment_uses_defaults() {
        assert_eq!(config_from(&[]).unwrap(), ClientConfig::default());
    }

    #[test]
    fn server_url_is_validated_and_trimmed() {
        let config = config_from(&[("MARKNOTE_SERVER_URL", " http://localhost:8080/ ")]).unwrap();
        assert_eq!(config.server_url.as_deref(), Some("http://localhost:8080"));

        let err = config_from(&[("MARKNOTE_SERVER_URL", "localhost:8080")]).unwrap_err();
        assert!(err.to_string().contains("MARKNOTE_SERVER_URL"));
    }

    #[test]
    fn sync_interval_respects_floor() {
        let config = config_from(&[("MARKNOTE_SYNC_INTERVAL_SECS", "1")]).unwrap();
        assert_eq!(config.sync_interval, MIN_SYNC_INTERVAL);

        let config = config_from(&[("MARKNOTE_SYNC_INTERVAL_SECS", "60")]).unwrap();
        assert_eq!(config.sync_interval, Duration::from_secs(60));
    }

    #[test]
    fn rejects_non_numeric_and_zero_values() {
        assert!(config_from(&[("MARKNOTE_DEBOUNCE_MS", "soon")]).is_err());
        assert!(config_from(&[("MARKNOTE_HTTP_TIMEOUT_SECS", "0")]).is_err());
    }
}
