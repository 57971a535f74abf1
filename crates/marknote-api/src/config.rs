use std::collections::HashMap;
use std::env;

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_DB_PATH: &str = "marknote-api.db";
/// Database path that keeps everything in memory
pub const IN_MEMORY_DB: &str = ":memory:";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: String,
    pub db_path: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "MARKNOTE_API_BIND_ADDR", DEFAULT_BIND_ADDR);
        let has_port = bind_addr
            .rsplit_once(':')
            .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
        if !has_port {
            return Err(ConfigError::Invalid(
                "MARKNOTE_API_BIND_ADDR must look like host:port".to_string(),
            ));
        }

        let db_path = value_or_default(&lookup, "MARKNOTE_API_DB_PATH", DEFAULT_DB_PATH);

        Ok(Self { bind_addr, db_path })
    }

    pub fn in_memory(&self) -> bool {
        self.db_path == IN_MEMORY_DB
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            db_path: DEFAULT_DB_PATH.to_string(),
        }
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use pretty_assertions::assert_eq;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        AppConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn defaults_apply_when_unset() {
        assert_eq!(config_from(&[]).unwrap(), AppConfig::default());
    }

    #[test]
    fn accepts_in_memory_database() {
        let config = config_from(&[
            ("MARKNOTE_API_BIND_ADDR", "0.0.0.0:9000"),
            ("MARKNOTE_API_DB_PATH", ":memory:"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert!(config.in_memory());
    }

    #[test]
    fn rejects_bind_addr_without_port() {
        let error = config_from(&[("MARKNOTE_API_BIND_ADDR", "localhost")]).unwrap_err();
        assert!(error.to_string().contains("MARKNOTE_API_BIND_ADDR"));

        assert!(config_from(&[("MARKNOTE_API_BIND_ADDR", "localhost:http")]).is_err());
    }
}
