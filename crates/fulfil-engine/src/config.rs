//! Ledger configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use fulfil_db::DbConfig;

/// Largest UTC offset accepted, in minutes.
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub max_connections: u32,

    /// How long a writer waits on a locked database before failing
    pub busy_timeout_secs: u64,

    /// Business time zone as minutes east of UTC (default: +05:30)
    pub utc_offset_minutes: i32,

    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            database_path: PathBuf::from("./fulfil.db"),
            max_connections: 5,
            busy_timeout_secs: 5,
            utc_offset_minutes: 330,
            log_level: "info".to_string(),
        }
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Builds a configuration from any key lookup.
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = LedgerConfig::default();

        let config = LedgerConfig {
            database_path: lookup("FULFIL_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            max_connections: parse_or(&lookup, "FULFIL_MAX_CONNECTIONS", defaults.max_connections)?,

            busy_timeout_secs: parse_or(
                &lookup,
                "FULFIL_BUSY_TIMEOUT_SECS",
                defaults.busy_timeout_secs,
            )?,

            utc_offset_minutes: parse_or(
                &lookup,
                "FULFIL_UTC_OFFSET_MINUTES",
                defaults.utc_offset_minutes,
            )?,

            log_level: lookup("FULFIL_LOG_LEVEL").unwrap_or(defaults.log_level),
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("FULFIL_MAX_CONNECTIONS".to_string()));
        }
        if config.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(ConfigError::InvalidValue("FULFIL_UTC_OFFSET_MINUTES".to_string()));
        }

        Ok(config)
    }

    /// Database settings for this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone())
            .max_connections(self.max_connections)
            .busy_timeout(Duration::from_secs(self.busy_timeout_secs))
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> Result<LedgerConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LedgerConfig::from_source(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = from_map(&[]).unwrap();
        assert_eq!(config.database_path, PathBuf::from("./fulfil.db"));
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.busy_timeout_secs, 5);
        assert_eq!(config.utc_offset_minutes, 330);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_overrides() {
        let config = from_map(&[
            ("FULFIL_DATABASE_PATH", "/var/lib/fulfil/ledger.db"),
            ("FULFIL_MAX_CONNECTIONS", "12"),
            ("FULFIL_UTC_OFFSET_MINUTES", "-300"),
        ])
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/var/lib/fulfil/ledger.db"));
        assert_eq!(config.max_connections, 12);
        assert_eq!(config.utc_offset_minutes, -300);
    }

    #[test]
    fn test_invalid_values_name_the_key() {
        let err = from_map(&[("FULFIL_BUSY_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for FULFIL_BUSY_TIMEOUT_SECS");

        assert!(from_map(&[("FULFIL_MAX_CONNECTIONS", "0")]).is_err());
        assert!(from_map(&[("FULFIL_UTC_OFFSET_MINUTES", "900")]).is_err());
    }
}
