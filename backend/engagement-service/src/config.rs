/// Configuration management for Engagement Service
///
/// Loads configuration from environment variables.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::services::FanoutConfig;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Notification fan-out configuration
    pub notifications: NotificationConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// HTTP port
    pub http_port: u16,
    /// Emit JSON log lines
    pub json_logs: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,
    /// Max connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Min connections in pool
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Upper bound on a notification write before it is abandoned
    pub timeout_ms: u64,
    /// Comment characters quoted in comment notifications
    pub excerpt_chars: usize,
}

impl NotificationConfig {
    pub fn fanout(&self) -> FanoutConfig {
        FanoutConfig {
            timeout: Duration::from_millis(self.timeout_ms),
            excerpt_chars: self.excerpt_chars,
        }
    }
}

// Default values
fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn parsed<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|s| s.parse().ok()).unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let app = AppConfig {
            env: lookup("APP_ENV").unwrap_or_else(|| "development".to_string()),
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            http_port: parsed(lookup("PORT"), 8010),
            json_logs: lookup("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        };

        let database = DatabaseConfig {
            url: lookup("DATABASE_URL").context("DATABASE_URL environment variable not set")?,
            max_connections: parsed(lookup("DB_MAX_CONNECTIONS"), default_max_connections()),
            min_connections: parsed(lookup("DB_MIN_CONNECTIONS"), default_min_connections()),
        };

        let notifications = NotificationConfig {
            timeout_ms: parsed(lookup("NOTIFY_TIMEOUT_MS"), 2000),
            excerpt_chars: parsed(lookup("COMMENT_EXCERPT_CHARS"), 50),
        };

        Ok(Config {
            app,
            database,
            notifications,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://test")])).unwrap();

        assert_eq!(config.app.env, "development");
        assert_eq!(config.app.host, "0.0.0.0");
        assert_eq!(config.app.http_port, 8010);
        assert!(!config.app.json_logs);
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.database.min_connections, 5);
        assert_eq!(config.notifications.timeout_ms, 2000);
        assert_eq!(config.notifications.excerpt_chars, 50);
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://test"),
            ("PORT", "9000"),
            ("DB_MAX_CONNECTIONS", "not-a-number"),
            ("LOG_FORMAT", "JSON"),
            ("NOTIFY_TIMEOUT_MS", "150"),
        ]))
        .unwrap();

        assert_eq!(config.app.http_port, 9000);
        assert_eq!(config.database.max_connections, 20);
        assert!(config.app.json_logs);
        assert_eq!(
            config.notifications.fanout().timeout,
            Duration::from_millis(150)
        );
    }

    #[test]
    fn test_missing_database_url() {
        assert!(Config::from_lookup(|_| None).is_err());
    }
}
