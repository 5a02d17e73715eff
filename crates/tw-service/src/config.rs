//! Application configuration.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tw_engine::EngineConfig;
use tw_ws::{ConnectionConfig, PingFormat};

/// Feed transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Venue public feed URL.
    #[serde(default = "default_feed_url")]
    pub url: String,
    /// Maximum reconnection attempts (0 = infinite).
    #[serde(default)]
    pub max_reconnect_attempts: u32,
    /// Fixed delay between reconnection attempts (ms).
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// Keepalive ping interval (ms).
    #[serde(default = "default_keepalive_interval_ms")]
    pub keepalive_interval_ms: u64,
    /// Grace window for the pong after a ping (ms).
    #[serde(default = "default_keepalive_grace_ms")]
    pub keepalive_grace_ms: u64,
    /// Ping/pong framing variant.
    #[serde(default)]
    pub ping_format: PingFormat,
}

fn default_feed_url() -> String {
    "wss://ws.bitget.com/v2/ws/public".to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    5000
}

fn default_keepalive_interval_ms() -> u64 {
    30_000
}

fn default_keepalive_grace_ms() -> u64 {
    35_000
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            max_reconnect_attempts: 0,
            reconnect_delay_ms: default_reconnect_delay_ms(),
            keepalive_interval_ms: default_keepalive_interval_ms(),
            keepalive_grace_ms: default_keepalive_grace_ms(),
            ping_format: PingFormat::default(),
        }
    }
}

impl From<FeedConfig> for ConnectionConfig {
    fn from(cfg: FeedConfig) -> Self {
        Self {
            url: cfg.url,
            max_reconnect_attempts: cfg.max_reconnect_attempts,
            reconnect_delay_ms: cfg.reconnect_delay_ms,
            keepalive_interval_ms: cfg.keepalive_interval_ms,
            keepalive_grace_ms: cfg.keepalive_grace_ms,
            ping_format: cfg.ping_format,
        }
    }
}

/// Engine persistence-retry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_persist_retry_attempts")]
    pub persist_retry_attempts: u32,
    #[serde(default = "default_persist_retry_backoff_ms")]
    pub persist_retry_backoff_ms: u64,
}

fn default_persist_retry_attempts() -> u32 {
    3
}

fn default_persist_retry_backoff_ms() -> u64 {
    250
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            persist_retry_attempts: default_persist_retry_attempts(),
            persist_retry_backoff_ms: default_persist_retry_backoff_ms(),
        }
    }
}

impl From<EngineSettings> for EngineConfig {
    fn from(cfg: EngineSettings) -> Self {
        Self {
            persist_retry_attempts: cfg.persist_retry_attempts,
            persist_retry_backoff_ms: cfg.persist_retry_backoff_ms,
        }
    }
}

/// Notification hub configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Buffered events per observer channel.
    #[serde(default = "default_observer_buffer")]
    pub observer_buffer: usize,
}

fn default_observer_buffer() -> usize {
    64
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            observer_buffer: default_observer_buffer(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl AppConfig {
    /// Load configuration from file, falling back to defaults when the
    /// file does not exist.
    pub fn load() -> AppResult<Self> {
        let config_path =
            std::env::var("TW_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.feed.reconnect_delay_ms, 5000);
        assert_eq!(config.feed.keepalive_interval_ms, 30_000);
        assert_eq!(config.feed.keepalive_grace_ms, 35_000);
        assert_eq!(config.feed.max_reconnect_attempts, 0);
        assert_eq!(config.engine.persist_retry_attempts, 3);
        assert_eq!(config.notify.observer_buffer, 64);
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [feed]
            url = "ws://localhost:9000"
            ping_format = "text"

            [engine]
            persist_retry_attempts = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.feed.url, "ws://localhost:9000");
        assert_eq!(config.feed.ping_format, PingFormat::Text);
        // Unspecified fields keep their defaults.
        assert_eq!(config.feed.reconnect_delay_ms, 5000);
        assert_eq!(config.engine.persist_retry_attempts, 5);
        assert_eq!(config.engine.persist_retry_backoff_ms, 250);
    }

    #[test]
    fn test_connection_config_conversion() {
        let feed = FeedConfig {
            url: "ws://example".to_string(),
            ..Default::default()
        };
        let conn: ConnectionConfig = feed.into();
        assert_eq!(conn.url, "ws://example");
        assert_eq!(conn.reconnect_delay_ms, 5000);
    }
}
