//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::bot::{BotConfig, ExpiryConfig};
use super::limits::LimitsConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// IRC server connection.
    pub server: ServerConfig,
    /// Record store location.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Channel behaviour.
    pub bot: BotConfig,
    /// Expiry scheduler behaviour.
    #[serde(default)]
    pub expiry: ExpiryConfig,
    /// Outbound flood control.
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

/// IRC server connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Hostname or address.
    pub host: String,
    /// Plain-text port (default: 6667).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Nickname to register with.
    pub nick: String,
    /// Username (ident); defaults to the nickname.
    #[serde(default)]
    pub username: Option<String>,
    /// Real name / GECOS.
    #[serde(default = "default_realname")]
    pub realname: String,
    /// Server password (PASS).
    #[serde(default)]
    pub password: Option<String>,
    /// SASL PLAIN credentials.
    #[serde(default)]
    pub sasl: Option<SaslConfig>,
    /// Seconds to wait before reconnecting after the connection drops (default: 30).
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
}

impl ServerConfig {
    /// Username to register with.
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.nick)
    }

    /// Reconnect delay as a [`Duration`].
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

/// SASL PLAIN credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct SaslConfig {
    /// Services account name.
    pub account: String,
    /// Services password.
    pub password: String,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_port() -> u16 {
    6667
}

fn default_realname() -> String {
    "bantracker".to_string()
}

fn default_reconnect_delay() -> u64 {
    30
}

fn default_database_path() -> String {
    "bantracker.db".to_string()
}
