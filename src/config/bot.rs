//! Channel behaviour and expiry configuration.

use serde::Deserialize;
use std::time::Duration;

/// What the bot does in its channels.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Channels to join and track.
    pub channels: Vec<String>,
    /// Command prefix (default: `!`).
    #[serde(default = "default_trigger")]
    pub trigger: String,
    /// Kick members matching a newly set ban.
    #[serde(default)]
    pub enforce: bool,
    /// Ask services for op when a privileged action needs it.
    #[serde(default)]
    pub chanserv: bool,
    /// Services nickname to ask for op (default: `ChanServ`).
    #[serde(default = "default_services_nick")]
    pub services_nick: String,
    /// Mode letter for quiets (e.g. `q`); absent disables quiet tracking.
    #[serde(default)]
    pub quiet: Option<char>,
    /// Seconds to wait for op after asking services (default: 10).
    #[serde(default = "default_privilege_timeout")]
    pub privilege_timeout_secs: u64,
    /// Seconds to wait for a complete ban/quiet list on join (default: 30).
    #[serde(default = "default_list_timeout")]
    pub list_timeout_secs: u64,
}

impl BotConfig {
    /// Privilege wait as a [`Duration`].
    pub fn privilege_timeout(&self) -> Duration {
        Duration::from_secs(self.privilege_timeout_secs)
    }

    /// List wait as a [`Duration`].
    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }
}

/// Expiry scheduler configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpiryConfig {
    /// Mark records expired as soon as the removal is sent, for servers that
    /// do not echo the bot's own mode changes back to it.
    #[serde(default)]
    pub mark_on_send: bool,
}

fn default_trigger() -> String {
    "!".to_string()
}

fn default_services_nick() -> String {
    "ChanServ".to_string()
}

fn default_privilege_timeout() -> u64 {
    10
}

fn default_list_timeout() -> u64 {
    30
}
