//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("server.host is required")]
    MissingHost,
    #[error("server.port must be non-zero")]
    InvalidPort,
    #[error("server.nick must be non-empty and contain no spaces, got '{0}'")]
    InvalidNick(String),
    #[error("bot.channels must list at least one channel")]
    NoChannels,
    #[error("bot.channels entry is not a channel name: '{0}'")]
    InvalidChannel(String),
    #[error("bot.trigger must be non-empty and contain no spaces")]
    InvalidTrigger,
    #[error("bot.quiet must be a mode letter other than 'b', got '{0}'")]
    InvalidQuietLetter(char),
    #[error("bot.{0} must be at least 1 second")]
    ZeroTimeout(&'static str),
    #[error("limits.{0} must be at least 1")]
    ZeroLimit(&'static str),
    #[error("database.path parent directory does not exist: {0}")]
    DatabasePathInvalid(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push(ValidationError::MissingHost);
    }
    if config.server.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }
    let nick = &config.server.nick;
    if nick.is_empty() || nick.contains(' ') {
        errors.push(ValidationError::InvalidNick(nick.clone()));
    }

    if config.bot.channels.is_empty() {
        errors.push(ValidationError::NoChannels);
    }
    for channel in &config.bot.channels {
        let valid = channel.len() > 1
            && channel.starts_with(['#', '&', '+', '!'])
            && !channel.contains([' ', ',', '\x07']);
        if !valid {
            errors.push(ValidationError::InvalidChannel(channel.clone()));
        }
    }

    if config.bot.trigger.is_empty() || config.bot.trigger.contains(' ') {
        errors.push(ValidationError::InvalidTrigger);
    }
    if let Some(letter) = config.bot.quiet
        && (!letter.is_ascii_alphabetic() || letter == 'b')
    {
        errors.push(ValidationError::InvalidQuietLetter(letter));
    }

    if config.bot.privilege_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("privilege_timeout_secs"));
    }
    if config.bot.list_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("list_timeout_secs"));
    }
    if config.limits.lines_per_second == 0 {
        errors.push(ValidationError::ZeroLimit("lines_per_second"));
    }
    if config.limits.burst == 0 {
        errors.push(ValidationError::ZeroLimit("burst"));
    }

    if config.database.path != ":memory:" {
        let db_path = Path::new(&config.database.path);
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            errors.push(ValidationError::DatabasePathInvalid(
                config.database.path.clone(),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
