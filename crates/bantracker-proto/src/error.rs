//! Error types for the protocol crate.
//!
//! Framing and encoding errors surface as [`ProtocolError`], line-level parse failures as
//! [`MessageParseError`].

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Line exceeded maximum allowed length.
    #[error("line too long: {actual} bytes (limit: {limit})")]
    MessageTooLong {
        /// Actual line length.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },

    /// Failed to parse an IRC message.
    #[error("invalid message: {string}")]
    InvalidMessage {
        /// The invalid message string.
        string: String,
        /// The underlying parse error.
        #[source]
        cause: MessageParseError,
    },
}

/// Errors produced while parsing a single line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum MessageParseError {
    /// The line was empty after stripping the line ending.
    #[error("empty message")]
    EmptyMessage,

    /// A tags section (`@...`) was not followed by anything.
    #[error("tags without a command")]
    DanglingTags,

    /// A prefix (`:...`) was not followed by a command.
    #[error("prefix without a command")]
    MissingCommand,

    /// The command token contained characters outside `[A-Za-z0-9]`.
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}
