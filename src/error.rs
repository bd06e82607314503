//! Error types shared across the bot.
//!
//! Storage errors live in [`crate::db::DbError`] and configuration errors in
//! [`crate::config`]; this module holds the connection, session, handler and
//! command layers.

use bantracker_proto::{HandshakeError, ProtocolError};
use thiserror::Error;

use crate::db::DbError;

// ============================================================================
// Connection Errors (why a connection ended)
// ============================================================================

/// Errors that end a connection. The supervisor logs them and reconnects.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("registration failed: {0}")]
    Registration(#[from] HandshakeError),

    #[error("registration timed out")]
    RegistrationTimeout,

    #[error("connection closed by server")]
    Closed,
}

// ============================================================================
// Session Errors (request/response correlation, outbound queue)
// ============================================================================

/// Errors from the live IRC session.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// The connection went away while waiting or sending.
    #[error("session disconnected")]
    Disconnected,

    /// Nothing matching arrived before the deadline.
    #[error("timed out waiting for server")]
    Timeout,
}

impl SessionError {
    /// Get a static error code string for log fields.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Timeout => "timeout",
        }
    }
}

// ============================================================================
// Handler Errors (logged by the dispatcher, never sent to users)
// ============================================================================

/// Errors from event handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Store(#[from] DbError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl HandlerError {
    /// Get a static error code string for log fields.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Store(_) => "store_error",
            Self::Session(e) => e.error_code(),
        }
    }
}

// ============================================================================
// Command Errors (rendered back to the requester as NOTICE text)
// ============================================================================

/// Errors from the `comment` command. `Display` is the reply text.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("No last ban id for channel")]
    NoLastRecord,

    #[error("Please provide a numeric ban id")]
    InvalidId,

    #[error("Ban {0} does not exist")]
    UnknownId(i64),

    #[error("You do not have permission to do this")]
    PermissionDenied,

    #[error("Please provide duration or reason or both")]
    EmptyPayload,

    #[error("Invalid duration provided")]
    InvalidDuration,

    #[error("Internal error, please try again later")]
    Store(#[from] DbError),
}

impl CommandError {
    /// Get a static error code string for log fields.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoLastRecord => "no_last_record",
            Self::InvalidId => "invalid_id",
            Self::UnknownId(_) => "unknown_id",
            Self::PermissionDenied => "permission_denied",
            Self::EmptyPayload => "empty_payload",
            Self::InvalidDuration => "invalid_duration",
            Self::Store(_) => "store_error",
        }
    }

    /// Whether this is the requester's fault, as opposed to ours.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}
