//! Sans-IO registration state machine.
//!
//! The machine consumes parsed messages and produces actions; it never
//! touches a socket or a timer. The connection layer feeds it every inbound
//! message until it reports [`HandshakeAction::Complete`].
//!
//! Flow: `PASS`?, `CAP LS 302`, `NICK`, `USER` up front; then `CAP REQ`
//! for the wanted capabilities, SASL PLAIN if acknowledged and configured,
//! `CAP END`, and finally `001`. Servers without CAP support skip straight to
//! `001`. A nickname collision before `001` retries with `_` appended.

mod machine;
mod phases;

pub use machine::HandshakeMachine;

use thiserror::Error;

use crate::message::Message;

/// Current state of the registration handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not started.
    #[default]
    Disconnected,
    /// Sent CAP LS, awaiting capability list/ACK.
    CapabilityNegotiation,
    /// Performing SASL authentication.
    Authenticating,
    /// Sent CAP END, awaiting welcome (001).
    Registering,
    /// Received 001.
    Connected,
    /// ERROR received.
    Terminated,
}

/// Registration parameters.
#[derive(Clone, Debug)]
pub struct HandshakeConfig {
    /// Desired nickname.
    pub nickname: String,
    /// Username (ident).
    pub username: String,
    /// Real name / GECOS.
    pub realname: String,
    /// Server password.
    pub password: Option<String>,
    /// Capabilities to request when offered.
    pub request_caps: Vec<String>,
    /// SASL PLAIN credentials.
    pub sasl_credentials: Option<SaslCredentials>,
}

/// SASL PLAIN credentials.
#[derive(Clone, Debug)]
pub struct SaslCredentials {
    /// Account name.
    pub account: String,
    /// Password.
    pub password: String,
}

/// Actions produced by the machine.
#[derive(Clone, Debug)]
pub enum HandshakeAction {
    /// Send this message to the server.
    Send(Box<Message>),
    /// Registration finished; the machine is done.
    Complete,
    /// Something went wrong. Only [`HandshakeError::ServerError`] is fatal;
    /// the others are reported and the handshake carries on.
    Error(HandshakeError),
}

/// Problems reported during the handshake.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum HandshakeError {
    /// Server rejected capability request.
    #[error("capability rejected: {}", .0.join(", "))]
    CapabilityRejected(Vec<String>),
    /// SASL was configured but the server did not offer or accept it.
    #[error("SASL authentication failed: {0}")]
    SaslFailed(String),
    /// Nickname collision; the machine has already sent a replacement.
    #[error("nickname in use: {0}")]
    NicknameInUse(String),
    /// Server sent ERROR.
    #[error("server error: {0}")]
    ServerError(String),
}

impl HandshakeAction {
    /// Shorthand for a send action.
    pub(crate) fn send(msg: Message) -> Self {
        HandshakeAction::Send(Box::new(msg))
    }
}
