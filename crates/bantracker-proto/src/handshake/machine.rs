//! Handshake state machine core.

use std::collections::HashSet;

use crate::message::Message;

use super::{ConnectionState, HandshakeAction, HandshakeConfig};

/// Sans-IO state machine for the CAP -> AUTHENTICATE -> 001 flow.
#[derive(Clone, Debug)]
pub struct HandshakeMachine {
    pub(super) config: HandshakeConfig,
    pub(super) state: ConnectionState,
    /// Capabilities acknowledged by server.
    pub(super) enabled_caps: HashSet<String>,
    /// Capabilities available on server.
    pub(super) available_caps: HashSet<String>,
    /// Nickname most recently sent.
    pub(super) nickname: String,
}

impl HandshakeMachine {
    /// Create a machine for the given registration parameters.
    #[must_use]
    pub fn new(config: HandshakeConfig) -> Self {
        let nickname = config.nickname.clone();
        Self {
            config,
            state: ConnectionState::Disconnected,
            enabled_caps: HashSet::new(),
            available_caps: HashSet::new(),
            nickname,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Capabilities the server acknowledged.
    #[must_use]
    pub fn enabled_caps(&self) -> &HashSet<String> {
        &self.enabled_caps
    }

    /// The nickname we last asked for. After `Complete` this is our nick.
    #[must_use]
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Start the handshake. Returns the opening lines.
    #[must_use]
    pub fn start(&mut self) -> Vec<HandshakeAction> {
        self.state = ConnectionState::CapabilityNegotiation;
        let mut actions = Vec::new();

        if let Some(ref pass) = self.config.password {
            actions.push(HandshakeAction::send(Message::pass(pass)));
        }

        // Registration is held by the server until CAP END, so NICK/USER can
        // go out immediately; servers without CAP just ignore the LS.
        actions.push(HandshakeAction::send(Message::new("CAP", ["LS", "302"])));
        actions.push(HandshakeAction::send(Message::nick(&self.nickname)));
        actions.push(HandshakeAction::send(Message::user(
            &self.config.username,
            &self.config.realname,
        )));

        actions
    }

    /// Feed one inbound message.
    #[must_use]
    pub fn feed(&mut self, msg: &Message) -> Vec<HandshakeAction> {
        if matches!(
            self.state,
            ConnectionState::Disconnected | ConnectionState::Connected | ConnectionState::Terminated
        ) {
            return Vec::new();
        }

        if let Some(actions) = self.handle_common(msg) {
            return actions;
        }

        match self.state {
            ConnectionState::CapabilityNegotiation => self.handle_cap_negotiation(msg),
            ConnectionState::Authenticating => self.handle_authentication(msg),
            _ => Vec::new(),
        }
    }
}
