//! State transition handlers for handshake phases.

use crate::message::Message;
use crate::response::Response;
use crate::sasl;

use super::machine::HandshakeMachine;
use super::{ConnectionState, HandshakeAction, HandshakeError};

impl HandshakeMachine {
    /// Lines that matter in every pre-welcome state. `None` means the
    /// message was not one of them.
    pub(super) fn handle_common(&mut self, msg: &Message) -> Option<Vec<HandshakeAction>> {
        if msg.command == "ERROR" {
            let reason = msg.param(0).unwrap_or("connection closed").to_string();
            self.state = ConnectionState::Terminated;
            return Some(vec![HandshakeAction::Error(HandshakeError::ServerError(reason))]);
        }

        match Response::from_command(&msg.command)? {
            Response::RPL_WELCOME => {
                if let Some(nick) = msg.param(0) {
                    self.nickname = nick.to_string();
                }
                self.state = ConnectionState::Connected;
                Some(vec![HandshakeAction::Complete])
            }
            Response::ERR_NICKNAMEINUSE
            | Response::ERR_ERRONEUSNICKNAME
            | Response::ERR_UNAVAILRESOURCE => {
                let taken = std::mem::take(&mut self.nickname);
                self.nickname = format!("{taken}_");
                Some(vec![
                    HandshakeAction::Error(HandshakeError::NicknameInUse(taken)),
                    HandshakeAction::send(Message::nick(&self.nickname)),
                ])
            }
            _ => None,
        }
    }

    pub(super) fn handle_cap_negotiation(&mut self, msg: &Message) -> Vec<HandshakeAction> {
        if msg.command != "CAP" {
            return Vec::new();
        }

        let subcmd = msg.param(1).unwrap_or("").to_ascii_uppercase();
        match subcmd.as_str() {
            "LS" => {
                let (is_multiline, caps_str) = if msg.param(2) == Some("*") {
                    (true, msg.param(3).unwrap_or(""))
                } else {
                    (false, msg.param(2).unwrap_or(""))
                };

                for cap in caps_str.split_whitespace() {
                    let cap_name = cap.split('=').next().unwrap_or(cap);
                    self.available_caps.insert(cap_name.to_string());
                }

                if is_multiline {
                    return Vec::new();
                }

                let to_request: Vec<&str> = self
                    .config
                    .request_caps
                    .iter()
                    .filter(|c| self.available_caps.contains(*c))
                    .map(String::as_str)
                    .collect();

                if to_request.is_empty() {
                    let mut actions = self.sasl_unavailable();
                    actions.extend(self.finish_cap_negotiation());
                    actions
                } else {
                    vec![HandshakeAction::send(Message::new(
                        "CAP",
                        ["REQ".to_string(), to_request.join(" ")],
                    ))]
                }
            }
            "ACK" => {
                let caps_str = msg.param(2).unwrap_or("");
                for cap in caps_str.split_whitespace() {
                    if !cap.starts_with('-') {
                        self.enabled_caps
                            .insert(cap.trim_start_matches(['~', '=']).to_string());
                    }
                }

                if self.enabled_caps.contains("sasl") && self.config.sasl_credentials.is_some() {
                    self.state = ConnectionState::Authenticating;
                    vec![HandshakeAction::send(Message::new("AUTHENTICATE", ["PLAIN"]))]
                } else {
                    let mut actions = self.sasl_unavailable();
                    actions.extend(self.finish_cap_negotiation());
                    actions
                }
            }
            "NAK" => {
                let rejected: Vec<String> = msg
                    .param(2)
                    .unwrap_or("")
                    .split_whitespace()
                    .map(String::from)
                    .collect();
                let mut actions = vec![HandshakeAction::Error(HandshakeError::CapabilityRejected(
                    rejected,
                ))];
                actions.extend(self.sasl_unavailable());
                actions.extend(self.finish_cap_negotiation());
                actions
            }
            _ => Vec::new(),
        }
    }

    pub(super) fn handle_authentication(&mut self, msg: &Message) -> Vec<HandshakeAction> {
        if msg.command == "AUTHENTICATE" {
            let creds = match (msg.param(0), &self.config.sasl_credentials) {
                (Some("+"), Some(creds)) => creds,
                _ => return Vec::new(),
            };
            let payload = sasl::encode_plain(&creds.account, &creds.password);
            return sasl::chunk_payload(&payload)
                .into_iter()
                .map(|chunk| HandshakeAction::send(Message::new("AUTHENTICATE", [chunk])))
                .collect();
        }

        match Response::from_command(&msg.command) {
            Some(Response::RPL_SASLSUCCESS) => self.finish_cap_negotiation(),
            Some(
                Response::ERR_SASLFAIL
                | Response::ERR_SASLTOOLONG
                | Response::ERR_SASLABORTED
                | Response::ERR_SASLALREADY,
            ) => {
                let reason = msg.param(1).unwrap_or("unknown error").to_string();
                let mut actions = vec![HandshakeAction::Error(HandshakeError::SaslFailed(reason))];
                actions.extend(self.finish_cap_negotiation());
                actions
            }
            _ => Vec::new(),
        }
    }

    fn sasl_unavailable(&self) -> Vec<HandshakeAction> {
        if self.config.sasl_credentials.is_some() && !self.enabled_caps.contains("sasl") {
            vec![HandshakeAction::Error(HandshakeError::SaslFailed(
                "server did not offer sasl".to_string(),
            ))]
        } else {
            Vec::new()
        }
    }

    pub(super) fn finish_cap_negotiation(&mut self) -> Vec<HandshakeAction> {
        self.state = ConnectionState::Registering;
        vec![HandshakeAction::send(Message::new("CAP", ["END"]))]
    }
}
