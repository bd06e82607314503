//! User-related types and state.

use bantracker_proto::Prefix;

/// A user seen in one of our channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Current nickname, original case.
    pub nick: String,
    /// Username (ident), once known.
    pub user: Option<String>,
    /// Hostname, once known.
    pub host: Option<String>,
}

impl User {
    /// A user known only by nickname.
    pub fn new(nick: &str) -> Self {
        Self {
            nick: nick.to_string(),
            user: None,
            host: None,
        }
    }

    /// Fill in user/host from a message prefix, when it carries them.
    pub fn learn_from(&mut self, prefix: &Prefix) {
        if let Some(user) = prefix.user() {
            self.user = Some(user.to_string());
        }
        if let (Some(host), Prefix::Nickname(..)) = (prefix.host(), prefix) {
            self.host = Some(host.to_string());
        }
    }

    /// `nick!user@host`, only once both user and host are known.
    pub fn hostmask(&self) -> Option<String> {
        match (&self.user, &self.host) {
            (Some(user), Some(host)) => Some(format!("{}!{}@{}", self.nick, user, host)),
            _ => None,
        }
    }
}
