//! Message source prefixes.
//!
//! A prefix identifies where a message came from: either a server name or a
//! user's `nick!user@host`.

use std::fmt;
use std::str::FromStr;

/// IRC message prefix.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Prefix {
    /// Server name (e.g. `irc.example.com`).
    ServerName(String),
    /// User prefix: nickname, username, hostname. User and host may be empty
    /// when the server sends a bare nickname.
    Nickname(String, String, String),
}

impl Prefix {
    /// Lenient parse; components are not validated.
    ///
    /// A dot before any `!` or `@` marks a server name.
    pub fn new_from_str(s: &str) -> Self {
        #[derive(Copy, Clone, Eq, PartialEq)]
        enum Part {
            Name,
            User,
            Host,
        }

        let mut name = String::new();
        let mut user = String::new();
        let mut host = String::new();
        let mut part = Part::Name;
        let mut is_server = false;

        for c in s.chars() {
            if c == '.' && part == Part::Name {
                is_server = true;
            }

            match c {
                '!' if part == Part::Name => {
                    is_server = false;
                    part = Part::User;
                }
                '@' if part != Part::Host => {
                    is_server = false;
                    part = Part::Host;
                }
                _ => match part {
                    Part::Name => name.push(c),
                    Part::User => user.push(c),
                    Part::Host => host.push(c),
                },
            }
        }

        if is_server {
            Prefix::ServerName(name)
        } else {
            Prefix::Nickname(name, user, host)
        }
    }

    /// Build a user prefix.
    pub fn new(nick: impl Into<String>, user: impl Into<String>, host: impl Into<String>) -> Self {
        Prefix::Nickname(nick.into(), user.into(), host.into())
    }

    /// The nickname, if this is a user prefix.
    pub fn nick(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(nick, _, _) if !nick.is_empty() => Some(nick),
            _ => None,
        }
    }

    /// The username, if present.
    pub fn user(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(_, user, _) if !user.is_empty() => Some(user),
            _ => None,
        }
    }

    /// The hostname, or the server name for server prefixes.
    pub fn host(&self) -> Option<&str> {
        match self {
            Prefix::ServerName(name) => Some(name),
            Prefix::Nickname(_, _, host) if !host.is_empty() => Some(host),
            _ => None,
        }
    }

    /// True for server-originated messages.
    pub fn is_server(&self) -> bool {
        matches!(self, Prefix::ServerName(_))
    }

    /// The full `nick!user@host`, only when all three parts are known.
    pub fn hostmask(&self) -> Option<String> {
        match self {
            Prefix::Nickname(n, u, h) if !n.is_empty() && !u.is_empty() && !h.is_empty() => {
                Some(format!("{n}!{u}@{h}"))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::ServerName(name) => f.write_str(name),
            Prefix::Nickname(nick, user, host) => {
                f.write_str(nick)?;
                if !user.is_empty() {
                    write!(f, "!{user}")?;
                }
                if !host.is_empty() {
                    write!(f, "@{host}")?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for Prefix {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Prefix::new_from_str(s))
    }
}

impl From<&str> for Prefix {
    fn from(s: &str) -> Self {
        Prefix::new_from_str(s)
    }
}
