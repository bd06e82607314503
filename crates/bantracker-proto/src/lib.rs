//! # bantracker-proto
//!
//! Client-side IRC protocol pieces used by the bantracker bot: line framing,
//! message parsing and serialization, case-mapping, ban-mask globbing,
//! ISUPPORT tracking, channel mode parsing and the registration handshake.
//!
//! ```rust
//! use bantracker_proto::{CaseMapping, Glob, Message};
//!
//! let msg: Message = ":op!o@h MODE #chan +b *!*@*.example.com".parse().unwrap();
//! let glob = Glob::compile(&msg.params[2], CaseMapping::Rfc1459);
//! assert!(glob.matches("nick!user@host.EXAMPLE.com"));
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod casemap;
#[cfg(feature = "tokio")]
pub mod codec;
pub mod error;
pub mod glob;
pub mod handshake;
pub mod isupport;
pub mod message;
pub mod mode;
pub mod prefix;
pub mod response;
pub mod sasl;

pub use self::casemap::{irc_eq, irc_to_lower, CaseMapping};
#[cfg(feature = "tokio")]
pub use self::codec::IrcCodec;
pub use self::error::{MessageParseError, ProtocolError};
pub use self::glob::{glob_match, Glob};
pub use self::handshake::{
    ConnectionState, HandshakeAction, HandshakeConfig, HandshakeError, HandshakeMachine,
    SaslCredentials,
};
pub use self::isupport::{ChanModes, PrefixSpec, ServerSupport};
pub use self::message::Message;
pub use self::mode::{chunk_mode_lines, parse_channel_modes, ModeChange, ModeChanges};
pub use self::prefix::Prefix;
pub use self::response::Response;
