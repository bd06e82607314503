//! Process-wide handler context.
//!
//! Built once in `main` and shared by the dispatcher, spawned enforcement
//! batches and the expiry scheduler. The current [`Session`] is swapped in
//! and out as connections come and go.

use parking_lot::RwLock;

use super::privilege::PrivilegeLocks;
use crate::config::Config;
use crate::db::{Database, RestrictionKind};
use crate::network::Session;

/// Ban letter; fixed by the protocol.
pub const BAN_LETTER: char = 'b';

/// Everything a handler needs beyond the message itself.
pub struct Context {
    /// Loaded configuration.
    pub config: Config,
    /// Record store.
    pub db: Database,
    /// Per-channel locks serializing privileged batches.
    pub privilege: PrivilegeLocks,
    session: RwLock<Option<Session>>,
}

impl Context {
    /// Create a context with no live session.
    pub fn new(config: Config, db: Database) -> Self {
        Self {
            config,
            db,
            privilege: PrivilegeLocks::default(),
            session: RwLock::new(None),
        }
    }

    /// Current session, if connected.
    pub fn session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    /// Install or clear the current session.
    pub fn set_session(&self, session: Option<Session>) {
        *self.session.write() = session;
    }

    /// Mode letters this bot tracks.
    pub fn watched(&self) -> WatchedModes {
        WatchedModes {
            quiet: self.config.bot.quiet,
        }
    }
}

/// Mapping between tracked mode letters and record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchedModes {
    /// Quiet letter, `None` when quiets are not tracked.
    pub quiet: Option<char>,
}

impl WatchedModes {
    /// Record kind for a mode letter, if it is watched.
    pub fn kind_for(&self, letter: char) -> Option<RestrictionKind> {
        if letter == BAN_LETTER {
            Some(RestrictionKind::Ban)
        } else if Some(letter) == self.quiet {
            Some(RestrictionKind::Quiet)
        } else {
            None
        }
    }

    /// Mode letter for a record kind, if that kind is tracked.
    pub fn letter_for(&self, kind: RestrictionKind) -> Option<char> {
        match kind {
            RestrictionKind::Ban => Some(BAN_LETTER),
            RestrictionKind::Quiet => self.quiet,
        }
    }

    /// Every tracked `(kind, letter)` pair, bans first.
    pub fn letters(&self) -> impl Iterator<Item = (RestrictionKind, char)> {
        let quiet = self.quiet.map(|q| (RestrictionKind::Quiet, q));
        std::iter::once((RestrictionKind::Ban, BAN_LETTER)).chain(quiet)
    }
}
