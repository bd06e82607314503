//! Restriction record models.

use std::fmt;

/// What a record restricts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RestrictionKind {
    /// Channel ban; matching members are removed when enforcement is on.
    Ban,
    /// Quiet; tracked but never enforced by removal.
    Quiet,
}

impl RestrictionKind {
    /// Value stored in the `kind` column.
    pub fn as_db(self) -> i64 {
        match self {
            RestrictionKind::Ban => 0,
            RestrictionKind::Quiet => 1,
        }
    }

    /// Inverse of [`RestrictionKind::as_db`]. Unknown values read as bans.
    pub fn from_db(value: i64) -> Self {
        match value {
            1 => RestrictionKind::Quiet,
            _ => RestrictionKind::Ban,
        }
    }

    /// Capitalised name used in user-facing notices.
    pub fn title(self) -> &'static str {
        match self {
            RestrictionKind::Ban => "Ban",
            RestrictionKind::Quiet => "Quiet",
        }
    }
}

impl fmt::Display for RestrictionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RestrictionKind::Ban => "ban",
            RestrictionKind::Quiet => "quiet",
        })
    }
}

/// A stored restriction record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanRecord {
    /// Unique, monotonically increasing id.
    pub id: i64,
    /// Case-folded channel name.
    pub channel: String,
    /// Ban or quiet.
    pub kind: RestrictionKind,
    /// Glob mask as the server reported it.
    pub mask: String,
    /// Who set it: `nick!user@host`, a bare nick, or a server name.
    pub set_by: String,
    /// Unix timestamp when it was set.
    pub set_at: i64,
    /// Seconds until expiry, `None` for indefinite.
    pub duration: Option<i64>,
    /// Free-text reason.
    pub reason: Option<String>,
    /// False once expired or removed.
    pub active: bool,
    /// Who last changed the reason.
    pub reason_set_by: Option<String>,
    /// When the reason was last changed.
    pub reason_set_at: Option<i64>,
    /// Who last changed the duration.
    pub duration_set_by: Option<String>,
    /// When the duration was last changed.
    pub duration_set_at: Option<i64>,
    /// When the record went inactive.
    pub removed_at: Option<i64>,
}

impl BanRecord {
    /// Effective expiry timestamp, if the record has a duration.
    pub fn expires_at(&self) -> Option<i64> {
        self.duration.map(|d| self.set_at + d)
    }
}

/// An active record whose expiry time has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueRestriction {
    /// Case-folded channel name.
    pub channel: String,
    /// Ban or quiet.
    pub kind: RestrictionKind,
    /// Mask to remove.
    pub mask: String,
}
