//! Converging the store with a channel's live ban/quiet lists.
//!
//! Runs when the bot itself joins a channel. Bans and quiets may have been
//! added or removed while the bot was away; after a successful pass the
//! store's active set for the channel equals the server's lists exactly.
//! Nothing is written unless every list arrived complete.

use std::collections::HashSet;
use std::sync::Arc;

use bantracker_proto::{Message, Response};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use super::Context;
use crate::db::{Database, DbError, RestrictionKind};
use crate::error::{HandlerError, SessionError};
use crate::network::Session;

/// Setter recorded when the server does not report one.
const UNKNOWN_SETTER: &str = "*";

/// One entry of a live ban or quiet list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    /// The mask.
    pub mask: String,
    /// Who set it, `*` if unknown.
    pub set_by: String,
    /// When it was set.
    pub set_at: i64,
}

/// What a reconciliation pass changed.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Convergence {
    /// Ids opened for entries only the server knew about.
    pub added: Vec<i64>,
    /// Masks expired because the server no longer has them.
    pub expired: Vec<String>,
}

#[derive(Debug, Error)]
enum ListError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("server refused the list query ({0})")]
    Refused(String),
}

/// Numerics that carry list entries and end a list.
fn list_numerics(kind: RestrictionKind) -> (Response, Response) {
    match kind {
        RestrictionKind::Ban => (Response::RPL_BANLIST, Response::RPL_ENDOFBANLIST),
        RestrictionKind::Quiet => (Response::RPL_QUIETLIST, Response::RPL_ENDOFQUIETLIST),
    }
}

/// Parse an entry reply.
///
/// `367 <me> <chan> <mask> [<setter> <time>]` and
/// `728 <me> <chan> <letter> <mask> [<setter> <time>]`.
pub fn parse_entry(msg: &Message, kind: RestrictionKind, now: i64) -> Option<ListEntry> {
    let offset = match kind {
        RestrictionKind::Ban => 2,
        RestrictionKind::Quiet => 3,
    };
    let mask = msg.param(offset)?;
    let set_by = msg
        .param(offset + 1)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_SETTER);
    let set_at = msg
        .param(offset + 2)
        .and_then(|t| t.parse().ok())
        .unwrap_or(now);

    Some(ListEntry {
        mask: mask.to_string(),
        set_by: set_by.to_string(),
        set_at,
    })
}

/// Converge the active records of one kind with a complete live list.
pub async fn converge(
    db: &Database,
    channel_key: &str,
    kind: RestrictionKind,
    live: &[ListEntry],
) -> Result<Convergence, DbError> {
    let bans = db.bans();
    let local = bans.active_masks(channel_key, kind).await?;
    let live_masks: HashSet<&str> = live.iter().map(|e| e.mask.as_str()).collect();

    let mut result = Convergence::default();

    // Removed while we were away.
    let mut stale: Vec<&String> = local.iter().filter(|m| !live_masks.contains(m.as_str())).collect();
    stale.sort();
    for mask in stale {
        if bans.set_expired(channel_key, kind, mask).await? {
            result.expired.push(mask.clone());
        }
    }

    // Added while we were away. Servers occasionally repeat an entry.
    let mut seen = HashSet::new();
    for entry in live {
        if local.contains(&entry.mask) || !seen.insert(entry.mask.as_str()) {
            continue;
        }
        let id = bans
            .add(channel_key, kind, &entry.mask, &entry.set_by, entry.set_at)
            .await?;
        result.added.push(id);
    }

    Ok(result)
}

/// Fetch one complete list. The expectation is registered before the query
/// goes out so no page can be missed.
async fn fetch_list(
    session: &Session,
    channel: &str,
    kind: RestrictionKind,
    letter: char,
    deadline: Instant,
) -> Result<Vec<ListEntry>, ListError> {
    let (entry_code, end_code) = list_numerics(kind);
    let casemap = session.tracker().casemapping();
    let target = channel.to_string();

    let mut replies = session.expect(move |m| {
        let relevant = matches!(
            Response::from_command(&m.command),
            Some(code) if code == entry_code
                || code == end_code
                || code == Response::ERR_CHANOPRIVSNEEDED
                || code == Response::ERR_NOTONCHANNEL
                || code == Response::ERR_NOSUCHCHANNEL
        );
        relevant && m.param(1).is_some_and(|c| casemap.eq(c, &target))
    });
    session.send(Message::mode(channel, &letter.to_string(), &[]))?;

    let mut entries = Vec::new();
    loop {
        let msg = replies.next_before(deadline).await?;
        let now = chrono::Utc::now().timestamp();
        match Response::from_command(&msg.command) {
            Some(code) if code == entry_code => entries.extend(parse_entry(&msg, kind, now)),
            Some(code) if code == end_code => return Ok(entries),
            _ => return Err(ListError::Refused(msg.command)),
        }
    }
}

/// Handle our own JOIN to `channel`.
#[instrument(skip(ctx, session))]
pub async fn on_self_join(ctx: &Arc<Context>, session: &Session, channel: &str) -> Result<(), HandlerError> {
    // Hosts for enforcement; NAMES alone may lack them.
    session.send(Message::new("WHO", [channel]))?;

    let channel_key = session.tracker().fold(channel);
    let deadline = Instant::now() + ctx.config.bot.list_timeout();

    let mut lists = Vec::new();
    for (kind, letter) in ctx.watched().letters() {
        match fetch_list(session, channel, kind, letter, deadline).await {
            Ok(entries) => lists.push((kind, entries)),
            Err(e) => {
                warn!(kind = %kind, error = %e, "Abandoning reconciliation");
                return Ok(());
            }
        }
    }

    for (kind, entries) in lists {
        let outcome = converge(&ctx.db, &channel_key, kind, &entries).await?;
        info!(
            kind = %kind,
            live = entries.len(),
            added = outcome.added.len(),
            expired = outcome.expired.len(),
            "Reconciled"
        );
    }
    Ok(())
}
