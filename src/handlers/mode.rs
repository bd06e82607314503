//! Live ban/quiet changes.
//!
//! Every watched `(sign, mask)` pair first expires whatever active record
//! exists for that mask, then a `+` opens a fresh record. Applying the same
//! `+b` twice therefore leaves exactly one active record, and the echo of
//! our own expiry `-b` is what marks a record inactive.

use std::sync::Arc;

use bantracker_proto::{Message, ModeChange, Prefix, parse_channel_modes};
use tracing::{debug, info};

use super::context::{Context, WatchedModes};
use super::enforce;
use crate::db::{Database, DbError, RestrictionKind};
use crate::error::HandlerError;
use crate::network::Session;
use crate::state::Tracker;

/// Records opened by one MODE line.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Applied {
    /// `(kind, id)` for every record added, in mode order.
    pub added: Vec<(RestrictionKind, i64)>,
    /// Masks of newly added bans (not quiets), for enforcement.
    pub new_bans: Vec<String>,
}

/// Apply parsed mode changes to the store.
pub async fn apply_changes(
    db: &Database,
    watched: WatchedModes,
    channel_key: &str,
    changes: &[ModeChange],
    actor: &str,
    now: i64,
) -> Result<Applied, DbError> {
    let bans = db.bans();
    let mut applied = Applied::default();

    for change in changes {
        let Some(kind) = watched.kind_for(change.mode) else {
            continue;
        };
        // `MODE #chan +b` with no mask is a list query.
        let Some(mask) = change.arg.as_deref() else {
            continue;
        };

        bans.set_expired(channel_key, kind, mask).await?;
        if change.adding {
            let id = bans.add(channel_key, kind, mask, actor, now).await?;
            debug!(channel = %channel_key, kind = %kind, mask = %mask, id, "Tracking");
            applied.added.push((kind, id));
            if kind == RestrictionKind::Ban {
                applied.new_bans.push(mask.to_string());
            }
        } else {
            debug!(channel = %channel_key, kind = %kind, mask = %mask, "Removed");
        }
    }

    Ok(applied)
}

/// Handle an inbound `MODE`.
pub async fn on_mode(ctx: &Arc<Context>, session: &Session, msg: &Message) -> Result<(), HandlerError> {
    let Some(target) = msg.param(0) else {
        return Ok(());
    };
    if !Tracker::is_channel(target) {
        return Ok(());
    }

    let (channel_key, changes, from_me) = {
        let tracker = session.tracker();
        if !tracker.in_channel(target) {
            return Ok(());
        }
        let from_me = msg.source_nickname().is_some_and(|n| tracker.is_me(n));
        (
            tracker.fold(target),
            parse_channel_modes(&msg.params[1..], tracker.support()),
            from_me,
        )
    };

    let actor = msg
        .prefix
        .as_ref()
        .map(Prefix::to_string)
        .unwrap_or_else(|| "*".to_string());
    let now = chrono::Utc::now().timestamp();

    let applied = apply_changes(&ctx.db, ctx.watched(), &channel_key, &changes, &actor, now).await?;
    for (kind, id) in &applied.added {
        info!(channel = %channel_key, kind = %kind, id, set_by = %actor, "Restriction added");
    }

    // Server-set modes and our own changes get no notice.
    if !from_me && let Some(setter) = msg.source_nickname() {
        for (kind, id) in &applied.added {
            let text = format!("{} {} added for {}", kind.title(), id, target);
            session.send(Message::notice(setter, &text))?;
        }
    }

    if ctx.config.bot.enforce && !applied.new_bans.is_empty() {
        enforce::spawn_batch(Arc::clone(ctx), session.clone(), target.to_string(), applied.new_bans);
    }

    Ok(())
}
