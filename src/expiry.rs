//! Expiry scheduler background task.
//!
//! Wakes at every wall-clock minute boundary, finds active records whose
//! duration has run out and removes them from their channels with batched
//! `MODE -bbq...` lines. The store is normally updated by the echoed MODE
//! (see [`crate::handlers::mode`]); `expiry.mark_on_send` marks records
//! itself for servers that do not echo.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bantracker_proto::{Message, chunk_mode_lines};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::db::{DbError, DueRestriction};
use crate::error::HandlerError;
use crate::handlers::privilege::{self, Privilege};
use crate::handlers::{Context, WatchedModes};
use crate::network::Session;

/// Spawn the expiry background task.
pub fn spawn_expiry_task(ctx: Arc<Context>) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(until_next_minute(Utc::now())).await;
            if let Err(e) = sweep(&ctx).await {
                error!(error = %e, "Expiry sweep failed");
            }
        }
    });
}

/// Time left until the next minute boundary; a full minute when `now` is
/// exactly on one.
pub fn until_next_minute(now: DateTime<Utc>) -> Duration {
    let into_minute_ms =
        now.timestamp().rem_euclid(60) as u64 * 1_000 + u64::from(now.timestamp_subsec_millis().min(999));
    Duration::from_millis(60_000 - into_minute_ms)
}

/// Group due records by channel, dropping kinds that are not tracked.
pub fn group_by_channel(
    due: Vec<DueRestriction>,
    watched: WatchedModes,
) -> BTreeMap<String, Vec<(char, String)>> {
    let mut grouped: BTreeMap<String, Vec<(char, String)>> = BTreeMap::new();
    for record in due {
        let Some(letter) = watched.letter_for(record.kind) else {
            continue;
        };
        grouped
            .entry(record.channel)
            .or_default()
            .push((letter, record.mask));
    }
    grouped
}

async fn sweep(ctx: &Arc<Context>) -> Result<(), DbError> {
    let Some(session) = ctx.session().filter(Session::is_connected) else {
        debug!("Not connected, skipping expiry sweep");
        return Ok(());
    };

    let due = ctx.db.bans().due_before(Utc::now().timestamp()).await?;
    if due.is_empty() {
        return Ok(());
    }

    for (channel_key, removals) in group_by_channel(due, ctx.watched()) {
        if !session.tracker().in_channel(&channel_key) {
            debug!(channel = %channel_key, count = removals.len(), "Not in channel, leaving expired records");
            continue;
        }
        let ctx = Arc::clone(ctx);
        let session = session.clone();
        tokio::spawn(async move {
            if let Err(e) = remove_batch(&ctx, &session, &channel_key, &removals).await {
                warn!(channel = %channel_key, error = %e, code = e.error_code(), "Expiry batch abandoned");
            }
        });
    }
    Ok(())
}

async fn remove_batch(
    ctx: &Context,
    session: &Session,
    channel_key: &str,
    removals: &[(char, String)],
) -> Result<(), HandlerError> {
    let lock = ctx.privilege.lock_for(channel_key);
    let _guard = lock.lock().await;

    let privilege = privilege::acquire(ctx, session, channel_key).await?;
    if !privilege.is_usable() {
        warn!(channel = %channel_key, count = removals.len(), "Not op and not allowed to ask, expiry postponed");
        return Ok(());
    }

    let (channel, per_line) = {
        let tracker = session.tracker();
        let Some(channel) = tracker.channel(channel_key) else {
            return Ok(());
        };
        (channel.name.clone(), tracker.support().modes_per_line())
    };

    let mut entries = removals.to_vec();
    entries.extend(privilege::release_entry(privilege, session));
    for (modes, args) in chunk_mode_lines('-', &entries, per_line) {
        session.send(Message::mode(&channel, &modes, &args))?;
    }
    privilege::released(privilege, session, channel_key);
    info!(
        channel = %channel,
        count = removals.len(),
        released_op = privilege == Privilege::Acquired,
        "Removed expired restrictions"
    );

    if ctx.config.expiry.mark_on_send {
        let watched = ctx.watched();
        let bans = ctx.db.bans();
        for (letter, mask) in removals {
            if let Some(kind) = watched.kind_for(*letter) {
                bans.set_expired(channel_key, kind, mask).await?;
            }
        }
    }
    Ok(())
}
