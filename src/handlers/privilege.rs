//! Transient channel-operator privilege.
//!
//! Kicking and removing list modes need op. When the bot lacks it and
//! `bot.chanserv` is set, it asks services (`OP #chan`) and waits for the
//! matching `MODE +o`. Op obtained this way is handed back afterwards; op
//! the bot already held is never touched.
//!
//! Batches that need op for the same channel take that channel's lock first,
//! so one batch cannot drop op while another still relies on it. Handing op
//! back clears it in the tracker before the lock is released, so the next
//! batch asks again instead of trusting a grant that is already gone.

use std::sync::Arc;

use bantracker_proto::Message;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use super::Context;
use crate::error::SessionError;
use crate::network::Session;

/// Per-channel async locks, keyed by folded channel name.
#[derive(Default)]
pub struct PrivilegeLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PrivilegeLocks {
    /// The lock for `channel_key`, created on first use.
    pub fn lock_for(&self, channel_key: &str) -> Arc<Mutex<()>> {
        Arc::clone(
            self.locks
                .entry(channel_key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }
}

/// How the bot came to hold op for a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    /// Already op before the batch started.
    Held,
    /// Requested from services for this batch; must be released.
    Acquired,
    /// Not op and not allowed to ask.
    Unavailable,
}

impl Privilege {
    /// Whether the batch can go ahead.
    pub fn is_usable(self) -> bool {
        !matches!(self, Privilege::Unavailable)
    }
}

/// Make sure we hold op in `channel`, asking services if allowed.
///
/// Errors with [`SessionError::Timeout`] when services do not answer within
/// `bot.privilege_timeout_secs`.
pub async fn acquire(
    ctx: &Context,
    session: &Session,
    channel: &str,
) -> Result<Privilege, SessionError> {
    let casemap = {
        let tracker = session.tracker();
        if tracker.self_has_op(channel) {
            return Ok(Privilege::Held);
        }
        tracker.casemapping()
    };
    if !ctx.config.bot.chanserv {
        return Ok(Privilege::Unavailable);
    }

    let target = channel.to_string();
    let mut grants = session.expect(move |m| {
        m.command == "MODE" && m.param(0).is_some_and(|t| casemap.eq(t, &target))
    });

    let services = &ctx.config.bot.services_nick;
    debug!(channel = %channel, services = %services, "Requesting op");
    session.send(Message::privmsg(services, &format!("OP {channel}")))?;

    // The tracker has already applied each MODE by the time we see it.
    let deadline = Instant::now() + ctx.config.bot.privilege_timeout();
    loop {
        grants.next_before(deadline).await?;
        if session.tracker().self_has_op(channel) {
            info!(channel = %channel, "Op acquired");
            return Ok(Privilege::Acquired);
        }
    }
}

/// The `-o <me>` entry to append to the last batch, if op was acquired
/// for it.
pub fn release_entry(privilege: Privilege, session: &Session) -> Option<(char, String)> {
    (privilege == Privilege::Acquired).then(|| ('o', session.tracker().nick().to_string()))
}

/// Mark op acquired for this batch as gone, once its `-o` has been sent.
pub fn released(privilege: Privilege, session: &Session, channel: &str) {
    if privilege == Privilege::Acquired {
        session.forget_own_op(channel);
    }
}

/// Drop op if it was acquired for this batch.
pub fn release(privilege: Privilege, session: &Session, channel: &str) -> Result<(), SessionError> {
    if let Some((letter, nick)) = release_entry(privilege, session) {
        session.send(Message::mode(channel, &format!("-{letter}"), &[nick]))?;
        released(privilege, session, channel);
    }
    Ok(())
}
