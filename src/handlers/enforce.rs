//! Removing members that match a newly set ban.
//!
//! Only members holding no status mode at all are candidates; voiced users,
//! ops and the bot itself are never kicked. A batch runs in its own task so
//! waiting for op never holds up the dispatcher.

use std::sync::Arc;

use bantracker_proto::{Glob, Message};
use tracing::{info, instrument, warn};

use super::Context;
use super::privilege::{self, Privilege};
use crate::error::HandlerError;
use crate::network::Session;
use crate::state::Tracker;

/// Reason attached to every enforcement KICK.
pub const KICK_REASON: &str = "User is banned from this channel";

/// Nicknames of unprivileged members of `channel` matched by any of `masks`.
///
/// Members whose user and host are still unknown are skipped.
pub fn matching_members(tracker: &Tracker, channel: &str, masks: &[String]) -> Vec<String> {
    let casemap = tracker.casemapping();
    let globs: Vec<Glob> = masks.iter().map(|m| Glob::compile(m, casemap)).collect();

    let mut affected: Vec<String> = tracker
        .unprivileged_members(channel)
        .into_iter()
        .filter(|member| {
            member
                .hostmask
                .as_deref()
                .is_some_and(|hostmask| globs.iter().any(|g| g.matches(hostmask)))
        })
        .map(|member| member.nick)
        .collect();
    affected.sort();
    affected
}

/// Run an enforcement batch in the background.
pub fn spawn_batch(ctx: Arc<Context>, session: Session, channel: String, masks: Vec<String>) {
    tokio::spawn(async move {
        if let Err(e) = run_batch(&ctx, &session, &channel, &masks).await {
            warn!(channel = %channel, error = %e, code = e.error_code(), "Enforcement batch abandoned");
        }
    });
}

#[instrument(skip(ctx, session, masks), fields(masks = masks.len()))]
async fn run_batch(
    ctx: &Context,
    session: &Session,
    channel: &str,
    masks: &[String],
) -> Result<(), HandlerError> {
    let (channel_key, targets) = {
        let tracker = session.tracker();
        (tracker.fold(channel), matching_members(&tracker, channel, masks))
    };
    if targets.is_empty() {
        return Ok(());
    }

    let lock = ctx.privilege.lock_for(&channel_key);
    let _guard = lock.lock().await;

    let privilege = privilege::acquire(ctx, session, channel).await?;
    if !privilege.is_usable() {
        warn!(targets = targets.len(), "Not op and not allowed to ask, skipping kicks");
        return Ok(());
    }

    // Anyone who left, changed nick or gained status while we waited is spared.
    let still_matching = matching_members(&session.tracker(), channel, masks);
    let kicks: Vec<&String> = targets.iter().filter(|n| still_matching.contains(n)).collect();

    for nick in &kicks {
        session.send(Message::kick(channel, nick, KICK_REASON))?;
    }
    if !kicks.is_empty() {
        info!(kicked = kicks.len(), "Enforced ban");
    }

    privilege::release(privilege, session, channel)?;
    if privilege == Privilege::Acquired {
        info!("Op released");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::{context, next_sent};

    fn tracker(lines: &[&str]) -> Tracker {
        let mut tracker = Tracker::new("bot");
        for line in lines {
            tracker.apply(&line.parse().unwrap());
        }
        tracker
    }

    fn chan() -> Tracker {
        tracker(&[
            ":srv 001 bot :hi",
            ":bot!b@bot.example.com JOIN #chan",
            ":srv 353 bot = #chan :bot @op!o@op.example.com +voiced!v@spam.example.com spammer!s@spam.EXAMPLE.com clean!c@example.org",
            ":srv 366 bot #chan :End",
        ])
    }

    #[test]
    fn matches_case_folded_host() {
        let affected = matching_members(&chan(), "#chan", &["*!*@*.example.com".to_string()]);
        assert_eq!(affected, vec!["spammer".to_string()]);
    }

    #[test]
    fn status_holders_and_self_are_exempt() {
        let affected = matching_members(&chan(), "#chan", &["*!*@*".to_string()]);
        assert_eq!(affected, vec!["clean".to_string(), "spammer".to_string()]);
    }

    #[test]
    fn union_across_masks() {
        let affected = matching_members(
            &chan(),
            "#chan",
            &["clean!*@*".to_string(), "*!s@*".to_string()],
        );
        assert_eq!(affected.len(), 2);
    }

    #[test]
    fn unknown_hosts_are_skipped() {
        let mut t = chan();
        t.apply(&":srv 353 bot = #chan :mystery".parse().unwrap());
        let affected = matching_members(&t, "#chan", &["*!*@*".to_string()]);
        assert!(!affected.contains(&"mystery".to_string()));
    }

    #[test]
    fn not_in_channel_matches_nothing() {
        assert!(matching_members(&chan(), "#elsewhere", &["*".to_string()]).is_empty());
    }

    #[tokio::test]
    async fn back_to_back_batches_each_ask_for_op() {
        let ctx = context("chanserv = true", "").await;
        let (session, mut rx) = Session::detached(chan());
        let masks = vec!["*!*@*.example.com".to_string()];

        spawn_batch(Arc::clone(&ctx), session.clone(), "#chan".to_string(), masks.clone());
        spawn_batch(Arc::clone(&ctx), session.clone(), "#chan".to_string(), masks);

        // The second batch must not kick on the strength of the first
        // batch's grant after that batch has sent `-o`.
        for _ in 0..2 {
            let ask = next_sent(&mut rx).await;
            assert_eq!(ask.command, "PRIVMSG");
            assert_eq!(ask.params, ["ChanServ", "OP #chan"]);

            session.deliver(":ChanServ!cs@services. MODE #chan +o bot");
            let kick = next_sent(&mut rx).await;
            assert_eq!(kick.params, ["#chan", "spammer", KICK_REASON]);
            let deop = next_sent(&mut rx).await;
            assert_eq!(deop.params, ["#chan", "-o", "bot"]);
            assert!(!session.tracker().self_has_op("#chan"));
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn op_already_held_is_kept() {
        let ctx = context("chanserv = true", "").await;
        let mut tracker = chan();
        tracker.apply(&":ChanServ!cs@services. MODE #chan +o bot".parse().unwrap());
        let (session, mut rx) = Session::detached(tracker);

        run_batch(&ctx, &session, "#chan", &["spammer!*@*".to_string()]).await.unwrap();
        assert_eq!(next_sent(&mut rx).await.command, "KICK");
        assert!(rx.try_recv().is_err());
        assert!(session.tracker().self_has_op("#chan"));
    }

    #[tokio::test]
    async fn no_op_and_no_services_kicks_nobody() {
        let ctx = context("", "").await;
        let (session, mut rx) = Session::detached(chan());

        run_batch(&ctx, &session, "#chan", &["spammer!*@*".to_string()]).await.unwrap();
        assert!(rx.try_recv().is_err());
    }
}
