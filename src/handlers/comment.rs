//! The `comment` command: annotate a record with a reason and/or duration.
//!
//! ```text
//! !comment <id|^> [+<duration>] [reason...]
//! ```
//!
//! `^` means the newest active record of the channel the command was sent
//! in. Only the record's setter or a current op in the record's channel may
//! edit it. Every reply is a NOTICE to the requester.

use bantracker_proto::{CaseMapping, Message};
use tracing::{error, info, instrument};

use super::Context;
use crate::db::{BanRecord, Database};
use crate::duration::parse_duration;
use crate::error::{CommandError, HandlerError};
use crate::network::Session;
use crate::state::Tracker;

const COMMAND: &str = "comment";

/// Which record a command refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordRef {
    /// Newest active record in the current channel.
    Last,
    /// Explicit id.
    Id(i64),
}

/// A parsed edit. At least one field is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// New duration in seconds.
    pub duration: Option<i64>,
    /// New reason.
    pub reason: Option<String>,
}

/// Who is asking and where.
#[derive(Debug, Clone)]
pub struct Requester<'a> {
    /// Nickname.
    pub nick: &'a str,
    /// Full source, `nick!user@host` when the server sent one.
    pub source: &'a str,
    /// Channel the command was sent in, `None` for a private message.
    pub channel: Option<&'a str>,
}

/// Strip `<trigger>comment` from a message. `None` if this is not the
/// command; otherwise the argument text.
pub fn strip_command<'a>(text: &'a str, trigger: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(trigger)?;
    let (name, args) = rest.split_once(' ').unwrap_or((rest, ""));
    name.eq_ignore_ascii_case(COMMAND).then_some(args)
}

/// Split arguments into the record reference and the unparsed payload.
pub fn parse_target(args: &str) -> Result<(RecordRef, &str), CommandError> {
    let (token, payload) = args.split_once(' ').unwrap_or((args, ""));
    let target = match token {
        "^" => RecordRef::Last,
        digits if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            RecordRef::Id(digits.parse().map_err(|_| CommandError::InvalidId)?)
        }
        _ => return Err(CommandError::InvalidId),
    };
    Ok((target, payload))
}

/// Parse `[+<duration>] [reason]`.
pub fn parse_edit(payload: &str) -> Result<Edit, CommandError> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Err(CommandError::EmptyPayload);
    }

    let (duration, reason) = match payload.strip_prefix('+') {
        Some(rest) => {
            let (expr, reason) = rest.split_once(' ').unwrap_or((rest, ""));
            let seconds = parse_duration(expr).ok_or(CommandError::InvalidDuration)?;
            (Some(seconds), reason.trim())
        }
        None => (None, payload),
    };

    Ok(Edit {
        duration,
        reason: (!reason.is_empty()).then(|| reason.to_string()),
    })
}

/// Whether `requester` may edit `record`.
///
/// The setter matches on the full `nick!user@host`, or on the nickname when
/// the record only knows a bare nick. Otherwise op in the record's channel
/// is required.
pub fn is_authorized(record: &BanRecord, requester: &Requester<'_>, tracker: &Tracker) -> bool {
    let casemap: CaseMapping = tracker.casemapping();
    let is_setter = if record.set_by.contains('!') {
        casemap.eq(&record.set_by, requester.source)
    } else {
        casemap.eq(&record.set_by, requester.nick)
    };
    is_setter || tracker.has_op(&record.channel, requester.nick)
}

/// Confirmation text, e.g. `Set reason and duration for ban 4 (*!*@host)`.
pub fn confirmation(record: &BanRecord, edit: &Edit) -> String {
    let mut fields = Vec::with_capacity(2);
    if edit.reason.is_some() {
        fields.push("reason");
    }
    if edit.duration.is_some() {
        fields.push("duration");
    }
    format!(
        "Set {} for {} {} ({})",
        fields.join(" and "),
        record.kind,
        record.id,
        record.mask
    )
}

/// Look the record up. `channel_key` is the folded channel the command was
/// sent in.
async fn resolve(
    db: &Database,
    target: RecordRef,
    channel_key: Option<&str>,
) -> Result<BanRecord, CommandError> {
    let bans = db.bans();
    let id = match target {
        RecordRef::Last => {
            let channel = channel_key.ok_or(CommandError::NoLastRecord)?;
            bans.last_active(channel)
                .await?
                .ok_or(CommandError::NoLastRecord)?
        }
        RecordRef::Id(id) => {
            if !bans.exists(id).await? {
                return Err(CommandError::UnknownId(id));
            }
            id
        }
    };
    bans.get(id).await?.ok_or(CommandError::UnknownId(id))
}

/// Run the command. Returns the reply text on success.
pub async fn execute(
    db: &Database,
    session: &Session,
    requester: &Requester<'_>,
    args: &str,
) -> Result<String, CommandError> {
    let (target, payload) = parse_target(args)?;
    let channel_key = requester.channel.map(|c| session.tracker().fold(c));
    let record = resolve(db, target, channel_key.as_deref()).await?;

    if !is_authorized(&record, requester, &session.tracker()) {
        return Err(CommandError::PermissionDenied);
    }

    let edit = parse_edit(payload)?;
    let bans = db.bans();
    if let Some(reason) = &edit.reason {
        bans.set_reason(record.id, requester.source, reason).await?;
    }
    if let Some(duration) = edit.duration {
        bans.set_duration(record.id, requester.source, Some(duration)).await?;
    }

    let expires_at = edit.duration.map(|d| record.set_at + d).or(record.expires_at());
    info!(id = record.id, by = %requester.source, expires_at = ?expires_at, reason = ?edit.reason, "Record edited");
    Ok(confirmation(&record, &edit))
}

/// Handle an inbound `PRIVMSG`.
#[instrument(skip_all, fields(from = msg.source_nickname()))]
pub async fn on_privmsg(ctx: &Context, session: &Session, msg: &Message) -> Result<(), HandlerError> {
    let (Some(prefix), Some(target), Some(text)) = (msg.prefix.as_ref(), msg.param(0), msg.param(1))
    else {
        return Ok(());
    };
    let Some(nick) = prefix.nick() else {
        return Ok(());
    };
    let Some(args) = strip_command(text, &ctx.config.bot.trigger) else {
        return Ok(());
    };

    let source = prefix.to_string();
    let requester = Requester {
        nick,
        source: &source,
        channel: Tracker::is_channel(target).then_some(target),
    };

    let reply = match execute(&ctx.db, session, &requester, args).await {
        Ok(text) => text,
        Err(e) => {
            if e.is_user_error() {
                info!(code = e.error_code(), "Command rejected");
            } else {
                error!(error = ?e, "Command failed");
            }
            e.to_string()
        }
    };
    session.send(Message::notice(nick, &reply))?;
    Ok(())
}
