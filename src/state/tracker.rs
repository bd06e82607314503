//! Live view of our channels, their members and the server's parameters.
//!
//! The reader task applies every inbound message here before anything else
//! sees it, so handlers always observe state that already includes the
//! message they are processing.

use std::collections::HashMap;

use bantracker_proto::{CaseMapping, Message, Prefix, Response, ServerSupport, parse_channel_modes};

use super::channel::{Channel, MemberModes};
use super::user::User;

/// A channel member that holds no status mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Nickname, original case.
    pub nick: String,
    /// `nick!user@host`, if known.
    pub hostmask: Option<String>,
}

/// Connection-scoped IRC state.
#[derive(Debug, Default)]
pub struct Tracker {
    nick: String,
    support: ServerSupport,
    /// Keyed by folded channel name.
    channels: HashMap<String, Channel>,
    /// Keyed by folded nickname.
    users: HashMap<String, User>,
}

impl Tracker {
    /// Fresh state for a new connection.
    pub fn new(nick: &str) -> Self {
        Self {
            nick: nick.to_string(),
            ..Self::default()
        }
    }

    /// Our current nickname.
    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Server parameters seen so far.
    pub fn support(&self) -> &ServerSupport {
        &self.support
    }

    /// Active case-mapping.
    pub fn casemapping(&self) -> CaseMapping {
        self.support.casemapping
    }

    /// Fold a nickname or channel name.
    pub fn fold(&self, name: &str) -> String {
        self.support.casemapping.fold(name)
    }

    /// Whether `nick` is us.
    pub fn is_me(&self, nick: &str) -> bool {
        self.support.casemapping.eq(nick, &self.nick)
    }

    /// Whether `target` names a channel rather than a user.
    pub fn is_channel(target: &str) -> bool {
        target.starts_with(['#', '&', '+', '!'])
    }

    /// Whether we are in `channel`.
    pub fn in_channel(&self, channel: &str) -> bool {
        self.channels.contains_key(&self.fold(channel))
    }

    /// Channel by name.
    pub fn channel(&self, channel: &str) -> Option<&Channel> {
        self.channels.get(&self.fold(channel))
    }

    /// Whether `nick` is in `channel`.
    #[cfg(test)]
    pub fn is_member(&self, channel: &str, nick: &str) -> bool {
        self.channel(channel)
            .is_some_and(|c| c.members.contains_key(&self.fold(nick)))
    }

    /// Treat `mode` as a list mode when reading MODE lines, even if the
    /// server does not advertise it in `CHANMODES`.
    pub fn assume_list_mode(&mut self, mode: char) {
        self.support.assume_list_mode(mode);
    }

    /// Whether `nick` holds op or higher in `channel`.
    pub fn has_op(&self, channel: &str, nick: &str) -> bool {
        self.channel(channel)
            .and_then(|c| c.members.get(&self.fold(nick)))
            .is_some_and(|m| m.has_op_or_higher(&self.support.prefix))
    }

    /// Whether we hold op or higher in `channel`.
    pub fn self_has_op(&self, channel: &str) -> bool {
        self.has_op(channel, &self.nick)
    }

    /// Drop `o` from our own modes in `channel` without waiting for the
    /// server to confirm it.
    pub fn revoke_own_op(&mut self, channel: &str) {
        let (channel_key, me) = (self.fold(channel), self.fold(&self.nick));
        if let Some(modes) = self
            .channels
            .get_mut(&channel_key)
            .and_then(|c| c.members.get_mut(&me))
        {
            modes.revoke('o');
        }
    }

    /// Known `nick!user@host` for a nickname.
    #[cfg(test)]
    pub fn hostmask(&self, nick: &str) -> Option<String> {
        self.users.get(&self.fold(nick)).and_then(User::hostmask)
    }

    /// Members of `channel` without any status, excluding us.
    pub fn unprivileged_members(&self, channel: &str) -> Vec<Candidate> {
        let Some(chan) = self.channel(channel) else {
            return Vec::new();
        };
        let me = self.fold(&self.nick);
        chan.members
            .iter()
            .filter(|(key, modes)| **key != me && modes.is_empty())
            .filter_map(|(key, _)| self.users.get(key))
            .map(|user| Candidate {
                nick: user.nick.clone(),
                hostmask: user.hostmask(),
            })
            .collect()
    }

    /// Apply one inbound message.
    pub fn apply(&mut self, msg: &Message) {
        match msg.command.as_str() {
            "JOIN" => self.on_join(msg),
            "PART" => {
                if let (Some(nick), Some(chan)) = (msg.source_nickname(), msg.param(0)) {
                    self.remove_member(chan, nick);
                }
            }
            "KICK" => {
                if let (Some(chan), Some(target)) = (msg.param(0), msg.param(1)) {
                    self.remove_member(chan, target);
                }
            }
            "QUIT" => {
                if let Some(nick) = msg.source_nickname() {
                    let key = self.fold(nick);
                    for chan in self.channels.values_mut() {
                        chan.members.remove(&key);
                    }
                    self.users.remove(&key);
                }
            }
            "NICK" => self.on_nick(msg),
            "MODE" => self.on_mode(msg),
            _ => self.on_numeric(msg),
        }
    }

    fn on_numeric(&mut self, msg: &Message) {
        match Response::from_command(&msg.command) {
            Some(Response::RPL_WELCOME) => {
                if let Some(nick) = msg.param(0) {
                    self.nick = nick.to_string();
                }
            }
            Some(Response::RPL_ISUPPORT) => self.support.apply_reply(&msg.params),
            Some(Response::RPL_NAMREPLY) => self.on_names(msg),
            Some(Response::RPL_WHOREPLY) => {
                // <me> <chan> <user> <host> <server> <nick> <flags> :<hops> <real>
                if let (Some(user), Some(host), Some(nick)) =
                    (msg.param(2), msg.param(3), msg.param(5))
                    && let Some(known) = self.users.get_mut(&self.support.casemapping.fold(nick))
                {
                    known.user = Some(user.to_string());
                    known.host = Some(host.to_string());
                }
            }
            _ => {}
        }
    }

    fn on_join(&mut self, msg: &Message) {
        let (Some(prefix), Some(chan)) = (msg.prefix.as_ref(), msg.param(0)) else {
            return;
        };
        let Some(nick) = prefix.nick() else {
            return;
        };

        let chan_key = self.fold(chan);
        if self.is_me(nick) {
            // Fresh membership list; NAMES follows.
            self.channels.insert(chan_key.clone(), Channel::new(chan));
        }
        let Some(channel) = self.channels.get_mut(&chan_key) else {
            return;
        };

        let nick_key = self.support.casemapping.fold(nick);
        channel.members.insert(nick_key.clone(), MemberModes::default());
        self.users
            .entry(nick_key)
            .or_insert_with(|| User::new(nick))
            .learn_from(prefix);
    }

    fn on_nick(&mut self, msg: &Message) {
        let (Some(old), Some(new)) = (msg.source_nickname(), msg.param(0)) else {
            return;
        };
        if self.is_me(old) {
            self.nick = new.to_string();
        }

        let old_key = self.fold(old);
        let new_key = self.fold(new);
        for chan in self.channels.values_mut() {
            if let Some(modes) = chan.members.remove(&old_key) {
                chan.members.insert(new_key.clone(), modes);
            }
        }
        if let Some(mut user) = self.users.remove(&old_key) {
            user.nick = new.to_string();
            self.users.insert(new_key, user);
        }
    }

    fn on_mode(&mut self, msg: &Message) {
        let Some(target) = msg.param(0) else {
            return;
        };
        if !Self::is_channel(target) {
            return;
        }
        let chan_key = self.fold(target);
        let changes = parse_channel_modes(&msg.params[1..], &self.support);
        let casemap = self.support.casemapping;
        let Some(channel) = self.channels.get_mut(&chan_key) else {
            return;
        };

        for change in changes {
            if !self.support.prefix.is_status_mode(change.mode) {
                continue;
            }
            let Some(nick) = change.arg else {
                continue;
            };
            if let Some(member) = channel.members.get_mut(&casemap.fold(&nick)) {
                if change.adding {
                    member.grant(change.mode);
                } else {
                    member.revoke(change.mode);
                }
            }
        }
    }

    fn on_names(&mut self, msg: &Message) {
        // <me> <symbol> <chan> :<names>
        let (Some(chan), Some(names)) = (msg.param(2), msg.param(3)) else {
            return;
        };
        let chan_key = self.fold(chan);
        let casemap = self.support.casemapping;
        let Some(channel) = self.channels.get_mut(&chan_key) else {
            return;
        };

        for entry in names.split_whitespace() {
            let split = entry
                .find(|c| self.support.prefix.mode_for_symbol(c).is_none())
                .unwrap_or(entry.len());
            let (symbols, rest) = entry.split_at(split);
            if rest.is_empty() {
                continue;
            }
            let prefix = Prefix::new_from_str(rest);
            let Some(nick) = prefix.nick() else {
                continue;
            };
            let key = casemap.fold(nick);
            channel.members.insert(
                key.clone(),
                MemberModes::from_symbols(symbols, &self.support.prefix),
            );
            self.users
                .entry(key)
                .or_insert_with(|| User::new(nick))
                .learn_from(&prefix);
        }
    }

    fn remove_member(&mut self, chan: &str, nick: &str) {
        let chan_key = self.fold(chan);
        if self.is_me(nick) {
            self.channels.remove(&chan_key);
        } else if let Some(channel) = self.channels.get_mut(&chan_key) {
            channel.members.remove(&self.support.casemapping.fold(nick));
        }
        self.prune_users();
    }

    /// Forget users we no longer share a channel with.
    fn prune_users(&mut self) {
        let channels = &self.channels;
        let me = self.support.casemapping.fold(&self.nick);
        self.users.retain(|key, _| {
            *key == me || channels.values().any(|c| c.members.contains_key(key))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(tracker: &mut Tracker, lines: &[&str]) {
        for line in lines {
            tracker.apply(&line.parse().unwrap());
        }
    }

    fn joined() -> Tracker {
        let mut tracker = Tracker::new("bot");
        feed(
            &mut tracker,
            &[
                ":srv 001 bot :Welcome",
                ":srv 005 bot PREFIX=(qaohv)~&@%+ CHANMODES=beIq,k,l,imnpst :are supported",
                ":bot!b@bot.host JOIN #Chan",
                ":srv 353 bot = #chan :bot @Op!o@op.host +Voiced alice!a@alice.host",
                ":srv 366 bot #chan :End of /NAMES list.",
            ],
        );
        tracker
    }

    #[test]
    fn names_populates_members() {
        let tracker = joined();
        assert!(tracker.in_channel("#CHAN"));
        assert!(tracker.has_op("#chan", "op"));
        assert!(!tracker.has_op("#chan", "voiced"));
        assert_eq!(tracker.hostmask("alice").as_deref(), Some("alice!a@alice.host"));
        assert_eq!(tracker.hostmask("Voiced"), None);
    }

    #[test]
    fn unprivileged_excludes_status_and_self() {
        let tracker = joined();
        let members = tracker.unprivileged_members("#chan");
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].nick, "alice");
    }

    #[test]
    fn who_reply_fills_hosts() {
        let mut tracker = joined();
        feed(
            &mut tracker,
            &[":srv 352 bot #chan vuser voiced.host srv Voiced H+ :0 Real Name"],
        );
        assert_eq!(
            tracker.hostmask("voiced").as_deref(),
            Some("Voiced!vuser@voiced.host")
        );
    }

    #[test]
    fn mode_changes_status() {
        let mut tracker = joined();
        feed(&mut tracker, &[":Op!o@op.host MODE #chan +ob bot *!*@x"]);
        assert!(tracker.self_has_op("#chan"));
        feed(&mut tracker, &[":Op!o@op.host MODE #chan -o+a bot bot"]);
        assert!(tracker.self_has_op("#chan"));
        feed(&mut tracker, &[":Op!o@op.host MODE #chan -a bot"]);
        assert!(!tracker.self_has_op("#chan"));
    }

    #[test]
    fn part_kick_quit_remove_members() {
        let mut tracker = joined();
        feed(&mut tracker, &[":alice!a@alice.host PART #chan :bye"]);
        assert!(!tracker.is_member("#chan", "alice"));
        assert_eq!(tracker.hostmask("alice"), None);

        feed(&mut tracker, &[":Op!o@op.host KICK #chan Voiced :out"]);
        assert!(!tracker.is_member("#chan", "voiced"));

        feed(&mut tracker, &[":Op!o@op.host QUIT :gone"]);
        assert!(!tracker.is_member("#chan", "op"));
    }

    #[test]
    fn self_kick_drops_channel() {
        let mut tracker = joined();
        feed(&mut tracker, &[":Op!o@op.host KICK #chan bot :out"]);
        assert!(!tracker.in_channel("#chan"));
        assert_eq!(tracker.hostmask("alice"), None);
    }

    #[test]
    fn nick_change_moves_member() {
        let mut tracker = joined();
        feed(&mut tracker, &[":alice!a@alice.host NICK alicia"]);
        assert!(tracker.is_member("#chan", "ALICIA"));
        assert!(!tracker.is_member("#chan", "alice"));
        assert_eq!(tracker.hostmask("alicia").as_deref(), Some("alicia!a@alice.host"));

        feed(&mut tracker, &[":bot!b@bot.host NICK bot2"]);
        assert_eq!(tracker.nick(), "bot2");
        assert!(tracker.is_me("BOT2"));
    }

    #[test]
    fn join_of_other_user_learns_host() {
        let mut tracker = joined();
        feed(&mut tracker, &[":eve!e@evil.example JOIN #chan"]);
        assert_eq!(tracker.hostmask("eve").as_deref(), Some("eve!e@evil.example"));
        assert_eq!(tracker.unprivileged_members("#chan").len(), 2);
    }

    #[test]
    fn assumed_quiet_letter_keeps_status_attribution() {
        let mut tracker = Tracker::new("bot");
        tracker.assume_list_mode('q');
        feed(
            &mut tracker,
            &[
                ":srv 001 bot :Welcome",
                ":srv 005 bot CHANMODES=beI,k,l,imnpst :are supported",
                ":bot!b@bot.host JOIN #chan",
                ":srv 353 bot = #chan :bot alice!a@alice.host",
                ":Op!o@op.host MODE #chan +qo $a:troll alice",
            ],
        );
        assert!(tracker.has_op("#chan", "alice"));
    }

    #[test]
    fn casemapping_from_isupport() {
        let mut tracker = Tracker::new("bot");
        assert!(tracker.is_me("BOT"));
        feed(&mut tracker, &[":srv 005 bot CASEMAPPING=ascii :are supported"]);
        assert_eq!(tracker.fold("#A[b]"), "#a[b]");
    }
}
