//! IRC message type, parser and serializer.
//!
//! A line has the shape `[@tags ][:prefix ]COMMAND[ params...][ :trailing]`.
//! Tags are kept as raw `key[=value]` pairs; nothing in the bot reads their
//! values beyond presence.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{take_until, take_while1},
    character::complete::{char, space0, space1},
    combinator::{cut, eof, opt, peek, rest, verify},
    multi::many0,
    sequence::{pair, preceded, terminated},
    IResult,
};

use crate::error::{MessageParseError, ProtocolError};
use crate::prefix::Prefix;

type Res<'a, T> = IResult<&'a str, T>;

/// A single IRC protocol message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// IRCv3 message tags, unparsed values.
    pub tags: Vec<(String, Option<String>)>,
    /// Source of the message, absent for client-originated lines.
    pub prefix: Option<Prefix>,
    /// Command verb (uppercased) or three-digit numeric.
    pub command: String,
    /// Parameters, trailing one included as the last element.
    pub params: Vec<String>,
}

impl Message {
    /// Build a client message with no prefix.
    pub fn new<C, I, P>(command: C, params: I) -> Self
    where
        C: Into<String>,
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            tags: Vec::new(),
            prefix: None,
            command: command.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Attach a prefix. Mainly used by tests and the fake server.
    pub fn with_prefix(mut self, prefix: impl Into<Prefix>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// `PRIVMSG <target> :<text>`
    pub fn privmsg(target: &str, text: &str) -> Self {
        Self::new("PRIVMSG", [target, text])
    }

    /// `NOTICE <target> :<text>`
    pub fn notice(target: &str, text: &str) -> Self {
        Self::new("NOTICE", [target, text])
    }

    /// `JOIN <chan>[,<chan>...]`
    pub fn join<S: AsRef<str>>(channels: &[S]) -> Self {
        let list: Vec<&str> = channels.iter().map(AsRef::as_ref).collect();
        Self::new("JOIN", [list.join(",")])
    }

    /// `KICK <chan> <nick> :<reason>`
    pub fn kick(channel: &str, nick: &str, reason: &str) -> Self {
        Self::new("KICK", [channel, nick, reason])
    }

    /// `MODE <target> <modestring> [args...]`
    pub fn mode(target: &str, modes: &str, args: &[String]) -> Self {
        let mut params = vec![target.to_string(), modes.to_string()];
        params.extend(args.iter().cloned());
        Self::new("MODE", params)
    }

    /// `PONG :<token>`
    pub fn pong(token: &str) -> Self {
        Self::new("PONG", [token])
    }

    /// `NICK <nick>`
    pub fn nick(nick: &str) -> Self {
        Self::new("NICK", [nick])
    }

    /// `USER <user> 0 * :<realname>`
    pub fn user(username: &str, realname: &str) -> Self {
        Self::new("USER", [username, "0", "*", realname])
    }

    /// `PASS <password>`
    pub fn pass(password: &str) -> Self {
        Self::new("PASS", [password])
    }

    /// The source nickname, if the message came from a user.
    pub fn source_nickname(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nick)
    }

    /// Parameter at `idx`.
    pub fn param(&self, idx: usize) -> Option<&str> {
        self.params.get(idx).map(String::as_str)
    }

    /// True for three-digit numeric replies.
    pub fn is_numeric(&self) -> bool {
        self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit())
    }
}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Message, Self::Err> {
        parse_line(s).map_err(|cause| ProtocolError::InvalidMessage {
            string: s.to_owned(),
            cause,
        })
    }
}

/// Raw tag section: `@` up to the separating space.
fn tags(input: &str) -> Res<'_, &str> {
    preceded(char('@'), cut(terminated(take_until(" "), space1)))(input)
}

/// Raw prefix: `:` up to the separating space.
fn prefix(input: &str) -> Res<'_, &str> {
    preceded(char(':'), cut(terminated(take_while1(|c: char| c != ' '), space1)))(input)
}

/// Command verb or numeric, which must end at a space or the end of line.
fn command(input: &str) -> Res<'_, &str> {
    terminated(
        take_while1(|c: char| c.is_ascii_alphanumeric()),
        peek(alt((space1, eof))),
    )(input)
}

/// A middle parameter: anything up to a space that does not start with `:`.
fn middle(input: &str) -> Res<'_, &str> {
    preceded(
        space1,
        verify(take_while1(|c: char| c != ' '), |p: &str| !p.starts_with(':')),
    )(input)
}

/// The trailing parameter: everything after ` :`, spaces included.
fn trailing(input: &str) -> Res<'_, &str> {
    preceded(pair(space1, char(':')), rest)(input)
}

fn params(input: &str) -> Res<'_, Vec<&str>> {
    let (input, mut params) = many0(middle)(input)?;
    let (input, last) = opt(trailing)(input)?;
    params.extend(last);
    let (input, _) = terminated(space0, eof)(input)?;
    Ok((input, params))
}

fn split_tags(raw: &str) -> Vec<(String, Option<String>)> {
    raw.split(';')
        .filter(|t| !t.is_empty())
        .map(|t| match t.split_once('=') {
            Some((k, v)) => (k.to_string(), Some(v.to_string())),
            None => (t.to_string(), None),
        })
        .collect()
}

fn parse_line(line: &str) -> Result<Message, MessageParseError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (input, _) = space0::<_, nom::error::Error<&str>>(line)
        .map_err(|_| MessageParseError::EmptyMessage)?;
    if input.is_empty() {
        return Err(MessageParseError::EmptyMessage);
    }

    let (input, raw_tags) = opt(tags)(input).map_err(|_| MessageParseError::DanglingTags)?;
    let (input, raw_prefix) = opt(prefix)(input).map_err(|_| MessageParseError::MissingCommand)?;
    if input.is_empty() {
        return Err(MessageParseError::MissingCommand);
    }

    let (input, verb) = command(input).map_err(|_| {
        let token = input.split(' ').next().unwrap_or(input);
        MessageParseError::InvalidCommand(token.to_string())
    })?;
    let (_, params) = params(input).map_err(|_| MessageParseError::MissingCommand)?;

    Ok(Message {
        tags: raw_tags.map(split_tags).unwrap_or_default(),
        prefix: raw_prefix.map(Prefix::new_from_str),
        command: verb.to_ascii_uppercase(),
        params: params.into_iter().map(str::to_string).collect(),
    })
}

impl Display for Message {
    /// Serializes without the line terminator; the codec appends `\r\n`.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if !self.tags.is_empty() {
            f.write_str("@")?;
            for (i, (key, value)) in self.tags.iter().enumerate() {
                if i > 0 {
                    f.write_str(";")?;
                }
                f.write_str(key)?;
                if let Some(value) = value {
                    write!(f, "={value}")?;
                }
            }
            f.write_str(" ")?;
        }

        if let Some(ref prefix) = self.prefix {
            write!(f, ":{prefix} ")?;
        }

        f.write_str(&self.command)?;

        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            let needs_colon =
                i == last && (param.is_empty() || param.contains(' ') || param.starts_with(':'));
            if needs_colon {
                write!(f, " :{param}")?;
            } else {
                write!(f, " {param}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mode_with_prefix() {
        let msg: Message = ":op!o@host MODE #chan +bq *!*@bad.host $a:spammer"
            .parse()
            .unwrap();
        assert_eq!(msg.source_nickname(), Some("op"));
        assert_eq!(msg.command, "MODE");
        assert_eq!(msg.params, ["#chan", "+bq", "*!*@bad.host", "$a:spammer"]);
    }

    #[test]
    fn parses_trailing_and_tags() {
        let msg: Message = "@time=2024-01-01T00:00:00Z;account :n!u@h PRIVMSG #c :!comment ^ spam\r\n"
            .parse()
            .unwrap();
        assert_eq!(msg.tags.len(), 2);
        assert_eq!(msg.tags[1], ("account".to_string(), None));
        assert_eq!(msg.param(1), Some("!comment ^ spam"));
    }

    #[test]
    fn trailing_may_be_empty() {
        let msg: Message = "PRIVMSG #c :".parse().unwrap();
        assert_eq!(msg.params, ["#c", ""]);
    }

    #[test]
    fn numeric_detection() {
        let msg: Message = ":irc.test 368 bot #chan :End of channel ban list"
            .parse()
            .unwrap();
        assert!(msg.is_numeric());
        assert!(msg.prefix.as_ref().is_some_and(Prefix::is_server));
    }

    #[test]
    fn rejects_bad_lines() {
        let cause = |line: &str| match line.parse::<Message>() {
            Err(ProtocolError::InvalidMessage { cause, .. }) => Some(cause),
            _ => None,
        };
        assert_eq!(cause(""), Some(MessageParseError::EmptyMessage));
        assert_eq!(cause("   \r\n"), Some(MessageParseError::EmptyMessage));
        assert_eq!(cause(":only.prefix"), Some(MessageParseError::MissingCommand));
        assert_eq!(cause("@tags=only"), Some(MessageParseError::DanglingTags));
        assert_eq!(
            cause("PRIV-MSG x"),
            Some(MessageParseError::InvalidCommand("PRIV-MSG".to_string()))
        );
    }

    #[test]
    fn collapses_repeated_spaces() {
        let msg: Message = ":srv  367  bot #chan   *!*@bad   op 1700000000  ".parse().unwrap();
        assert_eq!(msg.command, "367");
        assert_eq!(msg.params, ["bot", "#chan", "*!*@bad", "op", "1700000000"]);
    }

    #[test]
    fn trailing_keeps_inner_spaces_and_colons() {
        let msg: Message = "PRIVMSG #c :  a :b  ".parse().unwrap();
        assert_eq!(msg.params, ["#c", "  a :b  "]);
    }

    #[test]
    fn bare_command() {
        let msg: Message = "ping".parse().unwrap();
        assert_eq!(msg.command, "PING");
        assert!(msg.params.is_empty());
        assert!(msg.prefix.is_none());
    }

    #[test]
    fn serializes_trailing_when_needed() {
        let msg = Message::kick("#chan", "nick", "User is banned from this channel");
        assert_eq!(msg.to_string(), "KICK #chan nick :User is banned from this channel");

        let msg = Message::mode("#chan", "-bb", &["a!*@*".to_string(), "b!*@*".to_string()]);
        assert_eq!(msg.to_string(), "MODE #chan -bb a!*@* b!*@*");

        let msg = Message::notice("nick", ":)");
        assert_eq!(msg.to_string(), "NOTICE nick ::)");
    }

    #[test]
    fn join_list() {
        assert_eq!(Message::join(&["#a", "#b"]).to_string(), "JOIN #a,#b");
    }
}
