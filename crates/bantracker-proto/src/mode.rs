//! Channel mode strings.
//!
//! Parsing needs the server's [`ServerSupport`] so that arguments are
//! attributed to the right letters: in `+ob nick mask`, `o` eats `nick`
//! and `b` eats `mask`. Unknown letters are treated as argument-less.

use smallvec::SmallVec;

use crate::isupport::ServerSupport;

/// One letter of a mode change with its sign and argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModeChange {
    /// `true` for `+`, `false` for `-`.
    pub adding: bool,
    /// Mode letter.
    pub mode: char,
    /// Positional argument, if the letter takes one and one was present.
    pub arg: Option<String>,
}

/// Mode changes from one `MODE` line; most lines carry only a few.
pub type ModeChanges = SmallVec<[ModeChange; 4]>;

/// Parse a channel mode string and its arguments.
///
/// Lenient: a missing argument yields `None` (list queries such as
/// `MODE #chan +b` look like this) and surplus arguments are ignored.
pub fn parse_channel_modes<S: AsRef<str>>(pieces: &[S], support: &ServerSupport) -> ModeChanges {
    let mut out = ModeChanges::new();
    let Some((first, rest)) = pieces.split_first() else {
        return out;
    };

    let mut args = rest.iter().map(AsRef::as_ref);
    let mut adding = true;

    for c in first.as_ref().chars() {
        match c {
            '+' => adding = true,
            '-' => adding = false,
            _ => {
                let arg = if support.takes_arg(c, adding) {
                    args.next().map(str::to_string)
                } else {
                    None
                };
                out.push(ModeChange {
                    adding,
                    mode: c,
                    arg,
                });
            }
        }
    }

    out
}

/// Build `MODE` lines that apply `sign` to each `(letter, arg)` entry, at
/// most `per_line` entries per line. Returns `(modestring, args)` pairs.
pub fn chunk_mode_lines(
    sign: char,
    entries: &[(char, String)],
    per_line: usize,
) -> Vec<(String, Vec<String>)> {
    entries
        .chunks(per_line.max(1))
        .map(|chunk| {
            let mut modes = String::with_capacity(chunk.len() + 1);
            modes.push(sign);
            let mut args = Vec::with_capacity(chunk.len());
            for (letter, arg) in chunk {
                modes.push(*letter);
                args.push(arg.clone());
            }
            (modes, args)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(pieces: &[&str]) -> ModeChanges {
        parse_channel_modes(pieces, &ServerSupport::default())
    }

    #[test]
    fn interleaved_status_mode_keeps_attribution() {
        let changes = parse(&["+ob", "nick", "*!*@bad"]);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].arg.as_deref(), Some("nick"));
        assert_eq!(changes[1].mode, 'b');
        assert_eq!(changes[1].arg.as_deref(), Some("*!*@bad"));
    }

    #[test]
    fn signs_switch_midway() {
        let changes = parse(&["+b-b+m", "a!*@*", "b!*@*"]);
        assert!(changes[0].adding);
        assert!(!changes[1].adding);
        assert_eq!(changes[1].arg.as_deref(), Some("b!*@*"));
        assert_eq!(changes[2].mode, 'm');
        assert_eq!(changes[2].arg, None);
    }

    #[test]
    fn limit_only_takes_arg_when_set() {
        let changes = parse(&["-l+bl", "x!*@*", "50"]);
        assert_eq!(changes[0].arg, None);
        assert_eq!(changes[1].arg.as_deref(), Some("x!*@*"));
        assert_eq!(changes[2].arg.as_deref(), Some("50"));
    }

    #[test]
    fn list_query_has_no_arg() {
        let changes = parse(&["+b"]);
        assert_eq!(changes[0].arg, None);
    }

    #[test]
    fn quiet_as_list_mode() {
        let mut support = ServerSupport::default();
        support.apply_token("CHANMODES=eIbq,k,flj,CFLMPQScgimnprstuz");
        let changes = parse_channel_modes(&["+qk", "$a:foo", "key"], &support);
        assert_eq!(changes[0].arg.as_deref(), Some("$a:foo"));
        assert_eq!(changes[1].arg.as_deref(), Some("key"));
    }

    #[test]
    fn chunks_by_per_line() {
        let entries: Vec<(char, String)> = vec![
            ('b', "a".into()),
            ('b', "b".into()),
            ('q', "c".into()),
            ('b', "d".into()),
        ];
        let lines = chunk_mode_lines('-', &entries, 3);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].0, "-bbq");
        assert_eq!(lines[0].1, ["a", "b", "c"]);
        assert_eq!(lines[1].0, "-b");
    }

    #[test]
    fn zero_per_line_is_one() {
        let entries = vec![('b', "a".to_string()), ('b', "b".to_string())];
        assert_eq!(chunk_mode_lines('-', &entries, 0).len(), 2);
    }
}
