//! ISUPPORT (005) tracking.
//!
//! The server advertises the parameters the bot needs to read mode changes
//! correctly: which modes are status prefixes (`PREFIX`), which channel modes
//! take arguments (`CHANMODES`), how many parametric modes fit in one `MODE`
//! line (`MODES`) and how names fold (`CASEMAPPING`). Values persist across
//! 005 lines; `-TOKEN` resets a token to its default.

use crate::casemap::CaseMapping;

/// Number of parametric modes per line when the server does not say.
pub const DEFAULT_MODES: usize = 3;

/// Parsed `CHANMODES` token: `A,B,C,D`.
///
/// * A: list modes, always take an argument (`b`, `q`, `e`, `I`)
/// * B: always take an argument (`k`)
/// * C: take an argument only when set (`l`)
/// * D: never take an argument
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChanModes {
    /// Type A list modes.
    pub list: String,
    /// Type B modes.
    pub always_arg: String,
    /// Type C modes.
    pub set_arg: String,
    /// Type D modes.
    pub no_arg: String,
}

impl ChanModes {
    /// Parse `beI,k,l,imnpst`. Extra groups beyond four are ignored.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split(',');
        let list = parts.next()?.to_string();
        let always_arg = parts.next()?.to_string();
        let set_arg = parts.next()?.to_string();
        let no_arg = parts.next().unwrap_or("").to_string();
        Some(Self {
            list,
            always_arg,
            set_arg,
            no_arg,
        })
    }
}

impl Default for ChanModes {
    fn default() -> Self {
        Self {
            list: "beI".to_string(),
            always_arg: "k".to_string(),
            set_arg: "l".to_string(),
            no_arg: "imnpst".to_string(),
        }
    }
}

/// Parsed `PREFIX` token: status modes ranked highest first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrefixSpec {
    /// `(mode, symbol)` pairs, index 0 is the highest rank.
    pub entries: Vec<(char, char)>,
}

impl PrefixSpec {
    /// Parse a value like `(qaohv)~&@%+`.
    pub fn parse(s: &str) -> Option<Self> {
        let rest = s.strip_prefix('(')?;
        let (modes, symbols) = rest.split_once(')')?;
        if modes.chars().count() != symbols.chars().count() {
            return None;
        }
        Some(Self {
            entries: modes.chars().zip(symbols.chars()).collect(),
        })
    }

    /// Rank of a status mode, 0 = highest.
    pub fn rank_of_mode(&self, mode: char) -> Option<usize> {
        self.entries.iter().position(|&(m, _)| m == mode)
    }

    /// Status mode for a NAMES prefix symbol.
    pub fn mode_for_symbol(&self, symbol: char) -> Option<char> {
        self.entries
            .iter()
            .find(|&&(_, s)| s == symbol)
            .map(|&(m, _)| m)
    }

    /// True if `mode` is a status mode.
    pub fn is_status_mode(&self, mode: char) -> bool {
        self.rank_of_mode(mode).is_some()
    }
}

impl Default for PrefixSpec {
    fn default() -> Self {
        Self {
            entries: vec![('o', '@'), ('v', '+')],
        }
    }
}

/// Accumulated server support parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerSupport {
    /// Status modes.
    pub prefix: PrefixSpec,
    /// Channel mode argument classes.
    pub chanmodes: ChanModes,
    /// Parametric modes per `MODE` line.
    pub modes: Option<usize>,
    /// Name folding rules.
    pub casemapping: CaseMapping,
    /// Modes the client treats as list modes whatever `CHANMODES` says.
    assumed_list: String,
}

impl ServerSupport {
    /// Apply the parameters of an `RPL_ISUPPORT` reply.
    ///
    /// `params` is the full parameter list: target nick first, trailing
    /// "are supported by this server" text last.
    pub fn apply_reply(&mut self, params: &[String]) {
        let Some(tokens) = params.get(1..) else {
            return;
        };
        let tokens = match tokens.split_last() {
            Some((last, init)) if last.contains(' ') => init,
            _ => tokens,
        };
        for token in tokens {
            self.apply_token(token);
        }
    }

    /// Apply one `KEY`, `KEY=VALUE` or `-KEY` token.
    pub fn apply_token(&mut self, token: &str) {
        if let Some(key) = token.strip_prefix('-') {
            match key.to_ascii_uppercase().as_str() {
                "PREFIX" => self.prefix = PrefixSpec::default(),
                "CHANMODES" => self.chanmodes = ChanModes::default(),
                "MODES" => self.modes = None,
                "CASEMAPPING" => self.casemapping = CaseMapping::default(),
                _ => {}
            }
            return;
        }

        let (key, value) = match token.split_once('=') {
            Some((k, v)) => (k, Some(v)),
            None => (token, None),
        };

        match key.to_ascii_uppercase().as_str() {
            "PREFIX" => {
                // `PREFIX=` means no status modes at all.
                self.prefix = match value {
                    Some("") => PrefixSpec { entries: Vec::new() },
                    Some(v) => PrefixSpec::parse(v).unwrap_or_default(),
                    None => PrefixSpec::default(),
                };
            }
            "CHANMODES" => {
                if let Some(cm) = value.and_then(ChanModes::parse) {
                    self.chanmodes = cm;
                }
            }
            "MODES" => {
                // A bare `MODES` token means no limit; cap it at a sane batch.
                self.modes = match value {
                    Some(v) => v.parse().ok().filter(|&n: &usize| n > 0),
                    None => Some(12),
                };
            }
            "CASEMAPPING" => {
                if let Some(cm) = value.and_then(|v| v.parse().ok()) {
                    self.casemapping = cm;
                }
            }
            _ => {}
        }
    }

    /// Always treat `mode` as a list mode, even when the server's
    /// `CHANMODES` omits it. Survives later `CHANMODES` tokens.
    pub fn assume_list_mode(&mut self, mode: char) {
        if !self.assumed_list.contains(mode) {
            self.assumed_list.push(mode);
        }
    }

    /// Parametric modes per line, falling back to [`DEFAULT_MODES`].
    pub fn modes_per_line(&self) -> usize {
        self.modes.unwrap_or(DEFAULT_MODES)
    }

    /// Whether `mode` consumes an argument when `adding` (true) or removing.
    pub fn takes_arg(&self, mode: char, adding: bool) -> bool {
        if self.prefix.is_status_mode(mode)
            || self.chanmodes.list.contains(mode)
            || self.assumed_list.contains(mode)
            || self.chanmodes.always_arg.contains(mode)
        {
            return true;
        }
        adding && self.chanmodes.set_arg.contains(mode)
    }
}
