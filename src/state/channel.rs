//! Channel-related types and state.

use std::collections::HashMap;

use bantracker_proto::PrefixSpec;

/// Status modes a member holds (`o`, `v`, ...), as advertised in `PREFIX`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemberModes {
    modes: Vec<char>,
}

impl MemberModes {
    /// Build from the prefix symbols in a NAMES entry (`@+nick`).
    pub fn from_symbols(symbols: &str, prefix: &PrefixSpec) -> Self {
        let mut modes = Self::default();
        for symbol in symbols.chars() {
            if let Some(mode) = prefix.mode_for_symbol(symbol) {
                modes.grant(mode);
            }
        }
        modes
    }

    /// Add a status mode.
    pub fn grant(&mut self, mode: char) {
        if !self.modes.contains(&mode) {
            self.modes.push(mode);
        }
    }

    /// Remove a status mode.
    pub fn revoke(&mut self, mode: char) {
        self.modes.retain(|&m| m != mode);
    }

    /// Holds no status at all.
    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    /// Holds this exact mode.
    #[cfg(test)]
    pub fn has(&self, mode: char) -> bool {
        self.modes.contains(&mode)
    }

    /// Holds `o` or anything ranked above it in `PREFIX`.
    pub fn has_op_or_higher(&self, prefix: &PrefixSpec) -> bool {
        let op_rank = prefix.rank_of_mode('o').unwrap_or(0);
        self.modes
            .iter()
            .any(|&m| prefix.rank_of_mode(m).is_some_and(|rank| rank <= op_rank))
    }
}

/// A channel the bot is in.
#[derive(Debug, Clone)]
pub struct Channel {
    /// Name as the server first sent it.
    pub name: String,
    /// Members keyed by case-folded nickname.
    pub members: HashMap<String, MemberModes>,
}

impl Channel {
    /// Empty channel.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            members: HashMap::new(),
        }
    }
}
