//! Ban-mask glob matching.
//!
//! Masks use `*` for any run of characters (including none) and `?` for
//! exactly one character. Everything else matches itself after case-folding
//! under the server's [`CaseMapping`]. Extended bans such as `$a:account`
//! compile fine but are matched literally, so they never hit a hostmask.

use crate::casemap::CaseMapping;

/// A mask compiled against a case-mapping, ready to be matched repeatedly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Glob {
    pattern: Vec<char>,
    casemap: CaseMapping,
}

impl Glob {
    /// Compile a mask. Runs of consecutive `*` collapse to one.
    pub fn compile(mask: &str, casemap: CaseMapping) -> Self {
        let mut pattern = Vec::with_capacity(mask.len());
        for c in mask.chars() {
            if c == '*' && pattern.last() == Some(&'*') {
                continue;
            }
            pattern.push(casemap.fold_char(c));
        }
        Self { pattern, casemap }
    }

    /// True if `text` (usually `nick!user@host`) matches this mask.
    pub fn matches(&self, text: &str) -> bool {
        let text: Vec<char> = text.chars().map(|c| self.casemap.fold_char(c)).collect();
        match_folded(&self.pattern, &text)
    }

    /// The folded pattern, for logging.
    pub fn as_folded(&self) -> String {
        self.pattern.iter().collect()
    }
}

/// One-shot convenience wrapper around [`Glob::compile`] + [`Glob::matches`].
pub fn glob_match(mask: &str, text: &str, casemap: CaseMapping) -> bool {
    Glob::compile(mask, casemap).matches(text)
}

// Iterative matcher with single-star backtracking: on mismatch, rewind to the
// last `*` and let it swallow one more character.
fn match_folded(pattern: &[char], text: &[char]) -> bool {
    let mut p = 0;
    let mut t = 0;
    let mut star_p = None;
    let mut star_t = 0;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == '*' {
            star_p = Some(p);
            star_t = t;
            p += 1;
        } else if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if let Some(sp) = star_p {
            p = sp + 1;
            star_t += 1;
            t = star_t;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }

    p == pattern.len()
}
