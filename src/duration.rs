//! Human duration expressions: `1w2d`, `2h30m`, `90`.
//!
//! Components are `<digits><unit>` in descending unit order (`w`, `d`, `h`,
//! `m`, `s`), each unit at most once. A bare integer is seconds.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PRETTY: Regex =
        Regex::new(r"^(?:(\d+)w)?(?:(\d+)d)?(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?$")
            .expect("duration pattern compiles");
    static ref BARE: Regex = Regex::new(r"^\d+$").expect("bare pattern compiles");
}

const UNITS: [i64; 5] = [7 * 86_400, 86_400, 3_600, 60, 1];

/// Parse an expression into seconds. `None` if malformed or out of range.
pub fn parse_duration(expr: &str) -> Option<i64> {
    if expr.is_empty() {
        return None;
    }
    if BARE.is_match(expr) {
        return expr.parse().ok();
    }

    let caps = PRETTY.captures(expr)?;
    let mut total: i64 = 0;
    for (idx, unit) in UNITS.iter().enumerate() {
        if let Some(m) = caps.get(idx + 1) {
            let n: i64 = m.as_str().parse().ok()?;
            total = total.checked_add(n.checked_mul(*unit)?)?;
        }
    }
    Some(total)
}
