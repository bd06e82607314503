//! Numeric replies the bot reacts to.
//!
//! Only the numerics that drive registration, state tracking and list
//! queries are listed. Everything else is passed through as a raw command
//! string.

#![allow(non_camel_case_types)]

use std::fmt;

/// IRC server numeric reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
#[non_exhaustive]
pub enum Response {
    /// 001 - Welcome, registration complete
    RPL_WELCOME = 1,
    /// 005 - Server supported features (ISUPPORT)
    RPL_ISUPPORT = 5,
    /// 315 - End of WHO
    RPL_ENDOFWHO = 315,
    /// 352 - WHO reply
    RPL_WHOREPLY = 352,
    /// 353 - NAMES reply
    RPL_NAMREPLY = 353,
    /// 366 - End of NAMES
    RPL_ENDOFNAMES = 366,
    /// 367 - Ban list entry
    RPL_BANLIST = 367,
    /// 368 - End of ban list
    RPL_ENDOFBANLIST = 368,
    /// 403 - No such channel
    ERR_NOSUCHCHANNEL = 403,
    /// 432 - Erroneous nickname
    ERR_ERRONEUSNICKNAME = 432,
    /// 433 - Nickname in use
    ERR_NICKNAMEINUSE = 433,
    /// 437 - Nick/channel temporarily unavailable
    ERR_UNAVAILRESOURCE = 437,
    /// 442 - You're not on that channel
    ERR_NOTONCHANNEL = 442,
    /// 482 - You're not channel operator
    ERR_CHANOPRIVSNEEDED = 482,
    /// 728 - Quiet list entry
    RPL_QUIETLIST = 728,
    /// 729 - End of quiet list
    RPL_ENDOFQUIETLIST = 729,
    /// 900 - Logged in
    RPL_LOGGEDIN = 900,
    /// 903 - SASL success
    RPL_SASLSUCCESS = 903,
    /// 904 - SASL fail
    ERR_SASLFAIL = 904,
    /// 905 - SASL message too long
    ERR_SASLTOOLONG = 905,
    /// 906 - SASL aborted
    ERR_SASLABORTED = 906,
    /// 907 - Already authenticated
    ERR_SASLALREADY = 907,
}

impl Response {
    /// Numeric code.
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Look up a response from its code.
    pub fn from_code(code: u16) -> Option<Self> {
        use Response::*;
        Some(match code {
            1 => RPL_WELCOME,
            5 => RPL_ISUPPORT,
            315 => RPL_ENDOFWHO,
            352 => RPL_WHOREPLY,
            353 => RPL_NAMREPLY,
            366 => RPL_ENDOFNAMES,
            367 => RPL_BANLIST,
            368 => RPL_ENDOFBANLIST,
            403 => ERR_NOSUCHCHANNEL,
            432 => ERR_ERRONEUSNICKNAME,
            433 => ERR_NICKNAMEINUSE,
            437 => ERR_UNAVAILRESOURCE,
            442 => ERR_NOTONCHANNEL,
            482 => ERR_CHANOPRIVSNEEDED,
            728 => RPL_QUIETLIST,
            729 => RPL_ENDOFQUIETLIST,
            900 => RPL_LOGGEDIN,
            903 => RPL_SASLSUCCESS,
            904 => ERR_SASLFAIL,
            905 => ERR_SASLTOOLONG,
            906 => ERR_SASLABORTED,
            907 => ERR_SASLALREADY,
            _ => return None,
        })
    }

    /// Parse from a command token such as `"367"`.
    pub fn from_command(command: &str) -> Option<Self> {
        if command.len() != 3 {
            return None;
        }
        command.parse().ok().and_then(Self::from_code)
    }

    /// True for 4xx/5xx and SASL failure numerics.
    pub const fn is_error(self) -> bool {
        let code = self.code();
        (code >= 400 && code < 600) || (code >= 904 && code <= 907)
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trip() {
        assert_eq!(Response::RPL_QUIETLIST.code(), 728);
        assert_eq!(Response::from_code(368), Some(Response::RPL_ENDOFBANLIST));
        assert_eq!(Response::from_code(999), None);
    }

    #[test]
    fn from_command_token() {
        assert_eq!(Response::from_command("001"), Some(Response::RPL_WELCOME));
        assert_eq!(Response::from_command("PRIVMSG"), None);
        assert_eq!(Response::from_command("1"), None);
    }

    #[test]
    fn display_pads() {
        assert_eq!(Response::RPL_ISUPPORT.to_string(), "005");
        assert!(Response::ERR_NICKNAMEINUSE.is_error());
        assert!(!Response::RPL_BANLIST.is_error());
    }
}
