//! Line codec for tokio.
//!
//! Decoding yields raw lines (without `\r\n`) so the caller can log and skip
//! a malformed line without tearing down the stream. Invalid UTF-8 is
//! replaced rather than rejected, and over-long lines are discarded up to the
//! next newline. Encoding takes a [`Message`], strips embedded line breaks
//! and appends `\r\n`.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{ProtocolError, Result};
use crate::message::Message;

/// 512 bytes for the message body plus 8191 for IRCv3 tags.
pub const DEFAULT_MAX_LEN: usize = 512 + 8191;

/// Outbound lines are held to the classic limit.
pub const MAX_OUTBOUND_LEN: usize = 512;

/// Tokio codec for IRC lines.
#[derive(Debug)]
pub struct IrcCodec {
    next_index: usize,
    max_len: usize,
    discarding: bool,
}

impl IrcCodec {
    /// Codec with the default inbound line limit.
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_LEN)
    }

    /// Codec with a custom inbound line limit.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
            discarding: false,
        }
    }

    /// Truncate at the first line break so one message can never smuggle in
    /// a second command.
    pub fn sanitize(mut data: String) -> String {
        if let Some(pos) = data.find(['\r', '\n']) {
            data.truncate(pos);
        }
        data
    }
}

impl Default for IrcCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for IrcCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        loop {
            let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
                if src.len() > self.max_len {
                    // Drop what we have and skip until the next newline.
                    src.clear();
                    self.discarding = true;
                }
                self.next_index = src.len();
                return Ok(None);
            };

            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if std::mem::take(&mut self.discarding) || line.len() > self.max_len {
                continue;
            }

            let text = String::from_utf8_lossy(&line);
            let text = text.trim_end_matches(['\r', '\n']);
            if text.is_empty() {
                continue;
            }
            return Ok(Some(text.to_string()));
        }
    }
}

impl Encoder<Message> for IrcCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> Result<()> {
        let line = Self::sanitize(msg.to_string());
        if line.len() + 2 > MAX_OUTBOUND_LEN {
            return Err(ProtocolError::MessageTooLong {
                actual: line.len() + 2,
                limit: MAX_OUTBOUND_LEN,
            });
        }
        dst.reserve(line.len() + 2);
        dst.extend_from_slice(line.as_bytes());
        dst.extend_from_slice(b"\r\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_complete_lines() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::from("PING :a\r\nPING :b\n");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("PING :a"));
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("PING :b"));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn waits_for_partial_line() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::from("PING :");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"x\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("PING :x"));
    }

    #[test]
    fn skips_overlong_line() {
        let mut codec = IrcCodec::with_max_len(10);
        let mut buf = BytesMut::from("this is way too long");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b" still going\nPING :ok\n");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("PING :ok"));
    }

    #[test]
    fn replaces_invalid_utf8() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::from(&b"PRIVMSG #c :caf\xe9\r\n"[..]);
        let line = codec.decode(&mut buf).unwrap().unwrap();
        assert!(line.starts_with("PRIVMSG #c :caf"));
    }

    #[test]
    fn encodes_with_crlf_and_strips_breaks() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::new();
        codec
            .encode(Message::privmsg("#c", "hi\r\nQUIT"), &mut buf)
            .unwrap();
        assert_eq!(&buf[..], b"PRIVMSG #c hi\r\n");
    }

    #[test]
    fn rejects_overlong_outbound() {
        let mut codec = IrcCodec::new();
        let mut buf = BytesMut::new();
        let text = "x".repeat(600);
        assert!(codec.encode(Message::privmsg("#c", &text), &mut buf).is_err());
    }
}
