//! SASL PLAIN (RFC 4616) payload encoding.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Servers accept at most this many base64 bytes per `AUTHENTICATE` line.
pub const CHUNK_LEN: usize = 400;

/// Encode `authzid NUL authcid NUL password` with an empty authzid.
pub fn encode_plain(account: &str, password: &str) -> String {
    let payload = format!("\0{account}\0{password}");
    BASE64.encode(payload.as_bytes())
}

/// Split an encoded payload into `AUTHENTICATE` arguments.
///
/// A payload that is an exact multiple of [`CHUNK_LEN`] (including empty)
/// is terminated by a lone `+`.
pub fn chunk_payload(encoded: &str) -> Vec<String> {
    let mut chunks: Vec<String> = encoded
        .as_bytes()
        .chunks(CHUNK_LEN)
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect();
    if encoded.len() % CHUNK_LEN == 0 {
        chunks.push("+".to_string());
    }
    chunks
}
