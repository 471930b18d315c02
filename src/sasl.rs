//! SASL PLAIN authentication helpers.
//!
//! The session authenticates with the PLAIN mechanism (RFC 4616): the
//! payload is `authzid NUL authcid NUL password`, base64-encoded and carried
//! in `AUTHENTICATE` frames. Payloads longer than 400 bytes are split across
//! several frames; a payload that is an exact multiple of 400 is terminated
//! with a lone `+`.
//!
//! # Reference
//! - IRCv3 SASL: <https://ircv3.net/specs/extensions/sasl-3.2>
//! - RFC 4616 (PLAIN): <https://tools.ietf.org/html/rfc4616>

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Maximum length of a single `AUTHENTICATE` argument.
pub const SASL_CHUNK_SIZE: usize = 400;

/// Encode PLAIN credentials, using the username as both authorization and
/// authentication identity.
pub fn encode_plain(username: &str, password: &str) -> String {
    let payload = format!("{username}\0{username}\0{password}");
    BASE64.encode(payload.as_bytes())
}

/// Split an encoded payload into `AUTHENTICATE` arguments.
///
/// Includes the trailing `+` frame when the payload length is an exact
/// multiple of the chunk size.
pub fn chunk_payload(encoded: &str) -> Vec<String> {
    let mut chunks: Vec<String> = encoded
        .as_bytes()
        .chunks(SASL_CHUNK_SIZE)
        // base64 output is ASCII, so chunk boundaries are char boundaries
        .map(|c| String::from_utf8(c.to_vec()).unwrap_or_default())
        .collect();
    if encoded.is_empty() || encoded.len() % SASL_CHUNK_SIZE == 0 {
        chunks.push("+".to_string());
    }
    chunks
}
