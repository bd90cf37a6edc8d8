//! # Latin-1 Encoding
//!
//! Fingerprint printers take ISO 8859-1 text. U+0000–U+00FF map one-to-one
//! onto bytes; everything else is replaced with `?` and a warning is logged.

use tracing::warn;

/// Encode a Unicode string as Latin-1 bytes.
///
/// - U+0000–U+00FF: single byte with the same value
/// - Anything above: replaced with `?`
pub fn encode(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for ch in s.chars() {
        match u8::try_from(u32::from(ch)) {
            Ok(byte) => out.push(byte),
            Err(_) => {
                warn!(
                    character = %ch,
                    code_point = %format!("U+{:04X}", ch as u32),
                    "latin1: unmapped character, replacing with '?'"
                );
                out.push(b'?');
            }
        }
    }
    out
}

/// Decode Latin-1 bytes. Every byte is a valid code point, so this never fails.
pub fn decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}
