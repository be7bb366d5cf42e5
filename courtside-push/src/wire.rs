//! `aes128gcm` content-coding header (RFC 8188 §2).

use crate::vapid::PUBLIC_KEY_LEN;

/// Salt length.
pub const SALT_LEN: usize = 16;

/// Record size advertised in the header.
pub const RECORD_SIZE: u32 = 4096;

/// `salt || rs || idlen || keyid`.
pub const HEADER_LEN: usize = SALT_LEN + 4 + 1 + PUBLIC_KEY_LEN;

/// Largest request body push services are required to accept (RFC 8291 §4).
pub const MAX_BODY_LEN: usize = 4096;

/// Assemble the request body: header followed by the single encrypted record.
pub fn build_body(
    salt: &[u8; SALT_LEN],
    ephemeral_public: &[u8; PUBLIC_KEY_LEN],
    ciphertext: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    body.extend_from_slice(salt);
    body.extend_from_slice(&RECORD_SIZE.to_be_bytes());
    body.push(PUBLIC_KEY_LEN as u8);
    body.extend_from_slice(ephemeral_public);
    body.extend_from_slice(ciphertext);
    body
}
