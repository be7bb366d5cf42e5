//! HKDF-SHA256 key derivation (RFC 5869) and the Web Push derivations built on it.

use ::hkdf::Hkdf;
use sha2::Sha256;

use crate::codec::concat;
use crate::{PushError, Result};

/// Info prefix for the input keying material (RFC 8291 §3.4).
pub const WEB_PUSH_INFO: &[u8] = b"WebPush: info\0";

/// Info for the content encryption key (RFC 8188 §2.2).
pub const CEK_INFO: &[u8] = b"Content-Encoding: aes128gcm\0";

/// Info for the nonce (RFC 8188 §2.3).
pub const NONCE_INFO: &[u8] = b"Content-Encoding: nonce\0";

/// Largest output HKDF-SHA256 can produce.
pub const MAX_OUTPUT_LEN: usize = 255 * 32;

/// Extract-then-expand HKDF-SHA256.
pub fn hkdf_sha256(ikm: &[u8], salt: &[u8], info: &[u8], len: usize) -> Result<Vec<u8>> {
    let mut okm = vec![0u8; len];
    expand_into(ikm, salt, info, &mut okm)?;
    Ok(okm)
}

fn expand_into(ikm: &[u8], salt: &[u8], info: &[u8], okm: &mut [u8]) -> Result<()> {
    let len = okm.len();
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    hk.expand(info, okm).map_err(|_| {
        PushError::Encryption(format!(
            "HKDF output of {} bytes exceeds {} bytes",
            len, MAX_OUTPUT_LEN
        ))
    })
}

/// Derive the 32-byte IKM from the ECDH secret and the subscriber's auth secret.
///
/// Both public keys must be uncompressed points.
pub fn derive_ikm(
    shared_secret: &[u8],
    auth_secret: &[u8],
    ua_public: &[u8],
    as_public: &[u8],
) -> Result<[u8; 32]> {
    let info = concat(&[WEB_PUSH_INFO, ua_public, as_public]);
    let mut ikm = [0u8; 32];
    expand_into(shared_secret, auth_secret, &info, &mut ikm)?;
    Ok(ikm)
}

/// Derive the 16-byte content encryption key.
pub fn derive_cek(ikm: &[u8], salt: &[u8]) -> Result<[u8; 16]> {
    let mut cek = [0u8; 16];
    expand_into(ikm, salt, CEK_INFO, &mut cek)?;
    Ok(cek)
}

/// Derive the 12-byte nonce.
pub fn derive_nonce(ikm: &[u8], salt: &[u8]) -> Result<[u8; 12]> {
    let mut nonce = [0u8; 12];
    expand_into(ikm, salt, NONCE_INFO, &mut nonce)?;
    Ok(nonce)
}
