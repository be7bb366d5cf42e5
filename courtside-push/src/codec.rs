//! Base64url and byte buffer helpers.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::Result;

/// Encode bytes as unpadded base64url.
pub fn base64url_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode base64url.
///
/// Browsers hand out subscription keys in several spellings, so trailing `=`
/// padding is ignored and the standard `+`/`/` alphabet is folded into `-`/`_`
/// before decoding.
pub fn base64url_decode(input: &str) -> Result<Vec<u8>> {
    let normalized: String = input
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            c => c,
        })
        .collect();

    Ok(URL_SAFE_NO_PAD.decode(normalized.as_bytes())?)
}

/// Concatenate buffers in order.
pub fn concat(parts: &[&[u8]]) -> Vec<u8> {
    let len = parts.iter().map(|p| p.len()).sum();
    let mut out = Vec::with_capacity(len);
    for part in parts {
        out.extend_from_slice(part);
    }
    out
}
