//! Message encryption for Web Push (RFC 8291, `aes128gcm`).
//!
//! Every call generates a new ephemeral ECDH key pair and a new salt, so two
//! messages never share a content encryption key.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes128Gcm, Nonce};
use p256::ecdh::EphemeralSecret;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::PublicKey;
use rand::RngCore;
use rand::rngs::OsRng;

use crate::hkdf::{derive_cek, derive_ikm, derive_nonce};
use crate::vapid::PUBLIC_KEY_LEN;
use crate::wire::{HEADER_LEN, MAX_BODY_LEN, SALT_LEN};
use crate::{PushError, Result};

/// Length of the subscriber's auth secret.
pub const AUTH_SECRET_LEN: usize = 16;

/// AES-GCM authentication tag length.
pub const TAG_LEN: usize = 16;

/// Padding delimiter marking the last record.
const LAST_RECORD_DELIMITER: u8 = 0x02;

/// Largest plaintext whose complete body stays within [`MAX_BODY_LEN`].
///
/// The record itself could hold more, but push services answer 413 above
/// the guaranteed body size.
pub const MAX_PLAINTEXT_LEN: usize = MAX_BODY_LEN - HEADER_LEN - TAG_LEN - 1;

/// Ciphertext plus the public values the receiver needs to decrypt it.
#[derive(Debug, Clone)]
pub struct EncryptedPayload {
    /// Encrypted record including the authentication tag.
    pub ciphertext: Vec<u8>,
    /// Random per-message salt.
    pub salt: [u8; SALT_LEN],
    /// Uncompressed ephemeral public key.
    pub ephemeral_public: [u8; PUBLIC_KEY_LEN],
}

/// Encrypt a payload for one subscriber.
pub fn encrypt(
    plaintext: &[u8],
    ua_public: &[u8; PUBLIC_KEY_LEN],
    auth_secret: &[u8; AUTH_SECRET_LEN],
) -> Result<EncryptedPayload> {
    let ephemeral = EphemeralSecret::random(&mut OsRng);
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    encrypt_with(&ephemeral, salt, plaintext, ua_public, auth_secret)
}

pub(crate) fn encrypt_with(
    ephemeral: &EphemeralSecret,
    salt: [u8; SALT_LEN],
    plaintext: &[u8],
    ua_public: &[u8; PUBLIC_KEY_LEN],
    auth_secret: &[u8; AUTH_SECRET_LEN],
) -> Result<EncryptedPayload> {
    if plaintext.len() > MAX_PLAINTEXT_LEN {
        return Err(PushError::PayloadTooLarge {
            size: plaintext.len(),
            limit: MAX_PLAINTEXT_LEN,
        });
    }

    let peer = PublicKey::from_sec1_bytes(ua_public).map_err(|_| {
        PushError::InvalidSubscription("p256dh is not a valid P-256 point".to_string())
    })?;

    let mut ephemeral_public = [0u8; PUBLIC_KEY_LEN];
    ephemeral_public.copy_from_slice(ephemeral.public_key().to_encoded_point(false).as_bytes());

    let shared = ephemeral.diffie_hellman(&peer);
    let ikm = derive_ikm(
        shared.raw_secret_bytes().as_slice(),
        auth_secret,
        ua_public,
        &ephemeral_public,
    )?;
    let cek = derive_cek(&ikm, &salt)?;
    let nonce = derive_nonce(&ikm, &salt)?;

    let mut record = Vec::with_capacity(plaintext.len() + 1 + TAG_LEN);
    record.extend_from_slice(plaintext);
    record.push(LAST_RECORD_DELIMITER);

    let cipher = Aes128Gcm::new_from_slice(&cek)
        .map_err(|_| PushError::Encryption("invalid content encryption key".to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), record.as_slice())
        .map_err(|_| PushError::Encryption("AES-GCM encryption failed".to_string()))?;

    Ok(EncryptedPayload {
        ciphertext,
        salt,
        ephemeral_public,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::build_body;
    use p256::SecretKey;

    struct Subscriber {
        secret: SecretKey,
        public: [u8; PUBLIC_KEY_LEN],
        auth: [u8; AUTH_SECRET_LEN],
    }

    impl Subscriber {
        fn new() -> Self {
            let secret = SecretKey::random(&mut OsRng);
            let mut public = [0u8; PUBLIC_KEY_LEN];
            public.copy_from_slice(secret.public_key().to_encoded_point(false).as_bytes());
            let mut auth = [0u8; AUTH_SECRET_LEN];
            OsRng.fill_bytes(&mut auth);
            Self {
                secret,
                public,
                auth,
            }
        }

        /// Receiver side of RFC 8291, written against the raw primitives.
        fn decrypt(&self, body: &[u8]) -> Option<Vec<u8>> {
            let salt = &body[..16];
            let rs = u32::from_be_bytes(body[16..20].try_into().ok()?);
            assert_eq!(rs, 4096);
            let idlen = body[20] as usize;
            let keyid = &body[21..21 + idlen];
            let ciphertext = &body[21 + idlen..];

            let sender = PublicKey::from_sec1_bytes(keyid).ok()?;
            let shared =
                p256::ecdh::diffie_hellman(self.secret.to_nonzero_scalar(), sender.as_affine());

            let mut info = b"WebPush: info\0".to_vec();
            info.extend_from_slice(&self.public);
            info.extend_from_slice(keyid);
            let mut ikm = [0u8; 32];
            ::hkdf::Hkdf::<sha2::Sha256>::new(Some(&self.auth[..]), shared.raw_secret_bytes())
                .expand(&info, &mut ikm)
                .ok()?;

            let prk = ::hkdf::Hkdf::<sha2::Sha256>::new(Some(salt), &ikm);
            let mut cek = [0u8; 16];
            prk.expand(b"Content-Encoding: aes128gcm\0", &mut cek).ok()?;
            let mut nonce = [0u8; 12];
            prk.expand(b"Content-Encoding: nonce\0", &mut nonce).ok()?;

            let mut padded = Aes128Gcm::new_from_slice(&cek)
                .ok()?
                .decrypt(Nonce::from_slice(&nonce), ciphertext)
                .ok()?;
            assert_eq!(padded.pop(), Some(LAST_RECORD_DELIMITER));
            Some(padded)
        }
    }

    fn roundtrip(plaintext: &[u8]) {
        let subscriber = Subscriber::new();
        let encrypted = encrypt(plaintext, &subscriber.public, &subscriber.auth).unwrap();
        assert_eq!(encrypted.ciphertext.len(), plaintext.len() + 1 + TAG_LEN);

        let body = build_body(
            &encrypted.salt,
            &encrypted.ephemeral_public,
            &encrypted.ciphertext,
        );
        assert_eq!(subscriber.decrypt(&body).unwrap(), plaintext);
    }

    #[test]
    fn test_roundtrip_empty() {
        roundtrip(b"");
    }

    #[test]
    fn test_roundtrip_single_byte() {
        roundtrip(b"x");
    }

    #[test]
    fn test_roundtrip_large() {
        let payload: Vec<u8> = (0..1500).map(|i| (i % 251) as u8).collect();
        roundtrip(&payload);
    }

    #[test]
    fn test_roundtrip_json() {
        roundtrip(br#"{"title":"Session tonight","body":"7pm at the rec center"}"#);
    }

    #[test]
    fn test_roundtrip_max_size() {
        roundtrip(&vec![0x41; MAX_PLAINTEXT_LEN]);
    }

    #[test]
    fn test_max_payload_fills_body_exactly() {
        let subscriber = Subscriber::new();
        let encrypted = encrypt(
            &vec![0x41; MAX_PLAINTEXT_LEN],
            &subscriber.public,
            &subscriber.auth,
        )
        .unwrap();
        let body = build_body(
            &encrypted.salt,
            &encrypted.ephemeral_public,
            &encrypted.ciphertext,
        );

        assert_eq!(MAX_PLAINTEXT_LEN, 3993);
        assert_eq!(body.len(), MAX_BODY_LEN);
    }

    #[test]
    fn test_fresh_salt_and_key_each_call() {
        let subscriber = Subscriber::new();
        let a = encrypt(b"same", &subscriber.public, &subscriber.auth).unwrap();
        let b = encrypt(b"same", &subscriber.public, &subscriber.auth).unwrap();

        assert_ne!(a.salt, b.salt);
        assert_ne!(a.ephemeral_public, b.ephemeral_public);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_deterministic_with_pinned_inputs() {
        let subscriber = Subscriber::new();
        let ephemeral = EphemeralSecret::random(&mut OsRng);
        let salt = [3u8; SALT_LEN];

        let a = encrypt_with(&ephemeral, salt, b"hi", &subscriber.public, &subscriber.auth)
            .unwrap();
        let b = encrypt_with(&ephemeral, salt, b"hi", &subscriber.public, &subscriber.auth)
            .unwrap();
        assert_eq!(a.ciphertext, b.ciphertext);
        assert_eq!(a.ephemeral_public[0], 0x04);
    }

    #[test]
    fn test_wrong_auth_secret_fails_to_decrypt() {
        let subscriber = Subscriber::new();
        let encrypted = encrypt(b"secret", &subscriber.public, &subscriber.auth).unwrap();
        let body = build_body(
            &encrypted.salt,
            &encrypted.ephemeral_public,
            &encrypted.ciphertext,
        );

        let impostor = Subscriber {
            auth: [0u8; AUTH_SECRET_LEN],
            ..subscriber
        };
        assert!(impostor.decrypt(&body).is_none());
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let subscriber = Subscriber::new();
        let err = encrypt(
            &vec![0u8; MAX_PLAINTEXT_LEN + 1],
            &subscriber.public,
            &subscriber.auth,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PushError::PayloadTooLarge {
                size: 3994,
                limit: 3993
            }
        ));
    }

    #[test]
    fn test_invalid_subscriber_key_rejected() {
        let mut bogus = [0u8; PUBLIC_KEY_LEN];
        bogus[0] = 0x04;
        let err = encrypt(b"x", &bogus, &[0u8; AUTH_SECRET_LEN]).unwrap_err();
        assert!(matches!(err, PushError::InvalidSubscription(_)));
    }
}
