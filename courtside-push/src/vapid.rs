//! VAPID application server authentication (RFC 8292).

use chrono::Utc;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::codec::{base64url_decode, base64url_encode};
use crate::{PushError, Result};

/// Length of an uncompressed P-256 point.
pub const PUBLIC_KEY_LEN: usize = 65;

/// Default lifetime of a signed VAPID token.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Cached tokens are re-signed once they get this close to expiry.
const REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// The application server's P-256 key pair.
#[derive(Clone)]
pub struct VapidKeys {
    signing_key: SigningKey,
    public_key: [u8; PUBLIC_KEY_LEN],
}

impl VapidKeys {
    /// Generate a fresh key pair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        let public_key = uncompressed_point(signing_key.verifying_key());
        Self {
            signing_key,
            public_key,
        }
    }

    /// Load keys from base64url configuration values.
    ///
    /// The public key is trusted as given when supplied; otherwise it is
    /// derived from the private scalar.
    pub fn from_base64url(private_key: &str, public_key: Option<&str>) -> Result<Self> {
        let private_raw = base64url_decode(private_key)
            .map_err(|e| PushError::Config(format!("VAPID private key: {}", e)))?;
        let signing_key = SigningKey::from_slice(&private_raw).map_err(|_| {
            PushError::Config(format!(
                "VAPID private key must be a 32-byte P-256 scalar, got {} bytes",
                private_raw.len()
            ))
        })?;

        let public_key = match public_key {
            Some(encoded) => {
                let raw = base64url_decode(encoded)
                    .map_err(|e| PushError::Config(format!("VAPID public key: {}", e)))?;
                parse_uncompressed_point(&raw).ok_or_else(|| {
                    PushError::Config(format!(
                        "VAPID public key must be a {}-byte uncompressed point",
                        PUBLIC_KEY_LEN
                    ))
                })?
            }
            None => uncompressed_point(signing_key.verifying_key()),
        };

        Ok(Self {
            signing_key,
            public_key,
        })
    }

    /// Uncompressed public key bytes.
    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.public_key
    }

    /// Public key as distributed to browsers (`applicationServerKey`).
    pub fn public_key_base64url(&self) -> String {
        base64url_encode(&self.public_key)
    }

    /// Private scalar, base64url encoded.
    pub fn private_key_base64url(&self) -> String {
        base64url_encode(&self.signing_key.to_bytes())
    }

    /// Verifying half of the key pair.
    pub fn verifying_key(&self) -> &VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// ES256 signature in the fixed-width `r || s` form JWS requires.
    ///
    /// `p256` already emits this layout; DER never appears here.
    pub fn sign(&self, message: &[u8]) -> Result<[u8; 64]> {
        let signature: Signature = self
            .signing_key
            .try_sign(message)
            .map_err(|e| PushError::Signing(e.to_string()))?;
        let mut raw = [0u8; 64];
        raw.copy_from_slice(&signature.to_bytes());
        Ok(raw)
    }
}

impl std::fmt::Debug for VapidKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VapidKeys")
            .field("public_key", &self.public_key_base64url())
            .finish_non_exhaustive()
    }
}

fn uncompressed_point(key: &VerifyingKey) -> [u8; PUBLIC_KEY_LEN] {
    let point = key.to_encoded_point(false);
    let mut out = [0u8; PUBLIC_KEY_LEN];
    out.copy_from_slice(point.as_bytes());
    out
}

fn parse_uncompressed_point(raw: &[u8]) -> Option<[u8; PUBLIC_KEY_LEN]> {
    let point: [u8; PUBLIC_KEY_LEN] = raw.try_into().ok()?;
    (point[0] == 0x04).then_some(point)
}

/// Origin of a push endpoint, used as the JWT audience.
///
/// Scheme and host, plus the port only when it is not the scheme default.
pub fn audience(endpoint: &str) -> Result<String> {
    let url = Url::parse(endpoint)
        .map_err(|e| PushError::InvalidSubscription(format!("endpoint {}: {}", endpoint, e)))?;
    let host = url.host_str().ok_or_else(|| {
        PushError::InvalidSubscription(format!("endpoint {} has no host", endpoint))
    })?;

    Ok(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

#[derive(Serialize)]
struct JwtHeader {
    typ: &'static str,
    alg: &'static str,
}

#[derive(Serialize)]
struct VapidClaims<'a> {
    aud: &'a str,
    exp: i64,
    sub: &'a str,
}

struct CachedToken {
    token: String,
    expires_at: i64,
}

/// Builds `Authorization` headers for push requests.
///
/// Tokens are cached per audience and re-signed shortly before they expire.
pub struct VapidAuthenticator {
    keys: VapidKeys,
    subject: String,
    token_ttl: Duration,
    tokens: RwLock<HashMap<String, CachedToken>>,
}

impl VapidAuthenticator {
    /// Create an authenticator with the default 12 hour token lifetime.
    pub fn new(keys: VapidKeys, subject: impl Into<String>) -> Self {
        Self {
            keys,
            subject: subject.into(),
            token_ttl: DEFAULT_TOKEN_TTL,
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Set the token lifetime. RFC 8292 caps it at 24 hours.
    pub fn token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// The key pair in use.
    pub fn keys(&self) -> &VapidKeys {
        &self.keys
    }

    /// The contact URI sent as `sub`.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Build `vapid t=<jwt>, k=<public key>` for an endpoint.
    pub fn build_auth_header(&self, endpoint: &str) -> Result<String> {
        let aud = audience(endpoint)?;
        let token = self.token_for(&aud)?;
        Ok(format!(
            "vapid t={}, k={}",
            token,
            self.keys.public_key_base64url()
        ))
    }

    fn token_for(&self, aud: &str) -> Result<String> {
        let now = Utc::now().timestamp();

        if let Ok(tokens) = self.tokens.read() {
            if let Some(cached) = tokens.get(aud) {
                if cached.expires_at - REFRESH_MARGIN_SECS > now {
                    return Ok(cached.token.clone());
                }
            }
        }

        let expires_at = now + self.token_ttl.as_secs() as i64;
        let token = self.sign_token(aud, expires_at)?;
        debug!(audience = %aud, expires_at, "Signed VAPID token");

        if let Ok(mut tokens) = self.tokens.write() {
            tokens.insert(
                aud.to_string(),
                CachedToken {
                    token: token.clone(),
                    expires_at,
                },
            );
        }

        Ok(token)
    }

    /// Sign a compact ES256 JWT for an audience.
    pub fn sign_token(&self, aud: &str, expires_at: i64) -> Result<String> {
        let header = serde_json::to_vec(&JwtHeader {
            typ: "JWT",
            alg: "ES256",
        })?;
        let claims = serde_json::to_vec(&VapidClaims {
            aud,
            exp: expires_at,
            sub: &self.subject,
        })?;

        let signing_input = format!(
            "{}.{}",
            base64url_encode(&header),
            base64url_encode(&claims)
        );
        let signature = self.keys.sign(signing_input.as_bytes())?;

        Ok(format!("{}.{}", signing_input, base64url_encode(&signature)))
    }
}

impl std::fmt::Debug for VapidAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VapidAuthenticator")
            .field("keys", &self.keys)
            .field("subject", &self.subject)
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}
