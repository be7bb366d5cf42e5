//! Push delivery error types.

use thiserror::Error;

/// Result type for push operations.
pub type Result<T> = std::result::Result<T, PushError>;

/// Push delivery errors.
#[derive(Debug, Error)]
pub enum PushError {
    /// Missing or malformed VAPID material, or an unusable setting.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed endpoint URL or stored subscription keys.
    #[error("Invalid subscription: {0}")]
    InvalidSubscription(String),

    /// Key derivation or content encryption failed.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// VAPID token construction or signing failed.
    #[error("Signing error: {0}")]
    Signing(String),

    /// Payload does not fit in a single aes128gcm record.
    #[error("Payload too large: {size} bytes exceeds limit of {limit} bytes")]
    PayloadTooLarge {
        /// Actual size.
        size: usize,
        /// Maximum allowed size.
        limit: usize,
    },

    /// The push service reports the subscription no longer exists (404/410).
    #[error("Subscription gone (HTTP {0})")]
    SubscriptionGone(u16),

    /// The push service rejected the message.
    #[error("Push service rejected message: HTTP {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// Network error.
    #[error("Network error: {0}")]
    Network(String),

    /// The request did not complete within the client timeout.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Recipient store or delivery log failure.
    #[error("Store error: {0}")]
    Store(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PushError {
    /// Check if this error means the subscription should be deleted.
    pub fn is_subscription_gone(&self) -> bool {
        matches!(self, Self::SubscriptionGone(_))
    }

    /// Check if this error aborts a whole delivery call rather than one recipient.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<reqwest::Error> for PushError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for PushError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for PushError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<base64::DecodeError> for PushError {
    fn from(err: base64::DecodeError) -> Self {
        Self::InvalidSubscription(format!("invalid base64url: {}", err))
    }
}
