//! Subscription and recipient records.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::codec::base64url_decode;
use crate::encryption::AUTH_SECRET_LEN;
use crate::event::Category;
use crate::vapid::PUBLIC_KEY_LEN;
use crate::{PushError, Result};

/// Browser push subscription, in the shape of `PushSubscription.toJSON()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    /// Endpoint URL.
    pub endpoint: String,
    /// Expiration time (Unix milliseconds), as reported by the browser.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<i64>,
    /// Subscription keys.
    pub keys: SubscriptionKeys,
}

/// Base64url-encoded subscription keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    /// Subscriber's uncompressed P-256 public key.
    pub p256dh: String,
    /// Subscriber's auth secret.
    pub auth: String,
}

/// Subscription keys decoded to their raw form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedKeys {
    /// Uncompressed P-256 point.
    pub p256dh: [u8; PUBLIC_KEY_LEN],
    /// Auth secret.
    pub auth: [u8; AUTH_SECRET_LEN],
}

impl PushSubscription {
    /// Create a new subscription.
    pub fn new(
        endpoint: impl Into<String>,
        p256dh: impl Into<String>,
        auth: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            expiration_time: None,
            keys: SubscriptionKeys {
                p256dh: p256dh.into(),
                auth: auth.into(),
            },
        }
    }

    /// Decode and length-check the stored keys.
    pub fn decode_keys(&self) -> Result<DecodedKeys> {
        let p256dh = base64url_decode(&self.keys.p256dh)?;
        let p256dh: [u8; PUBLIC_KEY_LEN] = p256dh.as_slice().try_into().map_err(|_| {
            PushError::InvalidSubscription(format!(
                "p256dh must be {} bytes, got {}",
                PUBLIC_KEY_LEN,
                p256dh.len()
            ))
        })?;
        if p256dh[0] != 0x04 {
            return Err(PushError::InvalidSubscription(
                "p256dh must be an uncompressed point".to_string(),
            ));
        }

        let auth = base64url_decode(&self.keys.auth)?;
        let auth: [u8; AUTH_SECRET_LEN] = auth.as_slice().try_into().map_err(|_| {
            PushError::InvalidSubscription(format!(
                "auth must be {} bytes, got {}",
                AUTH_SECRET_LEN,
                auth.len()
            ))
        })?;

        Ok(DecodedKeys { p256dh, auth })
    }
}

/// Per-player notification opt-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    /// Master switch.
    pub enabled: bool,
    /// Categories the player has turned off.
    #[serde(default, skip_serializing_if = "HashSet::is_empty")]
    pub disabled_categories: HashSet<Category>,
}

impl NotificationPreferences {
    /// Opted in to everything.
    pub fn all() -> Self {
        Self {
            enabled: true,
            disabled_categories: HashSet::new(),
        }
    }

    /// Opted out entirely.
    pub fn none() -> Self {
        Self {
            enabled: false,
            disabled_categories: HashSet::new(),
        }
    }

    /// Turn off one category.
    pub fn without(mut self, category: Category) -> Self {
        self.disabled_categories.insert(category);
        self
    }

    /// Check whether this player wants notifications of a category.
    pub fn accepts(&self, category: Category) -> bool {
        self.enabled && !self.disabled_categories.contains(&category)
    }
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self::all()
    }
}

/// One subscribed device of one player, as resolved by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    /// Player ID.
    pub owner_id: String,
    /// Player display name.
    pub owner_name: String,
    /// Device subscription.
    pub subscription: PushSubscription,
    /// Player preferences.
    #[serde(default)]
    pub preferences: NotificationPreferences,
}

impl Recipient {
    /// Create a recipient who accepts every category.
    pub fn new(
        owner_id: impl Into<String>,
        owner_name: impl Into<String>,
        subscription: PushSubscription,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            owner_name: owner_name.into(),
            subscription,
            preferences: NotificationPreferences::all(),
        }
    }

    /// Set preferences.
    pub fn preferences(mut self, preferences: NotificationPreferences) -> Self {
        self.preferences = preferences;
        self
    }

    /// Check whether this recipient should get a notification of a category.
    pub fn accepts(&self, category: Category) -> bool {
        self.preferences.accepts(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::base64url_encode;

    fn valid_keys() -> (String, String) {
        let mut point = [7u8; PUBLIC_KEY_LEN];
        point[0] = 0x04;
        (base64url_encode(&point), base64url_encode(&[9u8; 16]))
    }

    #[test]
    fn test_decode_keys() {
        let (p256dh, auth) = valid_keys();
        let sub = PushSubscription::new("https://push.example.com/1", p256dh, auth);
        let keys = sub.decode_keys().unwrap();
        assert_eq!(keys.p256dh[0], 0x04);
        assert_eq!(keys.auth, [9u8; 16]);
    }

    #[test]
    fn test_decode_rejects_wrong_lengths() {
        let (p256dh, auth) = valid_keys();

        let short_auth = PushSubscription::new("https://x", p256dh.clone(), "AAAA");
        assert!(matches!(
            short_auth.decode_keys(),
            Err(PushError::InvalidSubscription(_))
        ));

        let short_key = PushSubscription::new("https://x", "AAAA", auth.clone());
        assert!(short_key.decode_keys().is_err());

        let mut compressed = [7u8; PUBLIC_KEY_LEN];
        compressed[0] = 0x02;
        let wrong_tag = PushSubscription::new("https://x", base64url_encode(&compressed), auth);
        assert!(wrong_tag.decode_keys().is_err());
    }

    #[test]
    fn test_browser_json_shape() {
        let json = r#"{
            "endpoint": "https://fcm.googleapis.com/fcm/send/abc",
            "expirationTime": null,
            "keys": {"p256dh": "BPk", "auth": "c2Vj"}
        }"#;
        let sub: PushSubscription = serde_json::from_str(json).unwrap();
        assert_eq!(sub.endpoint, "https://fcm.googleapis.com/fcm/send/abc");
        assert_eq!(sub.expiration_time, None);
        assert_eq!(sub.keys.auth, "c2Vj");
    }

    #[test]
    fn test_preferences() {
        let prefs = NotificationPreferences::all().without(Category::GameResult);
        assert!(prefs.accepts(Category::NewSession));
        assert!(!prefs.accepts(Category::GameResult));
        assert!(!NotificationPreferences::none().accepts(Category::Direct));
    }

    #[test]
    fn test_recipient_defaults_to_opted_in() {
        let json = r#"{
            "ownerId": "p1",
            "ownerName": "Sam",
            "subscription": {"endpoint": "https://x/1", "keys": {"p256dh": "a", "auth": "b"}}
        }"#;
        let recipient: Recipient = serde_json::from_str(json).unwrap();
        assert!(recipient.accepts(Category::Announcement));
    }
}
