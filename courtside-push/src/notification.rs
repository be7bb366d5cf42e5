//! Notification payload delivered to the service worker.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::Result;

/// Web Push urgency level (RFC 8030 §5.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Urgency {
    /// Very low urgency (device may delay significantly).
    VeryLow,
    /// Low urgency.
    Low,
    /// Normal urgency.
    #[default]
    Normal,
    /// High urgency (deliver immediately).
    High,
}

impl Urgency {
    /// Value for the `Urgency` request header.
    pub fn header_value(&self) -> &'static str {
        match self {
            Self::VeryLow => "very-low",
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

/// Push notification content.
///
/// Serialized to JSON and encrypted as the message body. `urgency` and `ttl`
/// only shape the HTTP request and never reach the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
    /// Icon URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Monochrome badge URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    /// Page opened when the notification is clicked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Tag for notification grouping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Custom data payload.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, String>,
    /// Web Push urgency.
    #[serde(skip)]
    pub urgency: Urgency,
    /// Time to live in seconds, overriding the configured default.
    #[serde(skip)]
    pub ttl: Option<u32>,
}

impl Notification {
    /// Create a new notification.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            icon: None,
            badge: None,
            url: None,
            tag: None,
            data: HashMap::new(),
            urgency: Urgency::Normal,
            ttl: None,
        }
    }

    /// Set the icon URL.
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Set the badge URL.
    pub fn badge(mut self, badge: impl Into<String>) -> Self {
        self.badge = Some(badge.into());
        self
    }

    /// Set the click-through URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the tag for grouping.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Add custom data.
    pub fn data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Set urgency.
    pub fn urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = urgency;
        self
    }

    /// Set time to live.
    pub fn ttl(mut self, seconds: u32) -> Self {
        self.ttl = Some(seconds);
        self
    }

    /// UTF-8 JSON bytes that get encrypted.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl Default for Notification {
    fn default() -> Self {
        Self::new("", "")
    }
}
