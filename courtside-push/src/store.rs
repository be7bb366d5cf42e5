//! Recipient resolution and delivery logging.
//!
//! The relational store lives outside this crate. Delivery only needs the two
//! traits below; [`MemoryStore`] implements both for tests and the CLI.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tokio::sync::RwLock;
use tracing::debug;

use crate::event::{Audience, Category, RecipientQuery};
use crate::subscription::{NotificationPreferences, PushSubscription, Recipient};
use crate::Result;

/// Source of push recipients.
#[async_trait]
pub trait RecipientStore: Send + Sync {
    /// Resolve subscribed devices for a query, filtered by opt-in and category.
    async fn resolve_recipients(&self, query: &RecipientQuery) -> Result<Vec<Recipient>>;

    /// Delete subscriptions by endpoint. Returns how many were removed.
    async fn delete_subscriptions(&self, endpoints: &[String]) -> Result<usize>;
}

/// Sink for per-attempt delivery records.
#[async_trait]
pub trait DeliveryLog: Send + Sync {
    /// Record one delivery attempt.
    async fn record(&self, entry: DeliveryLogEntry) -> Result<()>;
}

/// Final state of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Accepted by the push service.
    Sent,
    /// Rejected, timed out, or never sent.
    Failed,
    /// The push service no longer knows the subscription.
    Gone,
}

impl DeliveryStatus {
    /// Whether the attempt succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// One delivery-log row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryLogEntry {
    /// Player the attempt was for.
    pub recipient_id: String,
    /// Notification category.
    pub category: Category,
    /// Rendered title.
    pub title: String,
    /// Rendered body.
    pub body: String,
    /// Outcome.
    pub status: DeliveryStatus,
    /// Error detail for unsuccessful attempts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Time the push service accepted the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
}

/// A player and their devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Player ID.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Notification preferences.
    #[serde(default)]
    pub preferences: NotificationPreferences,
    /// Subscribed devices.
    #[serde(default)]
    pub subscriptions: Vec<PushSubscription>,
}

impl Player {
    /// Create a player with no devices.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            preferences: NotificationPreferences::all(),
            subscriptions: Vec::new(),
        }
    }

    /// Add a device.
    pub fn subscription(mut self, subscription: PushSubscription) -> Self {
        self.subscriptions.push(subscription);
        self
    }

    /// Set preferences.
    pub fn preferences(mut self, preferences: NotificationPreferences) -> Self {
        self.preferences = preferences;
        self
    }
}

/// Serializable contents of a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    /// Players in insertion order.
    #[serde(default)]
    pub players: Vec<Player>,
    /// Session ID to participating player IDs.
    #[serde(default)]
    pub sessions: HashMap<String, Vec<String>>,
    /// Event ID to registered player IDs.
    #[serde(default)]
    pub events: HashMap<String, Vec<String>>,
}

impl StoreSnapshot {
    /// Add a player.
    pub fn player(mut self, player: Player) -> Self {
        self.players.push(player);
        self
    }

    /// Sign players up for a session.
    pub fn session<I, S>(mut self, session_id: impl Into<String>, player_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sessions
            .entry(session_id.into())
            .or_default()
            .extend(player_ids.into_iter().map(Into::into));
        self
    }

    /// Register players for an event.
    pub fn event<I, S>(mut self, event_id: impl Into<String>, player_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.events
            .entry(event_id.into())
            .or_default()
            .extend(player_ids.into_iter().map(Into::into));
        self
    }

    /// Parse a JSON snapshot.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON snapshot from disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

/// In-memory recipient store and delivery log.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<StoreSnapshot>,
    log: RwLock<Vec<DeliveryLogEntry>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from a snapshot.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            data: RwLock::new(snapshot),
            log: RwLock::new(Vec::new()),
        }
    }

    /// Add or replace a device for a player, creating the player if needed.
    pub async fn subscribe(
        &self,
        player_id: &str,
        player_name: &str,
        subscription: PushSubscription,
    ) {
        let mut data = self.data.write().await;
        let index = match data.players.iter().position(|p| p.id == player_id) {
            Some(index) => index,
            None => {
                data.players.push(Player::new(player_id, player_name));
                data.players.len() - 1
            }
        };

        let player = &mut data.players[index];
        player
            .subscriptions
            .retain(|s| s.endpoint != subscription.endpoint);
        player.subscriptions.push(subscription);
    }

    /// Current devices of a player.
    pub async fn subscriptions_of(&self, player_id: &str) -> Vec<PushSubscription> {
        self.data
            .read()
            .await
            .players
            .iter()
            .find(|p| p.id == player_id)
            .map(|p| p.subscriptions.clone())
            .unwrap_or_default()
    }

    /// All recorded delivery attempts, oldest first.
    pub async fn log_entries(&self) -> Vec<DeliveryLogEntry> {
        self.log.read().await.clone()
    }

    /// Copy of the current contents.
    pub async fn snapshot(&self) -> StoreSnapshot {
        self.data.read().await.clone()
    }
}

#[async_trait]
impl RecipientStore for MemoryStore {
    async fn resolve_recipients(&self, query: &RecipientQuery) -> Result<Vec<Recipient>> {
        let data = self.data.read().await;

        let scope: Option<HashSet<&str>> = match &query.audience {
            Audience::AllPlayers => None,
            Audience::SessionParticipants(id) => Some(participants(&data.sessions, id)),
            Audience::EventParticipants(id) => Some(participants(&data.events, id)),
            Audience::Player(id) => Some(HashSet::from([id.as_str()])),
        };

        let recipients: Vec<Recipient> = data
            .players
            .iter()
            .filter(|p| scope.as_ref().is_none_or(|s| s.contains(p.id.as_str())))
            .filter(|p| p.preferences.accepts(query.category))
            .flat_map(|p| {
                p.subscriptions.iter().map(move |s| {
                    Recipient::new(p.id.as_str(), p.name.as_str(), s.clone())
                        .preferences(p.preferences.clone())
                })
            })
            .collect();

        debug!(
            category = %query.category,
            audience = ?query.audience,
            count = recipients.len(),
            "Resolved recipients"
        );
        Ok(recipients)
    }

    async fn delete_subscriptions(&self, endpoints: &[String]) -> Result<usize> {
        let doomed: HashSet<&str> = endpoints.iter().map(String::as_str).collect();
        let mut data = self.data.write().await;

        let mut removed = 0;
        for player in &mut data.players {
            let before = player.subscriptions.len();
            player
                .subscriptions
                .retain(|s| !doomed.contains(s.endpoint.as_str()));
            removed += before - player.subscriptions.len();
        }

        debug!(removed, "Deleted subscriptions");
        Ok(removed)
    }
}

#[async_trait]
impl DeliveryLog for MemoryStore {
    async fn record(&self, entry: DeliveryLogEntry) -> Result<()> {
        self.log.write().await.push(entry);
        Ok(())
    }
}

fn participants<'a>(table: &'a HashMap<String, Vec<String>>, id: &str) -> HashSet<&'a str> {
    table
        .get(id)
        .map(|ids| ids.iter().map(String::as_str).collect())
        .unwrap_or_default()
}
