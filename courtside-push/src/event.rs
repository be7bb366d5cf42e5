//! Inbound notification events and their mapping to recipients and templates.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::notification::{Notification, Urgency};

/// Notification category, matched against player preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// A session was scheduled.
    NewSession,
    /// A session the player joined is about to start.
    SessionReminder,
    /// A session the player joined changed or was cancelled.
    SessionUpdate,
    /// A game in one of the player's sessions finished.
    GameResult,
    /// Tournament and league events.
    Event,
    /// League-wide announcements.
    Announcement,
    /// Messages addressed to a single player.
    Direct,
}

impl Category {
    /// Stable name used in logs and persisted delivery rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewSession => "new_session",
            Self::SessionReminder => "session_reminder",
            Self::SessionUpdate => "session_update",
            Self::GameResult => "game_result",
            Self::Event => "event",
            Self::Announcement => "announcement",
            Self::Direct => "direct",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who an event is addressed to, before preference filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Every player with a subscription.
    AllPlayers,
    /// Players signed up for a session.
    SessionParticipants(String),
    /// Players registered for an event.
    EventParticipants(String),
    /// One player.
    Player(String),
}

/// What the store is asked to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientQuery {
    /// Category, for preference filtering.
    pub category: Category,
    /// Scope.
    pub audience: Audience,
}

/// Session summary supplied with session events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetails {
    /// Session name.
    pub name: String,
    /// Display date, e.g. "Tue Oct 20".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Display time, e.g. "7:00 PM".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Venue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Finished game supplied with result events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDetails {
    /// First team name.
    pub team_a: String,
    /// Second team name.
    pub team_b: String,
    /// First team score.
    pub score_a: u32,
    /// Second team score.
    pub score_b: u32,
    /// Court label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub court: Option<String>,
}

/// League or tournament event summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetails {
    /// Event name.
    pub name: String,
    /// Display date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Venue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// A request from the rest of the application to notify players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum NotificationEvent {
    /// A new session is open for sign-ups.
    SessionCreated {
        session_id: String,
        session_details: SessionDetails,
    },
    /// A session is starting soon.
    SessionReminder {
        session_id: String,
        session_details: SessionDetails,
    },
    /// A session was cancelled.
    SessionCancelled {
        session_id: String,
        session_details: SessionDetails,
    },
    /// A game result was recorded.
    GameResult {
        session_id: String,
        game_details: GameDetails,
    },
    /// A league or tournament event was announced.
    EventAnnouncement {
        event_id: String,
        event_details: EventDetails,
    },
    /// A registered event is coming up.
    EventReminder {
        event_id: String,
        event_details: EventDetails,
    },
    /// Free-form message to everyone.
    Announcement {
        title: String,
        body: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    /// Free-form message to one player.
    Direct {
        player_id: String,
        title: String,
        body: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    /// Delivery check for one player's devices.
    Test { player_id: String },
}

impl NotificationEvent {
    /// Category and audience for this event.
    pub fn recipient_query(&self) -> RecipientQuery {
        let (category, audience) = match self {
            Self::SessionCreated { .. } => (Category::NewSession, Audience::AllPlayers),
            Self::SessionReminder { session_id, .. } => (
                Category::SessionReminder,
                Audience::SessionParticipants(session_id.clone()),
            ),
            Self::SessionCancelled { session_id, .. } => (
                Category::SessionUpdate,
                Audience::SessionParticipants(session_id.clone()),
            ),
            Self::GameResult { session_id, .. } => (
                Category::GameResult,
                Audience::SessionParticipants(session_id.clone()),
            ),
            Self::EventAnnouncement { .. } => (Category::Event, Audience::AllPlayers),
            Self::EventReminder { event_id, .. } => (
                Category::Event,
                Audience::EventParticipants(event_id.clone()),
            ),
            Self::Announcement { .. } => (Category::Announcement, Audience::AllPlayers),
            Self::Direct { player_id, .. } | Self::Test { player_id } => {
                (Category::Direct, Audience::Player(player_id.clone()))
            }
        };

        RecipientQuery { category, audience }
    }

    /// Category shortcut.
    pub fn category(&self) -> Category {
        self.recipient_query().category
    }

    /// Render the notification shown to players.
    pub fn render(&self) -> Notification {
        match self {
            Self::SessionCreated {
                session_id,
                session_details,
            } => Notification::new(
                format!("New session: {}", session_details.name),
                join_parts(&[
                    session_details.date.as_deref(),
                    session_details.time.as_deref(),
                    session_details.location.as_deref(),
                ])
                .unwrap_or_else(|| "Sign-ups are open.".to_string()),
            )
            .url(format!("/sessions/{}", session_id))
            .tag(format!("session-{}", session_id))
            .data("sessionId", session_id.as_str()),

            Self::SessionReminder {
                session_id,
                session_details,
            } => {
                let when = join_parts(&[
                    session_details.time.as_deref(),
                    session_details.location.as_deref(),
                ]);
                Notification::new(
                    format!("Reminder: {}", session_details.name),
                    match when {
                        Some(when) => format!("Starting soon, {}. Don't forget to check in!", when),
                        None => "Starting soon. Don't forget to check in!".to_string(),
                    },
                )
                .url(format!("/sessions/{}", session_id))
                .tag(format!("session-{}", session_id))
                .data("sessionId", session_id.as_str())
                .urgency(Urgency::High)
            }

            Self::SessionCancelled {
                session_id,
                session_details,
            } => Notification::new(
                format!("Cancelled: {}", session_details.name),
                match session_details.date.as_deref() {
                    Some(date) => format!("The session on {} has been cancelled.", date),
                    None => "This session has been cancelled.".to_string(),
                },
            )
            .url(format!("/sessions/{}", session_id))
            .tag(format!("session-{}", session_id))
            .data("sessionId", session_id.as_str())
            .urgency(Urgency::High),

            Self::GameResult {
                session_id,
                game_details,
            } => {
                let mut body = format!(
                    "{} {} - {} {}",
                    game_details.team_a,
                    game_details.score_a,
                    game_details.score_b,
                    game_details.team_b
                );
                if let Some(court) = &game_details.court {
                    body.push_str(&format!(" ({})", court));
                }
                Notification::new("Game result", body)
                    .url(format!("/sessions/{}", session_id))
                    .data("sessionId", session_id.as_str())
                    .urgency(Urgency::Low)
            }

            Self::EventAnnouncement {
                event_id,
                event_details,
            } => Notification::new(
                format!("New event: {}", event_details.name),
                join_parts(&[
                    event_details.date.as_deref(),
                    event_details.location.as_deref(),
                ])
                .unwrap_or_else(|| "Registration is open.".to_string()),
            )
            .url(format!("/events/{}", event_id))
            .tag(format!("event-{}", event_id))
            .data("eventId", event_id.as_str()),

            Self::EventReminder {
                event_id,
                event_details,
            } => Notification::new(
                format!("Upcoming: {}", event_details.name),
                match event_details.date.as_deref() {
                    Some(date) => format!("{} is on {}.", event_details.name, date),
                    None => format!("{} is coming up.", event_details.name),
                },
            )
            .url(format!("/events/{}", event_id))
            .tag(format!("event-{}", event_id))
            .data("eventId", event_id.as_str()),

            Self::Announcement { title, body, url } => {
                with_url(Notification::new(title.as_str(), body.as_str()), url)
            }

            Self::Direct {
                title, body, url, ..
            } => with_url(Notification::new(title.as_str(), body.as_str()), url)
                .urgency(Urgency::High),

            Self::Test { .. } => Notification::new(
                "Test notification",
                "Push notifications are working on this device.",
            )
            .tag("test"),
        }
    }
}

fn with_url(notification: Notification, url: &Option<String>) -> Notification {
    match url {
        Some(url) => notification.url(url.as_str()),
        None => notification,
    }
}

fn join_parts(parts: &[Option<&str>]) -> Option<String> {
    let present: Vec<&str> = parts
        .iter()
        .flatten()
        .copied()
        .filter(|p| !p.trim().is_empty())
        .collect();
    (!present.is_empty()).then(|| present.join(" · "))
}
