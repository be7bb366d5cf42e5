//! # Courtside Push
//!
//! Web Push delivery for the Courtside league app.
//!
//! ## Features
//!
//! - **VAPID**: ES256 request authentication (RFC 8292) with per-origin token caching
//! - **Encryption**: `aes128gcm` message encryption (RFC 8291 / RFC 8188)
//! - **Fan-out**: bounded-concurrency delivery with expired subscription cleanup
//! - **Events**: typed inbound events mapped to recipients and templates
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use courtside_push::{MemoryStore, NotificationEvent, PushDispatcher, WebPushConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = WebPushConfig::from_env()?;
//!     let store = Arc::new(MemoryStore::new());
//!
//!     let dispatcher = PushDispatcher::new(config, store.clone(), store)?;
//!
//!     let report = dispatcher
//!         .deliver(&NotificationEvent::Announcement {
//!             title: "Courts closed".into(),
//!             body: "No play tonight".into(),
//!             url: None,
//!         })
//!         .await?;
//!
//!     println!("sent {} failed {}", report.sent, report.failed);
//!     Ok(())
//! }
//! ```
//!
//! ## Keys
//!
//! ```rust,ignore
//! use courtside_push::VapidKeys;
//!
//! let keys = VapidKeys::generate();
//! println!("COURTSIDE_VAPID_PUBLIC_KEY={}", keys.public_key_base64url());
//! println!("COURTSIDE_VAPID_PRIVATE_KEY={}", keys.private_key_base64url());
//! ```

pub mod codec;
pub mod encryption;
pub mod hkdf;
pub mod vapid;
pub mod wire;

mod config;
mod dispatcher;
mod error;
mod event;
mod notification;
mod store;
mod subscription;

pub use config::WebPushConfig;
pub use dispatcher::{DeliveryReport, PushDispatcher, RecipientResult, classify};
pub use encryption::EncryptedPayload;
pub use error::{PushError, Result};
pub use event::{
    Audience, Category, EventDetails, GameDetails, NotificationEvent, RecipientQuery,
    SessionDetails,
};
pub use notification::{Notification, Urgency};
pub use store::{
    DeliveryLog, DeliveryLogEntry, DeliveryStatus, MemoryStore, Player, RecipientStore,
    StoreSnapshot,
};
pub use subscription::{
    DecodedKeys, NotificationPreferences, PushSubscription, Recipient, SubscriptionKeys,
};
pub use vapid::{VapidAuthenticator, VapidKeys};

/// Prelude for common imports.
///
/// ```
/// use courtside_push::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::WebPushConfig;
    pub use crate::dispatcher::{DeliveryReport, PushDispatcher};
    pub use crate::error::{PushError, Result};
    pub use crate::event::{Category, NotificationEvent};
    pub use crate::notification::{Notification, Urgency};
    pub use crate::store::{DeliveryLog, MemoryStore, RecipientStore};
    pub use crate::subscription::{PushSubscription, Recipient};
    pub use crate::vapid::{VapidAuthenticator, VapidKeys};
}
