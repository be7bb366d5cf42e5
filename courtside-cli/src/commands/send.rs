//! Send command - push one direct notification to one subscription.

use courtside_push::{
    MemoryStore, NotificationEvent, PushDispatcher, PushSubscription, WebPushConfig,
};
use std::path::Path;
use std::sync::Arc;

use super::{print_report, read_json};
use crate::error::{CliError, CliResult};

const CLI_PLAYER_ID: &str = "cli";

/// Options for a single send.
pub struct SendOptions<'a> {
    /// Subscription JSON file, as produced by `PushSubscription.toJSON()`.
    pub subscription: &'a Path,
    /// Notification title.
    pub title: String,
    /// Notification body.
    pub body: String,
    /// Click-through URL.
    pub url: Option<String>,
}

/// Deliver a direct notification and print the report.
pub async fn run(config: WebPushConfig, options: SendOptions<'_>) -> CliResult<()> {
    if options.title.trim().is_empty() {
        return Err(CliError::InvalidArgument("title must not be empty".to_string()));
    }

    let subscription: PushSubscription = read_json(options.subscription)?;
    subscription.decode_keys()?;

    let store = Arc::new(MemoryStore::new());
    store
        .subscribe(CLI_PLAYER_ID, "Command line", subscription)
        .await;

    let dispatcher = PushDispatcher::new(config, store.clone(), store)?;
    let report = dispatcher
        .deliver(&NotificationEvent::Direct {
            player_id: CLI_PLAYER_ID.to_string(),
            title: options.title,
            body: options.body,
            url: options.url,
        })
        .await?;

    print_report(&report)
}
