//! Deliver command - run an inbound event against a store snapshot.

use courtside_push::{
    MemoryStore, NotificationEvent, PushDispatcher, StoreSnapshot, WebPushConfig,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::{print_report, read_json};
use crate::error::CliResult;

/// Deliver an event and print the report.
///
/// With `save`, the snapshot is written back so expired subscriptions stay
/// removed.
pub async fn run(
    config: WebPushConfig,
    event_path: &Path,
    store_path: &Path,
    save: bool,
) -> CliResult<()> {
    let event: NotificationEvent = read_json(event_path)?;
    let snapshot: StoreSnapshot = read_json(store_path)?;

    let store = Arc::new(MemoryStore::from_snapshot(snapshot));
    let dispatcher = PushDispatcher::new(config, store.clone(), store.clone())?;

    let report = dispatcher.deliver(&event).await?;
    print_report(&report)?;

    if save {
        let snapshot = store.snapshot().await;
        fs::write(store_path, serde_json::to_string_pretty(&snapshot)?)?;
        info!(path = %store_path.display(), "Saved store snapshot");
    }
    Ok(())
}
