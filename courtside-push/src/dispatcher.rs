//! Concurrent fan-out of one notification event to every recipient.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::WebPushConfig;
use crate::encryption::encrypt;
use crate::event::{Category, NotificationEvent};
use crate::notification::Notification;
use crate::store::{DeliveryLog, DeliveryLogEntry, DeliveryStatus, RecipientStore};
use crate::subscription::{PushSubscription, Recipient};
use crate::vapid::VapidAuthenticator;
use crate::wire::build_body;
use crate::{PushError, Result};

/// Longest push-service response body kept in an error message.
const MAX_ERROR_BODY_CHARS: usize = 256;

/// Outcome for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientResult {
    /// Player ID.
    pub recipient_id: String,
    /// Player display name.
    pub recipient_name: String,
    /// Whether the push service accepted the message.
    pub success: bool,
    /// Error detail for unsuccessful attempts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Final state.
    #[serde(skip)]
    pub status: DeliveryStatus,
    /// Subscription endpoint.
    #[serde(skip)]
    pub endpoint: String,
}

/// Aggregate outcome of one delivery call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReport {
    /// The batch ran to completion.
    pub success: bool,
    /// Messages accepted.
    pub sent: usize,
    /// Messages not accepted, including gone subscriptions.
    pub failed: usize,
    /// Per-recipient outcomes in resolution order.
    pub results: Vec<RecipientResult>,
}

impl DeliveryReport {
    fn from_results(results: Vec<RecipientResult>) -> Self {
        let sent = results.iter().filter(|r| r.success).count();
        Self {
            success: true,
            sent,
            failed: results.len() - sent,
            results,
        }
    }

    /// Endpoints the push service reported as gone.
    pub fn gone_endpoints(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|r| r.status == DeliveryStatus::Gone)
            .map(|r| r.endpoint.clone())
            .collect()
    }
}

/// Map a push-service response status to a delivery state.
pub fn classify(status: u16) -> DeliveryStatus {
    match status {
        200 | 201 => DeliveryStatus::Sent,
        404 | 410 => DeliveryStatus::Gone,
        _ => DeliveryStatus::Failed,
    }
}

/// Delivers notification events over Web Push.
pub struct PushDispatcher {
    config: WebPushConfig,
    authenticator: Arc<VapidAuthenticator>,
    http_client: Client,
    store: Arc<dyn RecipientStore>,
    log: Arc<dyn DeliveryLog>,
}

impl PushDispatcher {
    /// Create a dispatcher. Fails on unusable configuration or key material.
    pub fn new(
        config: WebPushConfig,
        store: Arc<dyn RecipientStore>,
        log: Arc<dyn DeliveryLog>,
    ) -> Result<Self> {
        let authenticator = Arc::new(config.authenticator()?);

        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| PushError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            authenticator,
            http_client,
            store,
            log,
        })
    }

    /// The request authenticator.
    pub fn authenticator(&self) -> &VapidAuthenticator {
        &self.authenticator
    }

    /// The active configuration.
    pub fn config(&self) -> &WebPushConfig {
        &self.config
    }

    /// Deliver an event to every eligible recipient.
    ///
    /// Only a failure to resolve recipients fails the call. Every other
    /// problem is confined to the recipient it happened to.
    pub async fn deliver(&self, event: &NotificationEvent) -> Result<DeliveryReport> {
        let query = event.recipient_query();
        let notification = event.render();

        let recipients = self
            .store
            .resolve_recipients(&query)
            .await
            .inspect_err(|e| {
                error!(category = %query.category, error = %e, "Recipient resolution failed")
            })?;

        let recipients: Vec<Recipient> = recipients
            .into_iter()
            .filter(|r| r.accepts(query.category))
            .collect();

        if recipients.is_empty() {
            info!(category = %query.category, "No recipients for notification");
            return Ok(DeliveryReport::from_results(Vec::new()));
        }

        let payload = notification.to_json_bytes()?;
        debug!(
            category = %query.category,
            recipients = recipients.len(),
            payload_bytes = payload.len(),
            "Delivering notification"
        );

        // Completion order, so a slow endpoint never holds a free slot.
        let (notification, payload, category) = (&notification, &payload, query.category);
        let mut indexed: Vec<(usize, RecipientResult)> =
            stream::iter(recipients.into_iter().enumerate())
                .map(|(index, recipient)| async move {
                    let result = self
                        .deliver_one(recipient, notification, payload, category)
                        .await;
                    (index, result)
                })
                .buffer_unordered(self.config.max_concurrency.max(1))
                .collect()
                .await;
        indexed.sort_unstable_by_key(|(index, _)| *index);
        let results: Vec<RecipientResult> =
            indexed.into_iter().map(|(_, result)| result).collect();

        let report = DeliveryReport::from_results(results);

        let gone = report.gone_endpoints();
        if !gone.is_empty() {
            match self.store.delete_subscriptions(&gone).await {
                Ok(removed) => info!(removed, "Removed expired subscriptions"),
                Err(e) => warn!(
                    endpoints = gone.len(),
                    error = %e,
                    "Failed to remove expired subscriptions"
                ),
            }
        }

        info!(
            category = %query.category,
            sent = report.sent,
            failed = report.failed,
            gone = gone.len(),
            "Notification delivery complete"
        );
        Ok(report)
    }

    /// Send a notification to one subscription.
    pub async fn send(
        &self,
        subscription: &PushSubscription,
        notification: &Notification,
    ) -> Result<()> {
        let payload = notification.to_json_bytes()?;
        self.send_payload(subscription, notification, &payload)
            .await
    }

    async fn deliver_one(
        &self,
        recipient: Recipient,
        notification: &Notification,
        payload: &[u8],
        category: Category,
    ) -> RecipientResult {
        let endpoint = recipient.subscription.endpoint.clone();

        let (status, error) = match self
            .send_payload(&recipient.subscription, notification, payload)
            .await
        {
            Ok(()) => (DeliveryStatus::Sent, None),
            Err(e) if e.is_subscription_gone() => {
                debug!(endpoint = %endpoint, "Subscription gone");
                (DeliveryStatus::Gone, Some(e.to_string()))
            }
            Err(e) => {
                warn!(
                    recipient = %recipient.owner_id,
                    endpoint = %endpoint,
                    error = %e,
                    "Push delivery failed"
                );
                (DeliveryStatus::Failed, Some(e.to_string()))
            }
        };

        let entry = DeliveryLogEntry {
            recipient_id: recipient.owner_id.clone(),
            category,
            title: notification.title.clone(),
            body: notification.body.clone(),
            status,
            error: error.clone(),
            sent_at: status.is_success().then(Utc::now),
        };
        if let Err(e) = self.log.record(entry).await {
            warn!(recipient = %recipient.owner_id, error = %e, "Failed to record delivery");
        }

        RecipientResult {
            recipient_id: recipient.owner_id,
            recipient_name: recipient.owner_name,
            success: status.is_success(),
            error,
            status,
            endpoint,
        }
    }

    async fn send_payload(
        &self,
        subscription: &PushSubscription,
        notification: &Notification,
        payload: &[u8],
    ) -> Result<()> {
        let keys = subscription.decode_keys()?;
        let authorization = self
            .authenticator
            .build_auth_header(&subscription.endpoint)?;

        let encrypted = encrypt(payload, &keys.p256dh, &keys.auth)?;
        let body = build_body(
            &encrypted.salt,
            &encrypted.ephemeral_public,
            &encrypted.ciphertext,
        );
        let ttl = notification.ttl.unwrap_or(self.config.default_ttl);

        debug!(
            endpoint = %subscription.endpoint,
            bytes = body.len(),
            ttl,
            "Sending web push message"
        );

        let response = self
            .http_client
            .post(&subscription.endpoint)
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_ENCODING, "aes128gcm")
            .header(CONTENT_TYPE, "application/octet-stream")
            .header("TTL", ttl.to_string())
            .header("Urgency", notification.urgency.header_value())
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        match classify(status) {
            DeliveryStatus::Sent => {
                debug!(endpoint = %subscription.endpoint, status, "Push message accepted");
                Ok(())
            }
            DeliveryStatus::Gone => Err(PushError::SubscriptionGone(status)),
            DeliveryStatus::Failed => {
                let body = response.text().await.unwrap_or_default();
                Err(PushError::Rejected {
                    status,
                    body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
                })
            }
        }
    }
}

impl std::fmt::Debug for PushDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushDispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
