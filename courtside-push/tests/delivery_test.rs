//! Integration tests for courtside-push delivery

use async_trait::async_trait;
use courtside_push::codec::{base64url_decode, base64url_encode};
use courtside_push::*;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config() -> WebPushConfig {
    WebPushConfig::new(
        VapidKeys::generate().private_key_base64url(),
        "mailto:ops@courtside.test",
    )
    .request_timeout(Duration::from_millis(300))
    .max_concurrency(2)
}

/// A subscription whose keys encrypt cleanly.
fn subscription(server: &MockServer, name: &str) -> PushSubscription {
    let device = VapidKeys::generate();
    PushSubscription::new(
        format!("{}/push/{}", server.uri(), name),
        device.public_key_base64url(),
        base64url_encode(&[name.len() as u8; 16]),
    )
}

fn announcement() -> NotificationEvent {
    NotificationEvent::Announcement {
        title: "Courts closed".into(),
        body: "No play tonight".into(),
        url: None,
    }
}

async fn mount(server: &MockServer, name: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(format!("/push/{}", name)))
        .and(header("content-encoding", "aes128gcm"))
        .and(header("content-type", "application/octet-stream"))
        .and(header("ttl", "86400"))
        .and(header("urgency", "normal"))
        .and(header_exists("authorization"))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_partial_failure_is_isolated() {
    let server = MockServer::start().await;
    mount(&server, "gone-a", ResponseTemplate::new(410)).await;
    mount(&server, "gone-b", ResponseTemplate::new(410)).await;
    mount(
        &server,
        "slow",
        ResponseTemplate::new(201).set_delay(Duration::from_secs(3)),
    )
    .await;
    mount(&server, "ok-a", ResponseTemplate::new(201)).await;
    mount(&server, "ok-b", ResponseTemplate::new(201)).await;

    let names = ["gone-a", "ok-a", "slow", "gone-b", "ok-b"];
    let mut snapshot = StoreSnapshot::default();
    for name in names {
        let player = Player::new(name, name.to_uppercase());
        snapshot = snapshot.player(player.subscription(subscription(&server, name)));
    }
    let store = Arc::new(MemoryStore::from_snapshot(snapshot));
    let dispatcher = PushDispatcher::new(config(), store.clone(), store.clone()).unwrap();

    let report = dispatcher.deliver(&announcement()).await.unwrap();

    assert!(report.success);
    assert_eq!(report.sent, 2);
    assert_eq!(report.failed, 3);

    let by_id = |id: &str| {
        report
            .results
            .iter()
            .find(|r| r.recipient_id == id)
            .unwrap()
    };
    assert_eq!(by_id("ok-a").status, DeliveryStatus::Sent);
    assert_eq!(by_id("ok-b").recipient_name, "OK-B");
    assert_eq!(by_id("gone-a").status, DeliveryStatus::Gone);
    assert_eq!(by_id("slow").status, DeliveryStatus::Failed);
    let timeout = by_id("slow").error.clone().unwrap();
    assert!(timeout.starts_with("Operation timed out: "), "{}", timeout);
    assert!(timeout.contains("/push/slow"), "{}", timeout);

    // Only the two gone endpoints were deleted
    for name in names {
        let remaining = store.subscriptions_of(name).await.len();
        let expected = if name.starts_with("gone") { 0 } else { 1 };
        assert_eq!(remaining, expected, "{}", name);
    }

    let entries = store.log_entries().await;
    assert_eq!(entries.len(), 5);
    assert!(entries.iter().all(|e| e.category == Category::Announcement));
    assert!(entries.iter().all(|e| e.title == "Courts closed"));
    let sent: Vec<_> = entries
        .iter()
        .filter(|e| e.status == DeliveryStatus::Sent)
        .collect();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|e| e.sent_at.is_some() && e.error.is_none()));
    assert_eq!(
        entries
            .iter()
            .filter(|e| e.status == DeliveryStatus::Gone)
            .count(),
        2
    );

    // The transport error text reaches the log unchanged
    let slow = entries.iter().find(|e| e.recipient_id == "slow").unwrap();
    assert_eq!(slow.status, DeliveryStatus::Failed);
    assert_eq!(slow.error.as_deref(), Some(timeout.as_str()));
}

#[tokio::test]
async fn test_slow_recipients_do_not_hold_slots() {
    let server = MockServer::start().await;
    let delayed = || ResponseTemplate::new(201).set_delay(Duration::from_millis(1500));
    mount(&server, "slow-1", delayed()).await;
    mount(&server, "fast-1", ResponseTemplate::new(201)).await;
    mount(&server, "fast-2", ResponseTemplate::new(201)).await;
    mount(&server, "fast-3", ResponseTemplate::new(201)).await;
    mount(&server, "slow-2", delayed()).await;

    let names = ["slow-1", "fast-1", "fast-2", "fast-3", "slow-2"];
    let mut snapshot = StoreSnapshot::default();
    for name in names {
        let player = Player::new(name, name).subscription(subscription(&server, name));
        snapshot = snapshot.player(player);
    }
    let store = Arc::new(MemoryStore::from_snapshot(snapshot));
    let config = config().request_timeout(Duration::from_secs(5));
    let dispatcher = PushDispatcher::new(config, store.clone(), store).unwrap();

    let started = std::time::Instant::now();
    let report = dispatcher.deliver(&announcement()).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(report.sent, 5);
    // Both slow sends overlap instead of running back to back
    assert!(elapsed < Duration::from_millis(2500), "took {:?}", elapsed);

    // Results keep resolution order regardless of completion order
    let ids: Vec<&str> = report.results.iter().map(|r| r.recipient_id.as_str()).collect();
    assert_eq!(ids, names);
}

#[tokio::test]
async fn test_request_shape() {
    let server = MockServer::start().await;
    mount(&server, "one", ResponseTemplate::new(201)).await;

    let store = Arc::new(MemoryStore::from_snapshot(
        StoreSnapshot::default()
            .player(Player::new("p1", "Alex").subscription(subscription(&server, "one"))),
    ));
    let dispatcher = PushDispatcher::new(config(), store.clone(), store).unwrap();
    let report = dispatcher.deliver(&announcement()).await.unwrap();
    assert_eq!(report.sent, 1);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];

    // aes128gcm header: salt, rs = 4096, idlen = 65, uncompressed key id
    assert!(request.body.len() > 86);
    assert_eq!(&request.body[16..20], &4096u32.to_be_bytes());
    assert_eq!(request.body[20], 65);
    assert_eq!(request.body[21], 0x04);

    let authorization = request
        .headers
        .get("authorization")
        .unwrap()
        .to_str()
        .unwrap();
    let (token, key) = authorization
        .strip_prefix("vapid t=")
        .unwrap()
        .split_once(", k=")
        .unwrap();
    assert_eq!(key, dispatcher.authenticator().keys().public_key_base64url());

    let parts: Vec<&str> = token.split('.').collect();
    assert_eq!(parts.len(), 3);
    let claims: serde_json::Value =
        serde_json::from_slice(&base64url_decode(parts[1]).unwrap()).unwrap();
    assert_eq!(claims["aud"], server.uri());
    assert_eq!(claims["sub"], "mailto:ops@courtside.test");
    assert_eq!(base64url_decode(parts[2]).unwrap().len(), 64);
}

#[tokio::test]
async fn test_empty_audience_makes_no_requests() {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::from_snapshot(
        StoreSnapshot::default()
            .player(Player::new("p1", "Alex").subscription(subscription(&server, "one")))
            .session("s1", ["p1"]),
    ));
    let dispatcher = PushDispatcher::new(config(), store.clone(), store.clone()).unwrap();

    let event = NotificationEvent::SessionReminder {
        session_id: "unknown".into(),
        session_details: SessionDetails {
            name: "Thursday League".into(),
            ..Default::default()
        },
    };
    let report = dispatcher.deliver(&event).await.unwrap();

    assert_eq!((report.sent, report.failed), (0, 0));
    assert!(report.results.is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
    assert!(store.log_entries().await.is_empty());
}

#[tokio::test]
async fn test_corrupt_keys_fail_alone() {
    let server = MockServer::start().await;
    mount(&server, "good", ResponseTemplate::new(201)).await;

    let mut broken = subscription(&server, "broken");
    broken.keys.p256dh = "not*base64".to_string();

    let store = Arc::new(MemoryStore::from_snapshot(
        StoreSnapshot::default()
            .player(Player::new("bad", "Broken").subscription(broken))
            .player(Player::new("good", "Fine").subscription(subscription(&server, "good"))),
    ));
    let dispatcher = PushDispatcher::new(config(), store.clone(), store.clone()).unwrap();

    let report = dispatcher.deliver(&announcement()).await.unwrap();

    assert_eq!((report.sent, report.failed), (1, 1));
    let bad = &report.results[0];
    assert_eq!(bad.recipient_id, "bad");
    assert!(bad.error.as_deref().unwrap().contains("Invalid subscription"));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);

    // Not gone, so the broken subscription stays
    assert_eq!(store.subscriptions_of("bad").await.len(), 1);
}

#[tokio::test]
async fn test_rejection_keeps_response_text() {
    let server = MockServer::start().await;
    mount(
        &server,
        "busy",
        ResponseTemplate::new(429).set_body_string("slow down"),
    )
    .await;

    let store = Arc::new(MemoryStore::from_snapshot(
        StoreSnapshot::default()
            .player(Player::new("p1", "Alex").subscription(subscription(&server, "busy"))),
    ));
    let dispatcher = PushDispatcher::new(config(), store.clone(), store.clone()).unwrap();

    let report = dispatcher.deliver(&announcement()).await.unwrap();
    let error = report.results[0].error.clone().unwrap();
    assert!(error.contains("HTTP 429"));
    assert!(error.contains("slow down"));

    let entries = store.log_entries().await;
    assert_eq!(entries[0].status, DeliveryStatus::Failed);
    assert_eq!(entries[0].error.as_deref(), Some(error.as_str()));
    assert!(entries[0].sent_at.is_none());
    assert_eq!(store.subscriptions_of("p1").await.len(), 1);
}

#[tokio::test]
async fn test_preferences_filter_recipients() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/push/fan"))
        .and(header("urgency", "low"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::from_snapshot(
        StoreSnapshot::default()
            .player(Player::new("fan", "Fan").subscription(subscription(&server, "fan")))
            .player(
                Player::new("quiet", "Quiet")
                    .subscription(subscription(&server, "quiet"))
                    .preferences(NotificationPreferences::all().without(Category::GameResult)),
            )
            .session("s1", ["fan", "quiet"]),
    ));
    let dispatcher = PushDispatcher::new(config(), store.clone(), store).unwrap();

    let event = NotificationEvent::GameResult {
        session_id: "s1".into(),
        game_details: GameDetails {
            team_a: "Aces".into(),
            team_b: "Diggers".into(),
            score_a: 25,
            score_b: 21,
            court: None,
        },
    };

    let report = dispatcher.deliver(&event).await.unwrap();
    assert_eq!((report.sent, report.failed), (1, 0));
    assert_eq!(report.results[0].recipient_id, "fan");
}

struct UndeletableStore(MemoryStore);

#[async_trait]
impl RecipientStore for UndeletableStore {
    async fn resolve_recipients(&self, query: &RecipientQuery) -> Result<Vec<Recipient>> {
        self.0.resolve_recipients(query).await
    }

    async fn delete_subscriptions(&self, _endpoints: &[String]) -> Result<usize> {
        Err(PushError::Store("database is read-only".to_string()))
    }
}

#[tokio::test]
async fn test_cleanup_failure_does_not_fail_delivery() {
    let server = MockServer::start().await;
    mount(&server, "gone", ResponseTemplate::new(404)).await;

    let store = Arc::new(UndeletableStore(MemoryStore::from_snapshot(
        StoreSnapshot::default()
            .player(Player::new("p1", "Alex").subscription(subscription(&server, "gone"))),
    )));
    let log = Arc::new(MemoryStore::new());
    let dispatcher = PushDispatcher::new(config(), store, log.clone()).unwrap();

    let report = dispatcher.deliver(&announcement()).await.unwrap();

    assert!(report.success);
    assert_eq!(report.results[0].status, DeliveryStatus::Gone);
    assert_eq!(log.log_entries().await.len(), 1);
}

#[tokio::test]
async fn test_send_single_subscription() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/push/direct"))
        .and(header("ttl", "60"))
        .and(header("urgency", "high"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let dispatcher = PushDispatcher::new(config(), store.clone(), store).unwrap();

    let notification = Notification::new("Your match", "Court 3 in 5 minutes")
        .urgency(Urgency::High)
        .ttl(60);
    dispatcher
        .send(&subscription(&server, "direct"), &notification)
        .await
        .unwrap();

    let err = dispatcher
        .send(
            &subscription(&server, "unmatched"),
            &Notification::new("x", "y"),
        )
        .await
        .unwrap_err();
    assert!(err.is_subscription_gone());
}
