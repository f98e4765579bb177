use std::time::Duration;

use xport_core::FakeClock;

use super::*;
use crate::client::ClientKind;
use crate::message::MessageType;

#[tokio::test]
async fn register_then_broadcast_delivers_to_the_client() {
    let (hub, _handle) = Hub::spawn(FakeClock::new(), Duration::from_secs(30));
    let (id, mut rx) = hub.register_client(ClientKind::Ws).await;

    hub.broadcast_message(MessageType::Status, serde_json::json!({"ok": true})).await;

    let message = rx.recv().await.expect("message");
    assert_eq!(message.message_type, MessageType::Status);

    let snapshot = hub.connected_clients().await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, id);
    hub.stop().await;
}

#[tokio::test]
async fn a_slow_consumer_is_evicted_and_its_channel_closes() {
    let (hub, _handle) = Hub::spawn(FakeClock::new(), Duration::from_secs(30));
    let (draining_id, mut draining_rx) = hub.register_client(ClientKind::Sse).await;
    let (stuck_id, stuck_rx) = hub.register_client(ClientKind::Sse).await;
    // Leave `stuck_rx` unread so its bounded channel fills.

    let drain_handle = tokio::spawn(async move {
        let mut received = 0;
        while received < 100 {
            if draining_rx.recv().await.is_none() {
                break;
            }
            received += 1;
        }
        received
    });

    for i in 0..100u32 {
        hub.broadcast_message(MessageType::LogEntry, serde_json::json!({"i": i})).await;
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    let received = drain_handle.await.expect("join");
    assert_eq!(received, 100);

    // The stuck client's channel capacity (64) was exceeded; it should
    // have been evicted, closing its receiver.
    drop(stuck_rx);
    let snapshot = hub.connected_clients().await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, draining_id);
    assert!(!snapshot.iter().any(|c| c.id == stuck_id));

    hub.stop().await;
}

#[tokio::test]
async fn stop_closes_every_client_channel() {
    let (hub, handle) = Hub::spawn(FakeClock::new(), Duration::from_secs(30));
    let (_id, mut rx) = hub.register_client(ClientKind::Ws).await;

    hub.stop().await;
    assert!(rx.recv().await.is_none());

    handle.await.expect("owner task joins");
}

#[tokio::test]
async fn ping_updates_are_reflected_in_the_snapshot() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_000);
    let (hub, _handle) = Hub::spawn(clock.clone(), Duration::from_secs(30));
    let (id, _rx) = hub.register_client(ClientKind::Ws).await;

    clock.advance(Duration::from_millis(500));
    hub.update_client_ping(id).await;

    let snapshot = hub.connected_clients().await;
    assert_eq!(snapshot[0].last_ping_ms, 1_500);
    hub.stop().await;
}
