use super::pubsub_client::Client;
use crate::broker::message::Message;
use crate::transport::message::ServerMessage;
use tokio::sync::mpsc;

#[test]
fn test_client_new() {
    let (tx, _) = mpsc::unbounded_channel::<ServerMessage>();
    let client = Client::new(tx);
    assert!(client.id.starts_with("client-"));
}

#[test]
fn test_client_ids_are_unique() {
    let (tx, _) = mpsc::unbounded_channel::<ServerMessage>();
    let a = Client::new(tx.clone());
    let b = Client::new(tx);
    assert_ne!(a.id, b.id);
}

#[test]
fn test_send_fails_after_receiver_dropped() {
    let (tx, rx) = mpsc::unbounded_channel::<ServerMessage>();
    let client = Client::new(tx);
    drop(rx);
    assert!(client.send(ServerMessage::ack("id-1")).is_err());
}

#[test]
fn test_registration_delivers_to_client() {
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let client = Client::new(tx);
    let (registration, _released) = client.register();
    assert_eq!(registration.client_id(), &client.id);

    let message = Message::new("hello", Some("id-1".to_string()));
    registration.deliver("news", &message).unwrap();

    match rx.try_recv().unwrap() {
        ServerMessage::Message {
            topic,
            message,
            message_id,
        } => {
            assert_eq!(topic, "news");
            assert_eq!(message, "hello");
            assert_eq!(message_id, "id-1");
        }
        other => panic!("Expected a delivery, got {other:?}"),
    }
}

#[tokio::test]
async fn test_dropping_registration_releases_waiter() {
    let (tx, _rx) = mpsc::unbounded_channel::<ServerMessage>();
    let client = Client::new(tx);
    let (registration, released) = client.register();

    drop(registration);
    let waited = tokio::time::timeout(std::time::Duration::from_secs(1), released).await;
    assert!(waited.is_ok(), "release should fire as soon as the entry is dropped");
}
