//! Integration tests for sending and receiving text messages.
//!
//! Two clients share a room; a hand-rolled relay turns each outbound
//! `chat-message` into the broadcast the server would deliver to everyone
//! in the room, the sender included.

use std::time::Duration;

use duochat::chat::ledger::{Direction, EntryBody, EntryStatus, LOCAL_SENDER};
use duochat::chat::{ChatClient, SendError};
use duochat_proto::event::{ClientEvent, IncomingChat, ServerEvent};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Peer {
    client: ChatClient,
    rx: mpsc::Receiver<ClientEvent>,
}

fn peer_in_room(name: &str, room: &str) -> Peer {
    let (tx, mut rx) = mpsc::channel(64);
    let mut client = ChatClient::new(tx, Duration::from_millis(2000));
    client.set_display_name(name).unwrap();
    client.join_room(room, None).unwrap();
    client.handle_server_event(ServerEvent::JoinSuccess(room.into()));
    while rx.try_recv().is_ok() {}
    Peer { client, rx }
}

/// Deliver every queued chat message from `from` to all `peers`.
fn relay(from_name: &str, from: &mut Peer, peers: &mut [&mut Peer]) {
    while let Ok(event) = from.rx.try_recv() {
        if let ClientEvent::ChatMessage(chat) = event {
            let incoming = ServerEvent::ChatMessage(IncomingChat {
                message: chat.message,
                message_id: chat.message_id,
                sender_name: from_name.into(),
            });
            from.client.handle_server_event(incoming.clone());
            for peer in peers.iter_mut() {
                peer.client.handle_server_event(incoming.clone());
            }
        }
    }
}

fn texts(client: &ChatClient) -> Vec<(String, String)> {
    client
        .ledger()
        .iter()
        .filter_map(|entry| match &entry.body {
            EntryBody::Text(text) => Some((entry.sender.clone(), text.clone())),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn message_reaches_the_other_participant() {
    let mut ada = peer_in_room("Ada", "R1");
    let mut bob = peer_in_room("Bob", "R1");

    let id = ada.client.send_text("Hi Bob").unwrap();
    relay("Ada", &mut ada, &mut [&mut bob]);

    let sent = ada.client.ledger().get(&id).unwrap();
    assert_eq!(sent.direction, Direction::Sent);
    assert_eq!(sent.sender, LOCAL_SENDER);
    assert_eq!(sent.status, EntryStatus::Confirmed);

    let received = bob.client.ledger().get(&id).unwrap();
    assert_eq!(received.direction, Direction::Received);
    assert_eq!(received.sender, "Ada");
    assert_eq!(received.body, EntryBody::Text("Hi Bob".into()));
}

#[test]
fn sender_echo_does_not_duplicate() {
    let mut ada = peer_in_room("Ada", "R1");
    let mut bob = peer_in_room("Bob", "R1");

    ada.client.send_text("one").unwrap();
    relay("Ada", &mut ada, &mut [&mut bob]);

    assert_eq!(ada.client.ledger().len(), 1);
    assert_eq!(bob.client.ledger().len(), 1);
}

#[test]
fn order_is_preserved_across_interleaved_senders() {
    let mut ada = peer_in_room("Ada", "R1");
    let mut bob = peer_in_room("Bob", "R1");

    ada.client.send_text("a1").unwrap();
    ada.client.send_text("a2").unwrap();
    relay("Ada", &mut ada, &mut [&mut bob]);
    bob.client.send_text("b1").unwrap();
    relay("Bob", &mut bob, &mut [&mut ada]);
    ada.client.send_text("a3").unwrap();
    relay("Ada", &mut ada, &mut [&mut bob]);

    let expected_bob = vec![
        ("Ada".to_string(), "a1".to_string()),
        ("Ada".to_string(), "a2".to_string()),
        (LOCAL_SENDER.to_string(), "b1".to_string()),
        ("Ada".to_string(), "a3".to_string()),
    ];
    assert_eq!(texts(&bob.client), expected_bob);

    let bodies: Vec<_> = texts(&ada.client).into_iter().map(|(_, t)| t).collect();
    assert_eq!(bodies, vec!["a1", "a2", "b1", "a3"]);
}

#[test]
fn group_broadcast_reaches_every_member() {
    let mut ada = peer_in_room("Ada", "G1");
    let mut bob = peer_in_room("Bob", "G1");
    let mut cy = peer_in_room("Cy", "G1");

    ada.client.send_text("hello all").unwrap();
    relay("Ada", &mut ada, &mut [&mut bob, &mut cy]);

    assert_eq!(texts(&bob.client), vec![("Ada".to_string(), "hello all".to_string())]);
    assert_eq!(texts(&cy.client), vec![("Ada".to_string(), "hello all".to_string())]);
}

#[test]
fn whitespace_is_trimmed_and_blank_refused() {
    let mut ada = peer_in_room("Ada", "R1");
    assert!(matches!(
        ada.client.send_text(" \t "),
        Err(SendError::EmptyMessage)
    ));
    assert!(ada.rx.try_recv().is_err());

    ada.client.send_text("  spaced  ").unwrap();
    let Ok(ClientEvent::ChatMessage(chat)) = ada.rx.try_recv() else {
        panic!("expected chat-message");
    };
    assert_eq!(chat.message, "spaced");
    assert_eq!(chat.room_id, "R1");
}

#[test]
fn message_ids_are_unique() {
    let mut ada = peer_in_room("Ada", "R1");
    let a = ada.client.send_text("x").unwrap();
    let b = ada.client.send_text("x").unwrap();
    assert_ne!(a, b);
    assert!(a.as_str().starts_with("msg-"));
}

#[test]
fn lost_chat_message_is_marked_failed() {
    let mut ada = peer_in_room("Ada", "R1");
    let id = ada.client.send_text("hello").unwrap();
    let Ok(event) = ada.rx.try_recv() else {
        panic!("expected chat-message");
    };

    ada.client.emit_failed(&event);
    assert_eq!(
        ada.client.ledger().get(&id).unwrap().status,
        EntryStatus::Failed
    );
}

#[test]
fn messages_before_joining_are_ignored() {
    let (tx, _rx) = mpsc::channel(8);
    let mut client = ChatClient::new(tx, Duration::from_millis(2000));
    client.set_display_name("Bob").unwrap();
    client.handle_server_event(ServerEvent::ChatMessage(IncomingChat {
        message: "early".into(),
        message_id: "m0".into(),
        sender_name: "Ada".into(),
    }));
    assert!(client.ledger().is_empty());
}
