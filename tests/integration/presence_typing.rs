//! Integration tests for typing presence.
//!
//! Time is driven explicitly: keystrokes and ticks carry an `Instant`, so the
//! idle window can be crossed without sleeping.

use std::time::{Duration, Instant};

use duochat::chat::ChatClient;
use duochat::chat::presence::DEFAULT_TYPING_IDLE;
use duochat_proto::event::{ClientEvent, ServerEvent, TypingNotice, TypingUpdate};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const IDLE: Duration = Duration::from_millis(500);

fn in_room() -> (ChatClient, mpsc::Receiver<ClientEvent>) {
    let (tx, mut rx) = mpsc::channel(64);
    let mut client = ChatClient::new(tx, IDLE);
    client.set_display_name("Ada").unwrap();
    client.create_room().unwrap();
    client.handle_server_event(ServerEvent::RoomCreated("R1".into()));
    while rx.try_recv().is_ok() {}
    (client, rx)
}

fn typing_events(rx: &mut mpsc::Receiver<ClientEvent>) -> Vec<bool> {
    std::iter::from_fn(|| rx.try_recv().ok())
        .filter_map(|event| match event {
            ClientEvent::Typing(TypingUpdate { is_typing, .. }) => Some(is_typing),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn burst_signals_start_once_and_stop_after_idle() {
    let (mut client, mut rx) = in_room();
    let t0 = Instant::now();

    for i in 0..5 {
        client.input_changed(t0 + Duration::from_millis(100 * i));
    }
    assert_eq!(typing_events(&mut rx), vec![true]);

    // Last keystroke at +400ms; deadline is +900ms.
    client.tick(t0 + Duration::from_millis(800));
    assert!(typing_events(&mut rx).is_empty());
    assert_eq!(
        client.next_deadline(),
        Some(t0 + Duration::from_millis(400) + IDLE)
    );

    client.tick(t0 + Duration::from_millis(900));
    assert_eq!(typing_events(&mut rx), vec![false]);
    assert_eq!(client.next_deadline(), None);

    client.tick(t0 + Duration::from_secs(5));
    assert!(typing_events(&mut rx).is_empty());
}

#[test]
fn new_burst_after_stop_signals_again() {
    let (mut client, mut rx) = in_room();
    let t0 = Instant::now();
    client.input_changed(t0);
    client.tick(t0 + IDLE);
    client.input_changed(t0 + IDLE * 2);
    assert_eq!(typing_events(&mut rx), vec![true, false, true]);
}

#[test]
fn sending_stops_typing_immediately() {
    let (mut client, mut rx) = in_room();
    let t0 = Instant::now();
    client.input_changed(t0);
    client.send_text("done").unwrap();

    let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert!(matches!(events[0], ClientEvent::Typing(TypingUpdate { is_typing: true, .. })));
    assert!(matches!(events[1], ClientEvent::ChatMessage(_)));
    assert_eq!(
        events[2],
        ClientEvent::Typing(TypingUpdate {
            room_id: "R1".into(),
            is_typing: false,
        })
    );
    assert_eq!(client.next_deadline(), None);

    // The cancelled deadline does not fire a second stop.
    client.tick(t0 + IDLE * 4);
    assert!(typing_events(&mut rx).is_empty());
}

#[test]
fn no_typing_signals_outside_a_room() {
    let (tx, mut rx) = mpsc::channel(8);
    let mut client = ChatClient::new(tx, DEFAULT_TYPING_IDLE);
    client.set_display_name("Ada").unwrap();
    client.input_changed(Instant::now());
    assert!(rx.try_recv().is_err());
}

#[test]
fn remote_typing_label_follows_notices() {
    let (mut client, _rx) = in_room();
    client.handle_server_event(ServerEvent::Typing(TypingNotice {
        sender_name: "Bob".into(),
        is_typing: true,
    }));
    assert_eq!(client.presence().remote_label(), "Bob is typing...");

    client.handle_server_event(ServerEvent::Typing(TypingNotice {
        sender_name: "Cy".into(),
        is_typing: true,
    }));
    assert_eq!(client.presence().remote_label(), "Cy is typing...");

    client.handle_server_event(ServerEvent::Typing(TypingNotice {
        sender_name: "Cy".into(),
        is_typing: false,
    }));
    assert_eq!(client.presence().remote_label(), "");
}
