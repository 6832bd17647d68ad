//! Integration tests for naming, creating and joining rooms.
//!
//! Each test drives [`ChatClient`]s directly and plays the server by hand:
//! outbound events are read off the client's channel and answered with the
//! server events a real server would send.

use std::time::Duration;

use duochat::chat::ChatClient;
use duochat::chat::ledger::{EntryBody, NoticeLevel};
use duochat::chat::session::{JoinRejection, SessionError, SessionState};
use duochat_proto::event::{
    ClientEvent, CreateRoom, JoinRoom, RoomKind, RoomTypeMismatch, ServerEvent,
};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn client() -> (ChatClient, mpsc::Receiver<ClientEvent>) {
    let (tx, rx) = mpsc::channel(64);
    (ChatClient::new(tx, Duration::from_millis(2000)), rx)
}

fn named(name: &str) -> (ChatClient, mpsc::Receiver<ClientEvent>) {
    let (mut client, rx) = client();
    client.set_display_name(name).unwrap();
    (client, rx)
}

fn notices(client: &ChatClient) -> Vec<String> {
    client
        .ledger()
        .iter()
        .filter_map(|entry| match &entry.body {
            EntryBody::Notification { text, .. } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn create_then_join_brings_both_into_the_room() {
    let (mut ada, mut ada_rx) = named("Ada");
    let (mut bob, mut bob_rx) = named("Bob");

    ada.create_room().unwrap();
    assert_eq!(
        ada_rx.try_recv().unwrap(),
        ClientEvent::CreateRoom(CreateRoom {
            username: "Ada".into()
        })
    );
    assert_eq!(ada.session().state(), SessionState::AwaitingRoom);
    assert_eq!(ada.session().room_id(), None);

    ada.handle_server_event(ServerEvent::RoomCreated("k3j9x2".into()));
    assert_eq!(ada.session().state(), SessionState::InRoom);
    assert_eq!(ada.session().room_id(), Some("k3j9x2"));

    bob.join_room("k3j9x2", None).unwrap();
    assert_eq!(
        bob_rx.try_recv().unwrap(),
        ClientEvent::JoinRoom(JoinRoom {
            room_id: "k3j9x2".into(),
            username: "Bob".into(),
            room_type: None,
        })
    );
    bob.handle_server_event(ServerEvent::JoinSuccess("k3j9x2".into()));
    ada.handle_server_event(ServerEvent::UserJoined("Bob".into()));

    assert_eq!(bob.session().room_id(), Some("k3j9x2"));
    assert_eq!(notices(&ada), vec!["Bob has joined the chat."]);
    assert!(bob.ledger().is_empty());
}

#[test]
fn private_join_records_kind() {
    let (mut bob, mut rx) = named("Bob");
    bob.join_room("  abc  ", Some(RoomKind::Private)).unwrap();
    let ClientEvent::JoinRoom(join) = rx.try_recv().unwrap() else {
        panic!("expected join-room");
    };
    assert_eq!(join.room_id, "abc");
    assert_eq!(join.room_type, Some(RoomKind::Private));

    bob.handle_server_event(ServerEvent::JoinSuccess("abc".into()));
    assert_eq!(bob.session().room_kind(), Some(RoomKind::Private));
}

#[test]
fn rejections_keep_the_session_awaiting() {
    let cases = [
        (
            ServerEvent::RoomFull,
            "This private room is full (2 people max).",
        ),
        (
            ServerEvent::RoomNotFound,
            "Room not found. Check the code and try again.",
        ),
        (
            ServerEvent::RoomTypeMismatch(RoomTypeMismatch {
                existing_type: "private".into(),
                attempted_type: "group".into(),
            }),
            "Error: This is a private room. You tried to join as group.",
        ),
    ];

    for (event, expected) in cases {
        let (mut bob, _rx) = named("Bob");
        bob.join_room("abc", Some(RoomKind::Group)).unwrap();
        bob.handle_server_event(event);

        assert_eq!(bob.session().state(), SessionState::AwaitingRoom);
        assert_eq!(bob.session().room_id(), None);
        assert_eq!(
            bob.session().rejection().map(ToString::to_string).as_deref(),
            Some(expected)
        );
        assert!(bob.ledger().is_empty());
    }
}

#[test]
fn retry_after_rejection_clears_error() {
    let (mut bob, mut rx) = named("Bob");
    bob.join_room("nope", None).unwrap();
    bob.handle_server_event(ServerEvent::RoomNotFound);
    assert_eq!(bob.session().rejection(), Some(&JoinRejection::RoomNotFound));

    bob.join_room("abc", None).unwrap();
    assert!(bob.session().rejection().is_none());
    bob.handle_server_event(ServerEvent::JoinSuccess("abc".into()));
    assert_eq!(bob.session().room_id(), Some("abc"));

    let sent: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert_eq!(sent.len(), 2);
}

#[test]
fn empty_join_success_uses_attempted_code() {
    let (mut bob, _rx) = named("Bob");
    bob.join_room("abc", None).unwrap();
    bob.handle_server_event(ServerEvent::JoinSuccess(String::new()));
    assert_eq!(bob.session().state(), SessionState::InRoom);
    assert_eq!(bob.session().room_id(), Some("abc"));
}

#[test]
fn room_actions_need_a_name_first() {
    let (mut anon, mut rx) = client();
    assert_eq!(anon.create_room(), Err(SessionError::NoDisplayName));
    assert_eq!(
        anon.join_room("abc", None),
        Err(SessionError::NoDisplayName)
    );
    assert!(rx.try_recv().is_err());
}

#[test]
fn blank_names_and_codes_are_refused() {
    let (mut anon, _rx) = client();
    assert_eq!(anon.set_display_name("   "), Err(SessionError::EmptyName));
    assert_eq!(anon.session().state(), SessionState::Anonymous);

    anon.set_display_name(" Ada ").unwrap();
    assert_eq!(anon.session().display_name(), Some("Ada"));
    assert_eq!(anon.join_room("  ", None), Err(SessionError::EmptyRoomCode));
    assert_eq!(anon.session().state(), SessionState::Named);
}

#[test]
fn name_is_fixed_once_set() {
    let (mut ada, _rx) = named("Ada");
    assert_eq!(ada.set_display_name("Ada"), Ok(()));
    assert_eq!(
        ada.set_display_name("Eve"),
        Err(SessionError::NameAlreadySet("Ada".into()))
    );
}

#[test]
fn room_confirmation_without_request_is_ignored() {
    let (mut ada, _rx) = named("Ada");
    ada.handle_server_event(ServerEvent::RoomCreated("R1".into()));
    ada.handle_server_event(ServerEvent::RoomFull);
    assert_eq!(ada.session().state(), SessionState::Named);
    assert!(ada.session().rejection().is_none());
}

#[test]
fn no_second_room_once_inside() {
    let (mut ada, _rx) = named("Ada");
    ada.create_room().unwrap();
    ada.handle_server_event(ServerEvent::RoomCreated("R1".into()));
    assert_eq!(
        ada.join_room("R2", None),
        Err(SessionError::AlreadyInRoom("R1".into()))
    );
    ada.handle_server_event(ServerEvent::JoinSuccess("R2".into()));
    assert_eq!(ada.session().room_id(), Some("R1"));
}

#[test]
fn departure_notices() {
    let (mut ada, _rx) = named("Ada");
    ada.create_room().unwrap();
    ada.handle_server_event(ServerEvent::RoomCreated("R1".into()));
    ada.handle_server_event(ServerEvent::UserLeft(Some("Bob".into())));
    ada.handle_server_event(ServerEvent::UserLeft(None));

    assert_eq!(
        notices(&ada),
        vec!["Bob has left the chat.", "The other user has left the chat."]
    );
    assert!(ada.ledger().iter().all(|e| matches!(
        e.body,
        EntryBody::Notification {
            level: NoticeLevel::Info,
            ..
        }
    )));
}
