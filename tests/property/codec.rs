//! Property-based tests for the JSON frame codec.
//!
//! Uses proptest to verify:
//! 1. Any client event survives encode → decode.
//! 2. Any server event survives encode → decode.
//! 3. Arbitrary text never panics either decoder (returns `Err` gracefully).

use duochat_proto::codec;
use duochat_proto::event::*;
use proptest::prelude::*;

fn arb_text() -> impl Strategy<Value = String> {
    "[^\x00]{0,64}"
}

fn arb_room_kind() -> impl Strategy<Value = Option<RoomKind>> {
    prop_oneof![
        Just(None),
        Just(Some(RoomKind::Private)),
        Just(Some(RoomKind::Group)),
    ]
}

fn arb_client_event() -> impl Strategy<Value = ClientEvent> {
    prop_oneof![
        arb_text().prop_map(|username| ClientEvent::CreateRoom(CreateRoom { username })),
        (arb_text(), arb_text(), arb_room_kind()).prop_map(|(room_id, username, room_type)| {
            ClientEvent::JoinRoom(JoinRoom {
                room_id,
                username,
                room_type,
            })
        }),
        (arb_text(), arb_text(), arb_text()).prop_map(|(room_id, message, message_id)| {
            ClientEvent::ChatMessage(OutgoingChat {
                room_id,
                message,
                message_id,
            })
        }),
        (arb_text(), any::<bool>()).prop_map(|(room_id, is_typing)| {
            ClientEvent::Typing(TypingUpdate { room_id, is_typing })
        }),
        (arb_text(), arb_text()).prop_map(|(room_id, message_id)| {
            ClientEvent::MessageSeen(MessageSeen {
                room_id,
                message_id,
            })
        }),
    ]
}

fn arb_file_shared() -> impl Strategy<Value = FileShared> {
    (
        arb_text(),
        arb_text(),
        arb_text(),
        any::<u64>(),
        arb_text(),
        arb_text(),
        arb_text(),
    )
        .prop_map(
            |(temp_id, original_name, mime_type, size, path, sender_id, sender_name)| FileShared {
                temp_id,
                original_name,
                mime_type,
                size,
                path,
                sender_id,
                sender_name,
            },
        )
}

fn arb_server_event() -> impl Strategy<Value = ServerEvent> {
    prop_oneof![
        arb_text().prop_map(|id| ServerEvent::Connected(Connected { id })),
        arb_text().prop_map(ServerEvent::RoomCreated),
        arb_text().prop_map(ServerEvent::JoinSuccess),
        Just(ServerEvent::RoomFull),
        Just(ServerEvent::RoomNotFound),
        (arb_text(), arb_text()).prop_map(|(existing_type, attempted_type)| {
            ServerEvent::RoomTypeMismatch(RoomTypeMismatch {
                existing_type,
                attempted_type,
            })
        }),
        arb_text().prop_map(ServerEvent::UserJoined),
        proptest::option::of(arb_text()).prop_map(ServerEvent::UserLeft),
        (arb_text(), arb_text(), arb_text()).prop_map(|(message, message_id, sender_name)| {
            ServerEvent::ChatMessage(IncomingChat {
                message,
                message_id,
                sender_name,
            })
        }),
        (arb_text(), any::<bool>()).prop_map(|(sender_name, is_typing)| {
            ServerEvent::Typing(TypingNotice {
                sender_name,
                is_typing,
            })
        }),
        arb_file_shared().prop_map(ServerEvent::FileShared),
        arb_text().prop_map(ServerEvent::ReadReceipt),
    ]
}

proptest! {
    #[test]
    fn client_event_round_trip(event in arb_client_event()) {
        let text = codec::encode_client(&event).unwrap();
        let decoded = codec::decode_client(&text).unwrap();
        prop_assert_eq!(event, decoded);
    }

    #[test]
    fn server_event_round_trip(event in arb_server_event()) {
        let text = codec::encode_server(&event).unwrap();
        let decoded = codec::decode_server(&text).unwrap();
        prop_assert_eq!(event, decoded);
    }

    #[test]
    fn arbitrary_text_never_panics(text in ".{0,256}") {
        let _ = codec::decode_server(&text);
        let _ = codec::decode_client(&text);
    }

    #[test]
    fn every_frame_names_its_event(event in arb_server_event()) {
        let text = codec::encode_server(&event).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        prop_assert_eq!(value["event"].as_str(), Some(event.name()));
    }
}
