//! Named events exchanged with the chat server.
//!
//! Every frame on the wire carries an event name and an optional payload.
//! [`ClientEvent`] covers what the client emits, [`ServerEvent`] covers what
//! it subscribes to. Payload field names follow the server's camelCase
//! convention; the Rust side keeps snake_case.

use serde::{Deserialize, Serialize};

/// Event names as they appear in the `event` field of a frame.
pub mod names {
    /// Request a fresh room (client → server).
    pub const CREATE_ROOM: &str = "create-room";
    /// Join a room by code (client → server).
    pub const JOIN_ROOM: &str = "join-room";
    /// Text message (both directions).
    pub const CHAT_MESSAGE: &str = "chat-message";
    /// Typing indicator (both directions).
    pub const TYPING: &str = "typing";
    /// A received message was observed (client → server).
    pub const MESSAGE_SEEN: &str = "message-seen";
    /// Handshake carrying the transport-assigned identifier (server → client).
    pub const CONNECTED: &str = "connected";
    /// A requested room was created (server → client).
    pub const ROOM_CREATED: &str = "room-created";
    /// A join attempt succeeded (server → client).
    pub const JOIN_SUCCESS: &str = "join-success";
    /// A private room already has two participants (server → client).
    pub const ROOM_FULL: &str = "room-full";
    /// No room with the requested code exists (server → client).
    pub const ROOM_NOT_FOUND: &str = "room-not-found";
    /// The room exists with a different kind (server → client).
    pub const ROOM_TYPE_MISMATCH: &str = "room-type-mismatch";
    /// Another participant entered the room (server → client).
    pub const USER_JOINED: &str = "user-joined";
    /// Another participant left the room (server → client).
    pub const USER_LEFT: &str = "user-left";
    /// An upload finished and was broadcast (server → client).
    pub const FILE_SHARED: &str = "file-shared";
    /// A sent message was read by the peer (server → client).
    pub const READ_RECEIPT: &str = "read-receipt";
}

/// The kind of a room, fixed by whoever joins it first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    /// At most two participants.
    Private,
    /// No participant cap.
    Group,
}

impl RoomKind {
    /// Maximum number of participants, `None` when unbounded.
    #[must_use]
    pub const fn capacity(self) -> Option<usize> {
        match self {
            Self::Private => Some(2),
            Self::Group => None,
        }
    }
}

impl std::fmt::Display for RoomKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Private => write!(f, "private"),
            Self::Group => write!(f, "group"),
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound payloads
// ---------------------------------------------------------------------------

/// Payload of `create-room`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoom {
    /// Display name of the creator.
    pub username: String,
}

/// Payload of `join-room`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoom {
    /// Opaque room code typed by the user.
    pub room_id: String,
    /// Display name of the joiner.
    pub username: String,
    /// Requested room kind; untyped joins omit the field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_type: Option<RoomKind>,
}

/// Payload of an outbound `chat-message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingChat {
    /// Room the message belongs to.
    pub room_id: String,
    /// Message text.
    pub message: String,
    /// Client-generated identifier, echoed back by the server.
    pub message_id: String,
}

/// Payload of an outbound `typing`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingUpdate {
    /// Room the indicator applies to.
    pub room_id: String,
    /// Whether the local user is typing.
    pub is_typing: bool,
}

/// Payload of `message-seen`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSeen {
    /// Room the message belongs to.
    pub room_id: String,
    /// Identifier of the observed message.
    pub message_id: String,
}

/// Events the client emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// `create-room`
    CreateRoom(CreateRoom),
    /// `join-room`
    JoinRoom(JoinRoom),
    /// `chat-message`
    ChatMessage(OutgoingChat),
    /// `typing`
    Typing(TypingUpdate),
    /// `message-seen`
    MessageSeen(MessageSeen),
}

impl ClientEvent {
    /// The wire name of this event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom(_) => names::CREATE_ROOM,
            Self::JoinRoom(_) => names::JOIN_ROOM,
            Self::ChatMessage(_) => names::CHAT_MESSAGE,
            Self::Typing(_) => names::TYPING,
            Self::MessageSeen(_) => names::MESSAGE_SEEN,
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound payloads
// ---------------------------------------------------------------------------

/// Payload of the `connected` handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connected {
    /// Identifier the server assigned to this connection.
    pub id: String,
}

/// Payload of `room-type-mismatch`.
///
/// Kinds are kept as the server sent them so the rejection can be shown
/// verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomTypeMismatch {
    /// Kind the room was created with.
    pub existing_type: String,
    /// Kind the join attempt asked for.
    pub attempted_type: String,
}

/// Payload of an inbound `chat-message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingChat {
    /// Message text.
    pub message: String,
    /// Identifier assigned by the sender.
    pub message_id: String,
    /// Display name of the sender.
    pub sender_name: String,
}

/// Payload of an inbound `typing`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingNotice {
    /// Display name of the remote typist.
    pub sender_name: String,
    /// Whether they are typing.
    pub is_typing: bool,
}

/// Payload of `file-shared`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileShared {
    /// Placeholder identifier supplied with the upload.
    #[serde(rename = "tempId")]
    pub temp_id: String,
    /// File name as uploaded.
    #[serde(rename = "originalname")]
    pub original_name: String,
    /// MIME type detected by the server.
    #[serde(rename = "mimetype")]
    pub mime_type: String,
    /// Size in bytes.
    pub size: u64,
    /// Server-relative download path.
    pub path: String,
    /// Transport identifier of the uploader.
    #[serde(rename = "senderId")]
    pub sender_id: String,
    /// Display name of the uploader.
    #[serde(rename = "senderName")]
    pub sender_name: String,
}

/// Events the client subscribes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// `connected`
    Connected(Connected),
    /// `room-created` with the fresh room id.
    RoomCreated(String),
    /// `join-success` with the joined room id.
    JoinSuccess(String),
    /// `room-full`
    RoomFull,
    /// `room-not-found`
    RoomNotFound,
    /// `room-type-mismatch`
    RoomTypeMismatch(RoomTypeMismatch),
    /// `user-joined` with the newcomer's display name.
    UserJoined(String),
    /// `user-left`, the name may be missing.
    UserLeft(Option<String>),
    /// `chat-message`
    ChatMessage(IncomingChat),
    /// `typing`
    Typing(TypingNotice),
    /// `file-shared`
    FileShared(FileShared),
    /// `read-receipt` with the acknowledged message id.
    ReadReceipt(String),
}

impl ServerEvent {
    /// The wire name of this event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Connected(_) => names::CONNECTED,
            Self::RoomCreated(_) => names::ROOM_CREATED,
            Self::JoinSuccess(_) => names::JOIN_SUCCESS,
            Self::RoomFull => names::ROOM_FULL,
            Self::RoomNotFound => names::ROOM_NOT_FOUND,
            Self::RoomTypeMismatch(_) => names::ROOM_TYPE_MISMATCH,
            Self::UserJoined(_) => names::USER_JOINED,
            Self::UserLeft(_) => names::USER_LEFT,
            Self::ChatMessage(_) => names::CHAT_MESSAGE,
            Self::Typing(_) => names::TYPING,
            Self::FileShared(_) => names::FILE_SHARED,
            Self::ReadReceipt(_) => names::READ_RECEIPT,
        }
    }
}
