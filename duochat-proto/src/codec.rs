//! Frame encoding and decoding for the duochat wire protocol.
//!
//! A frame is a JSON object `{"event": <name>, "data": <payload>}` carried
//! in a single WebSocket text message. Events without a payload omit
//! `data`; a missing `data` decodes as `null`.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::event::{ClientEvent, ServerEvent, names};

/// Error type for frame encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The frame is not a JSON object with an `event` field.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The event name is not part of the protocol.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// The payload does not match the shape the event requires.
    #[error("invalid payload for {event}: {source}")]
    Payload {
        /// Name of the offending event.
        event: String,
        /// Underlying deserialization error.
        source: serde_json::Error,
    },
}

#[derive(Serialize)]
struct OutFrame<'a> {
    event: &'a str,
    #[serde(skip_serializing_if = "Value::is_null")]
    data: Value,
}

#[derive(serde::Deserialize)]
struct InFrame {
    event: String,
    #[serde(default)]
    data: Value,
}

/// Encodes a [`ClientEvent`] into a JSON text frame.
///
/// # Errors
///
/// Returns `CodecError::Malformed` if the payload cannot be serialized.
pub fn encode_client(event: &ClientEvent) -> Result<String, CodecError> {
    let data = match event {
        ClientEvent::CreateRoom(p) => serde_json::to_value(p)?,
        ClientEvent::JoinRoom(p) => serde_json::to_value(p)?,
        ClientEvent::ChatMessage(p) => serde_json::to_value(p)?,
        ClientEvent::Typing(p) => serde_json::to_value(p)?,
        ClientEvent::MessageSeen(p) => serde_json::to_value(p)?,
    };
    write_frame(event.name(), data)
}

/// Decodes a JSON text frame into a [`ClientEvent`].
///
/// # Errors
///
/// Returns [`CodecError`] if the frame is malformed, names an unknown or
/// server-only event, or carries a payload of the wrong shape.
pub fn decode_client(text: &str) -> Result<ClientEvent, CodecError> {
    let InFrame { event, data } = serde_json::from_str(text)?;
    let decoded = match event.as_str() {
        names::CREATE_ROOM => ClientEvent::CreateRoom(payload(&event, data)?),
        names::JOIN_ROOM => ClientEvent::JoinRoom(payload(&event, data)?),
        names::CHAT_MESSAGE => ClientEvent::ChatMessage(payload(&event, data)?),
        names::TYPING => ClientEvent::Typing(payload(&event, data)?),
        names::MESSAGE_SEEN => ClientEvent::MessageSeen(payload(&event, data)?),
        other => return Err(CodecError::UnknownEvent(other.to_string())),
    };
    Ok(decoded)
}

/// Encodes a [`ServerEvent`] into a JSON text frame.
///
/// # Errors
///
/// Returns `CodecError::Malformed` if the payload cannot be serialized.
pub fn encode_server(event: &ServerEvent) -> Result<String, CodecError> {
    let data = match event {
        ServerEvent::Connected(p) => serde_json::to_value(p)?,
        ServerEvent::RoomCreated(id)
        | ServerEvent::JoinSuccess(id)
        | ServerEvent::UserJoined(id)
        | ServerEvent::ReadReceipt(id) => Value::String(id.clone()),
        ServerEvent::RoomFull | ServerEvent::RoomNotFound => Value::Null,
        ServerEvent::RoomTypeMismatch(p) => serde_json::to_value(p)?,
        ServerEvent::UserLeft(name) => name.clone().map_or(Value::Null, Value::String),
        ServerEvent::ChatMessage(p) => serde_json::to_value(p)?,
        ServerEvent::Typing(p) => serde_json::to_value(p)?,
        ServerEvent::FileShared(p) => serde_json::to_value(p)?,
    };
    write_frame(event.name(), data)
}

/// Decodes a JSON text frame into a [`ServerEvent`].
///
/// Payloads of `room-full` and `room-not-found` are ignored.
///
/// # Errors
///
/// Returns [`CodecError`] if the frame is malformed, names an unknown or
/// client-only event, or carries a payload of the wrong shape.
pub fn decode_server(text: &str) -> Result<ServerEvent, CodecError> {
    let InFrame { event, data } = serde_json::from_str(text)?;
    let decoded = match event.as_str() {
        names::CONNECTED => ServerEvent::Connected(payload(&event, data)?),
        names::ROOM_CREATED => ServerEvent::RoomCreated(room_code(&event, data)?),
        names::JOIN_SUCCESS => ServerEvent::JoinSuccess(room_code(&event, data)?),
        names::ROOM_FULL => ServerEvent::RoomFull,
        names::ROOM_NOT_FOUND => ServerEvent::RoomNotFound,
        names::ROOM_TYPE_MISMATCH => ServerEvent::RoomTypeMismatch(payload(&event, data)?),
        names::USER_JOINED => ServerEvent::UserJoined(payload(&event, data)?),
        names::USER_LEFT => ServerEvent::UserLeft(payload(&event, data)?),
        names::CHAT_MESSAGE => ServerEvent::ChatMessage(payload(&event, data)?),
        names::TYPING => ServerEvent::Typing(payload(&event, data)?),
        names::FILE_SHARED => ServerEvent::FileShared(payload(&event, data)?),
        names::READ_RECEIPT => ServerEvent::ReadReceipt(payload(&event, data)?),
        other => return Err(CodecError::UnknownEvent(other.to_string())),
    };
    Ok(decoded)
}

fn write_frame(event: &str, data: Value) -> Result<String, CodecError> {
    Ok(serde_json::to_string(&OutFrame { event, data })?)
}

fn payload<T: DeserializeOwned>(event: &str, data: Value) -> Result<T, CodecError> {
    serde_json::from_value(data).map_err(|source| CodecError::Payload {
        event: event.to_string(),
        source,
    })
}

/// A missing or null room code decodes as empty; the session falls back to
/// the code it asked for.
fn room_code(event: &str, data: Value) -> Result<String, CodecError> {
    Ok(payload::<Option<String>>(event, data)?.unwrap_or_default())
}
