//! Session identity and the room join/create state machine.
//!
//! # Lifecycle
//!
//! 1. `Anonymous`: no display name yet
//! 2. `Named`: a non-empty display name was accepted
//! 3. `AwaitingRoom`: a create or join request went out, no answer yet
//! 4. `InRoom`: the server confirmed the room
//!
//! Rejections (`room-full`, `room-not-found`, `room-type-mismatch`) keep the
//! session in `AwaitingRoom` so the user can try again. There is no leave
//! transition.

use duochat_proto::event::{ClientEvent, CreateRoom, JoinRoom, RoomKind};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No display name yet.
    Anonymous,
    /// Display name set, no room requested.
    Named,
    /// A create or join request is outstanding.
    AwaitingRoom,
    /// The server confirmed a room.
    InRoom,
}

/// A room request made by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomRequest {
    /// Ask the server for a fresh room.
    Create,
    /// Join an existing room by code.
    Join {
        /// Opaque room code.
        code: String,
        /// Requested kind, `None` for untyped rooms.
        kind: Option<RoomKind>,
    },
}

/// Why the server turned a join attempt down.
///
/// The `Display` text is what the user sees.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinRejection {
    /// A private room already has two participants.
    #[error("This private room is full (2 people max).")]
    RoomFull,
    /// No room with the requested code exists.
    #[error("Room not found. Check the code and try again.")]
    RoomNotFound,
    /// The room exists with another kind.
    #[error("Error: This is a {existing} room. You tried to join as {attempted}.")]
    KindMismatch {
        /// Kind the room was created with.
        existing: String,
        /// Kind the join attempt asked for.
        attempted: String,
    },
}

/// Errors for session actions refused locally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Display name is empty after trimming.
    #[error("display name cannot be empty")]
    EmptyName,
    /// A different display name was already accepted.
    #[error("display name is already set to '{0}'")]
    NameAlreadySet(String),
    /// Room code is empty after trimming.
    #[error("room code cannot be empty")]
    EmptyRoomCode,
    /// A room was requested before a display name was set.
    #[error("a display name is required first")]
    NoDisplayName,
    /// A room was requested while already in one.
    #[error("already in room {0}")]
    AlreadyInRoom(String),
    /// A room-scoped action was attempted outside a room.
    #[error("not in a room")]
    NotInRoom,
}

/// Identity and room membership for one chat visit.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    display_name: Option<String>,
    room_id: Option<String>,
    room_kind: Option<RoomKind>,
    outstanding: Option<RoomRequest>,
    rejection: Option<JoinRejection>,
}

impl Session {
    /// A fresh, anonymous session.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SessionState::Anonymous,
            display_name: None,
            room_id: None,
            room_kind: None,
            outstanding: None,
            rejection: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Accepted display name, if any.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Confirmed room id, if any.
    #[must_use]
    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    /// Kind the room was joined as; `None` for untyped rooms.
    #[must_use]
    pub const fn room_kind(&self) -> Option<RoomKind> {
        self.room_kind
    }

    /// The request awaiting an answer, if any.
    #[must_use]
    pub const fn outstanding(&self) -> Option<&RoomRequest> {
        self.outstanding.as_ref()
    }

    /// The last rejection, until dismissed or superseded.
    #[must_use]
    pub const fn rejection(&self) -> Option<&JoinRejection> {
        self.rejection.as_ref()
    }

    /// Room id, or [`SessionError::NotInRoom`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotInRoom`] unless the session is `InRoom`.
    pub fn require_room(&self) -> Result<&str, SessionError> {
        match (&self.state, &self.room_id) {
            (SessionState::InRoom, Some(id)) => Ok(id),
            _ => Err(SessionError::NotInRoom),
        }
    }

    /// Accept a display name.
    ///
    /// The input is trimmed. Submitting the same name again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyName`] for blank input and
    /// [`SessionError::NameAlreadySet`] if a different name was accepted
    /// earlier. Neither changes state.
    pub fn set_display_name(&mut self, input: &str) -> Result<(), SessionError> {
        let name = input.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyName);
        }
        match &self.display_name {
            Some(existing) if existing == name => Ok(()),
            Some(existing) => Err(SessionError::NameAlreadySet(existing.clone())),
            None => {
                self.display_name = Some(name.to_string());
                self.state = SessionState::Named;
                tracing::debug!(name, "display name set");
                Ok(())
            }
        }
    }

    /// Record a create or join request and build the event to emit.
    ///
    /// Clears any previous rejection. No room state is set until the server
    /// answers.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoDisplayName`] before a name is set,
    /// [`SessionError::AlreadyInRoom`] once in a room, and
    /// [`SessionError::EmptyRoomCode`] for a blank join code.
    pub fn request_room(&mut self, request: RoomRequest) -> Result<ClientEvent, SessionError> {
        let username = self
            .display_name
            .clone()
            .ok_or(SessionError::NoDisplayName)?;
        if let Some(room) = &self.room_id {
            return Err(SessionError::AlreadyInRoom(room.clone()));
        }

        let (request, event) = match request {
            RoomRequest::Create => (
                RoomRequest::Create,
                ClientEvent::CreateRoom(CreateRoom { username }),
            ),
            RoomRequest::Join { code, kind } => {
                let code = code.trim().to_string();
                if code.is_empty() {
                    return Err(SessionError::EmptyRoomCode);
                }
                let event = ClientEvent::JoinRoom(JoinRoom {
                    room_id: code.clone(),
                    username,
                    room_type: kind,
                });
                (RoomRequest::Join { code, kind }, event)
            }
        };

        self.rejection = None;
        self.outstanding = Some(request);
        self.state = SessionState::AwaitingRoom;
        Ok(event)
    }

    /// Apply a `room-created` / `join-success` answer.
    ///
    /// An empty room id falls back to the code of the outstanding join.
    /// Returns `false` (and changes nothing) outside `AwaitingRoom` or when
    /// no room id can be determined.
    pub fn enter_room(&mut self, room_id: &str) -> bool {
        if self.state != SessionState::AwaitingRoom {
            tracing::debug!(room_id, state = ?self.state, "room confirmation ignored");
            return false;
        }
        let room_id = room_id.trim();
        let (room_id, kind) = match &self.outstanding {
            Some(RoomRequest::Join { code, kind }) if room_id.is_empty() => (code.clone(), *kind),
            Some(RoomRequest::Join { kind, .. }) => (room_id.to_string(), *kind),
            _ => (room_id.to_string(), None),
        };
        if room_id.is_empty() {
            tracing::warn!("room confirmation carried no room id");
            return false;
        }

        tracing::info!(room_id = %room_id, kind = ?kind, "entered room");
        self.room_id = Some(room_id);
        self.room_kind = kind;
        self.outstanding = None;
        self.rejection = None;
        self.state = SessionState::InRoom;
        true
    }

    /// Apply a join rejection. Returns `false` outside `AwaitingRoom`.
    pub fn reject(&mut self, rejection: JoinRejection) -> bool {
        if self.state != SessionState::AwaitingRoom {
            tracing::debug!(%rejection, state = ?self.state, "join rejection ignored");
            return false;
        }
        tracing::info!(%rejection, "join rejected");
        self.rejection = Some(rejection);
        true
    }

    /// Hide the current rejection message.
    pub fn dismiss_rejection(&mut self) {
        self.rejection = None;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
