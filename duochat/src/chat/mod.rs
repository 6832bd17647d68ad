//! Client-side chat state.
//!
//! [`ChatClient`] owns the session, the ledger, typing presence, read
//! receipts and upload bookkeeping. It does no I/O: outbound events go into
//! a bounded channel drained by the network task, inbound events arrive via
//! [`ChatClient::handle_server_event`], and time is passed in explicitly.

pub mod ledger;
pub mod presence;
pub mod receipts;
pub mod session;
pub mod upload;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use duochat_proto::event::{
    ClientEvent, FileShared, IncomingChat, MessageSeen, OutgoingChat, RoomKind, ServerEvent,
    TypingUpdate,
};
use tokio::sync::mpsc;

use self::ledger::{
    Direction, EntryId, EntryStatus, FileMeta, Ledger, LedgerEntry, LedgerError, NoticeLevel,
    Reconciled, LOCAL_SENDER,
};
use self::presence::PresenceSignaler;
use self::receipts::ReceiptTracker;
use self::session::{JoinRejection, RoomRequest, Session, SessionError, SessionState};
use self::upload::{UploadJob, UploadOrchestrator};

/// Errors for send actions refused locally.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The session does not allow the action.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The message was empty after trimming.
    #[error("message cannot be empty")]
    EmptyMessage,

    /// The transport has not assigned an identifier yet.
    #[error("not connected to the server")]
    NotConnected,

    /// No files were selected.
    #[error("no files selected")]
    NoFiles,

    /// The ledger refused the entry.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Sans-IO chat client.
#[derive(Debug)]
pub struct ChatClient {
    session: Session,
    ledger: Ledger,
    presence: PresenceSignaler,
    receipts: ReceiptTracker,
    uploads: UploadOrchestrator,
    local_id: Option<String>,
    outbound: mpsc::Sender<ClientEvent>,
}

impl ChatClient {
    /// Create a client that emits into `outbound`.
    #[must_use]
    pub fn new(outbound: mpsc::Sender<ClientEvent>, typing_idle: Duration) -> Self {
        Self {
            session: Session::new(),
            ledger: Ledger::new(),
            presence: PresenceSignaler::new(typing_idle),
            receipts: ReceiptTracker::new(),
            uploads: UploadOrchestrator::new(),
            local_id: None,
            outbound,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Session identity and room state.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Entries of the active room.
    #[must_use]
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Typing state.
    #[must_use]
    pub const fn presence(&self) -> &PresenceSignaler {
        &self.presence
    }

    /// Read-receipt registrations.
    #[must_use]
    pub const fn receipts(&self) -> &ReceiptTracker {
        &self.receipts
    }

    /// Upload bookkeeping.
    #[must_use]
    pub const fn uploads(&self) -> &UploadOrchestrator {
        &self.uploads
    }

    /// Transport-assigned identifier, once connected.
    #[must_use]
    pub fn local_id(&self) -> Option<&str> {
        self.local_id.as_deref()
    }

    /// When [`ChatClient::tick`] next has work to do.
    #[must_use]
    pub const fn next_deadline(&self) -> Option<Instant> {
        self.presence.deadline()
    }

    /// Record the transport-assigned identifier.
    pub fn set_local_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        tracing::debug!(local_id = %id, "transport identifier assigned");
        self.local_id = Some(id);
    }

    // -----------------------------------------------------------------------
    // Session actions
    // -----------------------------------------------------------------------

    /// Accept a display name.
    ///
    /// # Errors
    ///
    /// See [`Session::set_display_name`].
    pub fn set_display_name(&mut self, input: &str) -> Result<(), SessionError> {
        self.session.set_display_name(input)
    }

    /// Ask the server for a new room.
    ///
    /// # Errors
    ///
    /// See [`Session::request_room`].
    pub fn create_room(&mut self) -> Result<(), SessionError> {
        let event = self.session.request_room(RoomRequest::Create)?;
        self.emit(event);
        Ok(())
    }

    /// Join a room by code, optionally asking for a kind.
    ///
    /// # Errors
    ///
    /// See [`Session::request_room`].
    pub fn join_room(&mut self, code: &str, kind: Option<RoomKind>) -> Result<(), SessionError> {
        let event = self.session.request_room(RoomRequest::Join {
            code: code.to_string(),
            kind,
        })?;
        self.emit(event);
        Ok(())
    }

    /// Hide the join error message.
    pub fn dismiss_join_error(&mut self) {
        self.session.dismiss_rejection();
    }

    // -----------------------------------------------------------------------
    // Room actions
    // -----------------------------------------------------------------------

    /// Send a text message.
    ///
    /// The entry is appended as sent and confirmed right away. If the event
    /// cannot be handed to the transport the entry is marked failed.
    /// Sending always emits `typing=false` and cancels the idle deadline.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Session`] outside a room and
    /// [`SendError::EmptyMessage`] for blank input. Neither emits anything.
    pub fn send_text(&mut self, input: &str) -> Result<EntryId, SendError> {
        let room_id = self.session.require_room()?.to_string();
        let text = input.trim();
        if text.is_empty() {
            return Err(SendError::EmptyMessage);
        }

        let id = EntryId::outbound();
        self.ledger.append(LedgerEntry::sent_text(id.clone(), text))?;

        let delivered = self.emit(ClientEvent::ChatMessage(OutgoingChat {
            room_id: room_id.clone(),
            message: text.to_string(),
            message_id: id.to_string(),
        }));
        if !delivered {
            self.ledger.set_status(&id, EntryStatus::Failed);
        }

        self.presence.message_sent();
        self.emit(ClientEvent::Typing(TypingUpdate {
            room_id,
            is_typing: false,
        }));
        Ok(id)
    }

    /// Record a change to the composer input.
    ///
    /// Emits `typing=true` at the start of a burst. Ignored outside a room.
    pub fn input_changed(&mut self, now: Instant) {
        let Ok(room_id) = self.session.require_room() else {
            return;
        };
        let room_id = room_id.to_string();
        if let Some(is_typing) = self.presence.input_changed(now) {
            self.emit(ClientEvent::Typing(TypingUpdate { room_id, is_typing }));
        }
    }

    /// Fire due timers. Emits `typing=false` once the idle window passed.
    pub fn tick(&mut self, now: Instant) {
        if let Some(is_typing) = self.presence.poll(now) {
            if let Ok(room_id) = self.session.require_room() {
                let room_id = room_id.to_string();
                self.emit(ClientEvent::Typing(TypingUpdate { room_id, is_typing }));
            }
        }
    }

    /// Report how much of an entry is on screen.
    ///
    /// The first report at or above the visibility threshold for a received
    /// entry emits `message-seen` and marks the entry seen. Returns whether
    /// that happened; if the event could not be queued the entry stays
    /// watched.
    pub fn entry_visible(&mut self, id: &EntryId, fraction: f32) -> bool {
        let Ok(room_id) = self.session.require_room() else {
            return false;
        };
        if !self.receipts.observe(id, fraction) {
            return false;
        }
        let room_id = room_id.to_string();
        self.ledger.mark_seen(id);
        let sent = self.emit(ClientEvent::MessageSeen(MessageSeen {
            room_id,
            message_id: id.to_string(),
        }));
        if !sent {
            self.unsee(id);
        }
        sent
    }

    /// Start uploads for the selected files.
    ///
    /// Appends one pending placeholder per file, in selection order, and
    /// returns the jobs for the network task to run.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Session`] outside a room,
    /// [`SendError::NotConnected`] before the transport assigned an
    /// identifier and [`SendError::NoFiles`] for an empty selection.
    pub fn select_files(&mut self, paths: &[PathBuf]) -> Result<Vec<UploadJob>, SendError> {
        let room_id = self.session.require_room()?.to_string();
        let sender_id = self.local_id.clone().ok_or(SendError::NotConnected)?;
        if paths.is_empty() {
            return Err(SendError::NoFiles);
        }

        let mut jobs = Vec::with_capacity(paths.len());
        for path in paths {
            let (placeholder, job) = self.uploads.begin(path, &room_id, &sender_id);
            self.ledger.append(placeholder)?;
            jobs.push(job);
        }
        Ok(jobs)
    }

    /// Apply a failed upload.
    ///
    /// Removes the placeholder if it is still pending. The error notification
    /// is only shown for a transfer that was still live; a file the server
    /// already confirmed, or an upload a room change discarded, stays quiet.
    pub fn upload_failed(&mut self, temp_id: &EntryId, file_name: &str) {
        let in_flight = self.uploads.finish(temp_id).is_some();
        let pending = self.ledger.get(temp_id).is_some_and(LedgerEntry::is_pending);
        if pending {
            self.ledger.remove(temp_id);
        }
        if !in_flight && !pending {
            tracing::debug!(temp_id = %temp_id, file = file_name, "stale upload failure ignored");
            return;
        }
        tracing::warn!(temp_id = %temp_id, file = file_name, "upload failed");
        self.notify(format!("⚠️ {file_name} upload failed."), NoticeLevel::Error);
    }

    /// Apply an event the transport could not write.
    ///
    /// A lost chat message marks its entry failed. A lost `message-seen`
    /// makes the entry observable again so it is reported on the next draw.
    /// Anything else is dropped.
    pub fn emit_failed(&mut self, event: &ClientEvent) {
        match event {
            ClientEvent::ChatMessage(chat) => {
                let id = EntryId::new(chat.message_id.as_str());
                if self.ledger.set_status(&id, EntryStatus::Failed) {
                    tracing::warn!(message_id = %id, "message not delivered to server");
                }
            }
            ClientEvent::MessageSeen(seen)
                if self.session.room_id() == Some(seen.room_id.as_str()) =>
            {
                let id = EntryId::new(seen.message_id.as_str());
                tracing::debug!(message_id = %id, "seen signal lost, rearming");
                self.unsee(&id);
            }
            _ => {}
        }
    }

    // -----------------------------------------------------------------------
    // Inbound events
    // -----------------------------------------------------------------------

    /// Apply one event from the server.
    pub fn handle_server_event(&mut self, event: ServerEvent) {
        tracing::trace!(event = event.name(), "server event");
        match event {
            ServerEvent::Connected(connected) => self.set_local_id(connected.id),
            ServerEvent::RoomCreated(room_id) | ServerEvent::JoinSuccess(room_id) => {
                self.enter_room(&room_id);
            }
            ServerEvent::RoomFull => {
                self.session.reject(JoinRejection::RoomFull);
            }
            ServerEvent::RoomNotFound => {
                self.session.reject(JoinRejection::RoomNotFound);
            }
            ServerEvent::RoomTypeMismatch(mismatch) => {
                self.session.reject(JoinRejection::KindMismatch {
                    existing: mismatch.existing_type,
                    attempted: mismatch.attempted_type,
                });
            }
            ServerEvent::UserJoined(name) => {
                self.room_notice(format!("{name} has joined the chat."));
            }
            ServerEvent::UserLeft(name) => {
                let name = name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| "The other user".to_string());
                self.room_notice(format!("{name} has left the chat."));
            }
            ServerEvent::ChatMessage(chat) => self.chat_received(chat),
            ServerEvent::Typing(notice) => {
                if self.in_room() {
                    self.presence
                        .remote_typing(&notice.sender_name, notice.is_typing);
                }
            }
            ServerEvent::FileShared(shared) => self.file_shared(&shared),
            ServerEvent::ReadReceipt(message_id) => {
                if !self.ledger.mark_acknowledged(&EntryId::new(message_id.as_str())) {
                    tracing::debug!(%message_id, "read receipt for unknown or settled entry");
                }
            }
        }
    }

    fn enter_room(&mut self, room_id: &str) {
        if self.session.enter_room(room_id) {
            self.ledger = Ledger::new();
            self.receipts.clear();
            self.presence.reset();
            self.uploads.clear();
        }
    }

    fn chat_received(&mut self, chat: IncomingChat) {
        if !self.in_room() {
            tracing::debug!(message_id = %chat.message_id, "chat message outside a room");
            return;
        }
        let id = EntryId::new(chat.message_id);
        if self.ledger.contains(&id) {
            tracing::debug!(message_id = %id, "duplicate chat message ignored");
            return;
        }
        let entry = LedgerEntry::received_text(id.clone(), &chat.sender_name, &chat.message);
        if self.ledger.append(entry).is_ok() {
            self.receipts.watch(id);
        }
    }

    fn file_shared(&mut self, shared: &FileShared) {
        if !self.in_room() {
            tracing::debug!(temp_id = %shared.temp_id, "file shared outside a room");
            return;
        }
        let id = EntryId::new(shared.temp_id.as_str());
        self.uploads.finish(&id);

        let own = self.local_id.as_deref() == Some(shared.sender_id.as_str());
        let (sender, direction) = if own {
            (LOCAL_SENDER, Direction::Sent)
        } else {
            (shared.sender_name.as_str(), Direction::Received)
        };
        let entry = LedgerEntry::shared_file(id.clone(), FileMeta::from(shared), sender, direction);

        match self.ledger.reconcile(entry) {
            Reconciled::Replaced | Reconciled::Appended => {
                if direction == Direction::Received {
                    self.receipts.watch(id);
                }
            }
            Reconciled::AlreadyConfirmed => {
                tracing::debug!(temp_id = %id, "duplicate file-shared ignored");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn unsee(&mut self, id: &EntryId) {
        self.receipts.unobserve(id);
        self.ledger.mark_unseen(id);
    }

    fn in_room(&self) -> bool {
        self.session.state() == SessionState::InRoom
    }

    fn room_notice(&mut self, text: String) {
        if self.in_room() {
            self.notify(text, NoticeLevel::Info);
        } else {
            tracing::debug!(%text, "room notice outside a room");
        }
    }

    fn notify(&mut self, text: String, level: NoticeLevel) {
        let entry = LedgerEntry::notification(text, level);
        if let Err(e) = self.ledger.append(entry) {
            tracing::warn!(error = %e, "could not record notification");
        }
    }

    /// Hand an event to the transport. Returns `false` if it was dropped.
    fn emit(&self, event: ClientEvent) -> bool {
        let name = event.name();
        match self.outbound.try_send(event) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(event = name, error = %e, "outbound event dropped");
                false
            }
        }
    }
}
