//! The message ledger for the active room.
//!
//! An ordered, append-only list of [`LedgerEntry`] values with
//! replace-by-id reconciliation. Order is append order and is never
//! re-sorted; at most one entry exists per [`EntryId`].

use std::fmt;

use duochat_proto::event::FileShared;
use uuid::Uuid;

/// Identifier of a ledger entry.
///
/// Outbound identifiers are generated locally from a time-ordered UUID v7
/// and echoed by the server; inbound identifiers are whatever the server
/// sends.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryId(String);

impl EntryId {
    /// Wrap an identifier received from the server.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh identifier for an outbound text message.
    #[must_use]
    pub fn outbound() -> Self {
        Self::with_prefix("msg")
    }

    /// Fresh temporary identifier for an upload placeholder.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::with_prefix("temp")
    }

    /// Fresh identifier for a locally generated notification.
    #[must_use]
    pub fn notice(level: NoticeLevel) -> Self {
        match level {
            NoticeLevel::Info => Self::with_prefix("note"),
            NoticeLevel::Error => Self::with_prefix("err"),
        }
    }

    fn with_prefix(prefix: &str) -> Self {
        Self(format!("{prefix}-{}", Uuid::now_v7().simple()))
    }

    /// Return the string form of this identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntryId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Who authored an entry relative to the local viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Authored locally.
    Sent,
    /// Authored by someone else (or by the system).
    Received,
}

/// Delivery state of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    /// Awaiting upload completion or server echo.
    Pending,
    /// Final.
    Confirmed,
    /// The send or upload did not complete.
    Failed,
}

/// Read state of an entry.
///
/// `Seen` applies to received entries the viewer observed; `Acknowledged`
/// applies to sent entries the peer reported as read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    /// Not observed / not acknowledged yet.
    Unseen,
    /// Observed locally and reported with `message-seen`.
    Seen,
    /// The peer sent a read receipt for this sent entry.
    Acknowledged,
}

/// Metadata of a shared file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    /// Original file name.
    pub name: String,
    /// MIME type reported by the server (empty while uploading).
    pub mime_type: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Server-relative download path (empty while uploading).
    pub remote_path: String,
}

impl From<&FileShared> for FileMeta {
    fn from(shared: &FileShared) -> Self {
        Self {
            name: shared.original_name.clone(),
            mime_type: shared.mime_type.clone(),
            size_bytes: shared.size,
            remote_path: shared.path.clone(),
        }
    }
}

/// Severity of a system notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Membership changes and similar.
    Info,
    /// Failures the user should notice, such as a failed upload.
    Error,
}

/// Payload of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryBody {
    /// A text message.
    Text(String),
    /// A shared file or an upload placeholder.
    File(FileMeta),
    /// A system notification.
    Notification {
        /// Rendered text.
        text: String,
        /// Severity.
        level: NoticeLevel,
    },
}

/// Coarse kind of an entry, derived from its body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// [`EntryBody::Text`]
    Text,
    /// [`EntryBody::File`]
    File,
    /// [`EntryBody::Notification`]
    Notification,
}

/// One rendered conversation item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Unique identifier within the room session.
    pub id: EntryId,
    /// Payload.
    pub body: EntryBody,
    /// Display name of the author (`"You"` for local entries).
    pub sender: String,
    /// Sent or received.
    pub direction: Direction,
    /// Delivery state.
    pub status: EntryStatus,
    /// Read state.
    pub read_state: ReadState,
    /// Local creation time in epoch milliseconds.
    pub timestamp_ms: u64,
}

/// Sender label used for locally authored entries.
pub const LOCAL_SENDER: &str = "You";

impl LedgerEntry {
    fn build(id: EntryId, body: EntryBody, sender: &str, direction: Direction) -> Self {
        Self {
            id,
            body,
            sender: sender.to_string(),
            direction,
            status: EntryStatus::Confirmed,
            read_state: ReadState::Unseen,
            timestamp_ms: now_millis(),
        }
    }

    /// A locally sent text message, rendered as final right away.
    #[must_use]
    pub fn sent_text(id: EntryId, text: &str) -> Self {
        Self::build(id, EntryBody::Text(text.to_string()), LOCAL_SENDER, Direction::Sent)
    }

    /// A text message from another participant.
    #[must_use]
    pub fn received_text(id: EntryId, sender: &str, text: &str) -> Self {
        Self::build(id, EntryBody::Text(text.to_string()), sender, Direction::Received)
    }

    /// An upload-in-progress placeholder.
    #[must_use]
    pub fn upload_placeholder(id: EntryId, file_name: &str, size_bytes: u64) -> Self {
        let meta = FileMeta {
            name: file_name.to_string(),
            mime_type: String::new(),
            size_bytes,
            remote_path: String::new(),
        };
        let mut entry = Self::build(id, EntryBody::File(meta), LOCAL_SENDER, Direction::Sent);
        entry.status = EntryStatus::Pending;
        entry
    }

    /// A confirmed shared file.
    #[must_use]
    pub fn shared_file(id: EntryId, meta: FileMeta, sender: &str, direction: Direction) -> Self {
        Self::build(id, EntryBody::File(meta), sender, direction)
    }

    /// A system notification with a fresh local id.
    #[must_use]
    pub fn notification(text: impl Into<String>, level: NoticeLevel) -> Self {
        let body = EntryBody::Notification {
            text: text.into(),
            level,
        };
        Self::build(EntryId::notice(level), body, "", Direction::Received)
    }

    /// Coarse kind of this entry.
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        match self.body {
            EntryBody::Text(_) => EntryKind::Text,
            EntryBody::File(_) => EntryKind::File,
            EntryBody::Notification { .. } => EntryKind::Notification,
        }
    }

    /// Whether this entry still awaits confirmation.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == EntryStatus::Pending
    }
}

/// Errors returned by ledger mutations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LedgerError {
    /// An entry with this id already exists.
    #[error("ledger already holds an entry with id {0}")]
    DuplicateId(EntryId),
}

/// Result of [`Ledger::reconcile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// A pending entry with the same id was replaced at its position.
    Replaced,
    /// No entry had this id; the confirmed entry was appended.
    Appended,
    /// A non-pending entry already holds this id; nothing changed.
    AlreadyConfirmed,
}

/// Ordered entries for the active room.
#[derive(Debug, Default)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// Create an empty ledger.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in append order.
    pub fn iter(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter()
    }

    /// Entries as a slice, in append order.
    #[must_use]
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Position of the entry with this id.
    #[must_use]
    pub fn position(&self, id: &EntryId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == *id)
    }

    /// Look up an entry by id.
    #[must_use]
    pub fn get(&self, id: &EntryId) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| e.id == *id)
    }

    /// Whether an entry with this id exists.
    #[must_use]
    pub fn contains(&self, id: &EntryId) -> bool {
        self.position(id).is_some()
    }

    /// Append an entry at the tail.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::DuplicateId`] if the id is already present.
    pub fn append(&mut self, entry: LedgerEntry) -> Result<(), LedgerError> {
        if self.contains(&entry.id) {
            return Err(LedgerError::DuplicateId(entry.id));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Reconcile a confirmed entry with a pending one of the same id.
    ///
    /// The pending entry is replaced in place. Without a matching entry the
    /// confirmed one is appended; a second confirmation for an id that is
    /// already confirmed is ignored.
    pub fn reconcile(&mut self, confirmed: LedgerEntry) -> Reconciled {
        match self.position(&confirmed.id) {
            Some(index) if self.entries[index].is_pending() => {
                self.entries[index] = confirmed;
                Reconciled::Replaced
            }
            Some(_) => Reconciled::AlreadyConfirmed,
            None => {
                self.entries.push(confirmed);
                Reconciled::Appended
            }
        }
    }

    /// Remove and return the entry with this id.
    pub fn remove(&mut self, id: &EntryId) -> Option<LedgerEntry> {
        let index = self.position(id)?;
        Some(self.entries.remove(index))
    }

    /// Update the delivery status of an entry. Returns `false` if absent.
    pub fn set_status(&mut self, id: &EntryId, status: EntryStatus) -> bool {
        self.entry_mut(id).map(|e| e.status = status).is_some()
    }

    /// Mark a received entry as seen. Returns `true` only on the transition.
    pub fn mark_seen(&mut self, id: &EntryId) -> bool {
        match self.entry_mut(id) {
            Some(e) if e.direction == Direction::Received && e.read_state == ReadState::Unseen => {
                e.read_state = ReadState::Seen;
                true
            }
            _ => false,
        }
    }

    /// Undo [`mark_seen`](Self::mark_seen) when the seen signal never left.
    pub fn mark_unseen(&mut self, id: &EntryId) -> bool {
        match self.entry_mut(id) {
            Some(e) if e.direction == Direction::Received && e.read_state == ReadState::Seen => {
                e.read_state = ReadState::Unseen;
                true
            }
            _ => false,
        }
    }

    /// Mark a sent entry as read by the peer. Returns `true` only on the
    /// transition; absent or received entries are left alone.
    pub fn mark_acknowledged(&mut self, id: &EntryId) -> bool {
        match self.entry_mut(id) {
            Some(e) if e.direction == Direction::Sent && e.read_state != ReadState::Acknowledged => {
                e.read_state = ReadState::Acknowledged;
                true
            }
            _ => false,
        }
    }

    fn entry_mut(&mut self, id: &EntryId) -> Option<&mut LedgerEntry> {
        self.entries.iter_mut().find(|e| e.id == *id)
    }
}

fn now_millis() -> u64 {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    u64::try_from(millis).unwrap_or(u64::MAX)
}
