//! Application state and key handling.
//!
//! [`App`] wraps the [`ChatClient`] with everything the terminal front end
//! needs: the composer input, scroll position, theme and a transient status
//! line. Key presses that need the network return [`NetCommand`]s for the
//! caller to dispatch.

use std::path::PathBuf;
use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use url::Url;

use duochat_proto::event::RoomKind;

use crate::chat::ChatClient;
use crate::chat::ledger::{EntryBody, EntryId, EntryStatus, FileMeta, LedgerEntry};
use crate::chat::session::SessionState;
use crate::chat::upload::resolve_file_url;
use crate::config::prefs::Preferences;
use crate::net::{NetCommand, NetEvent};
use crate::ui::theme::Theme;

/// Which screen is shown, derived from the session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Ask for a display name.
    Name,
    /// Create or join a room.
    Home,
    /// The active room.
    Chat,
}

/// A slash command typed into the composer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/create`
    Create,
    /// `/join <code>`, `/private <code>`, `/group <code>`
    Join {
        /// Room code.
        code: String,
        /// Requested kind.
        kind: Option<RoomKind>,
    },
    /// `/upload <path>...`
    Upload(Vec<PathBuf>),
    /// `/download <n>`
    Download(usize),
    /// `/theme`
    Theme,
    /// `/quit`
    Quit,
    /// Anything else starting with `/`.
    Unknown(String),
}

/// Parse a slash command. Returns `None` for input without a leading `/`.
#[must_use]
pub fn parse_command(input: &str) -> Option<Command> {
    let rest = input.trim().strip_prefix('/')?;
    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let arg = parts.clone().collect::<Vec<_>>().join(" ");

    let command = match name {
        "create" => Command::Create,
        "join" => Command::Join {
            code: arg,
            kind: None,
        },
        "private" => Command::Join {
            code: arg,
            kind: Some(RoomKind::Private),
        },
        "group" => Command::Join {
            code: arg,
            kind: Some(RoomKind::Group),
        },
        "upload" => Command::Upload(parts.map(PathBuf::from).collect()),
        "download" => match arg.parse() {
            Ok(n) => Command::Download(n),
            Err(_) => Command::Unknown(input.trim().to_string()),
        },
        "theme" => Command::Theme,
        "quit" | "exit" => Command::Quit,
        _ => Command::Unknown(input.trim().to_string()),
    };
    Some(command)
}

/// Confirmed shared files in ledger order, numbered from 1.
pub fn shared_files(entries: &[LedgerEntry]) -> impl Iterator<Item = (usize, &LedgerEntry, &FileMeta)> {
    entries
        .iter()
        .filter_map(|entry| match &entry.body {
            EntryBody::File(meta)
                if entry.status == EntryStatus::Confirmed && !meta.remote_path.is_empty() =>
            {
                Some((entry, meta))
            }
            _ => None,
        })
        .enumerate()
        .map(|(i, (entry, meta))| (i + 1, entry, meta))
}

/// Main application state.
pub struct App {
    /// The chat core.
    pub client: ChatClient,
    /// Current text input.
    pub input: String,
    /// Cursor position in input (character index).
    pub cursor_position: usize,
    /// Lines scrolled up from the bottom of the chat.
    pub scroll: usize,
    /// Active color theme.
    pub theme: Theme,
    /// Transient status line.
    pub status: Option<String>,
    /// Whether the server connection is up.
    pub is_connected: bool,
    /// Timestamp display format (chrono).
    pub timestamp_format: String,
    /// Whether the app should quit.
    pub should_quit: bool,
    http_base: Option<Url>,
    prefs_path: Option<PathBuf>,
}

impl App {
    /// Wrap a chat client with default front-end state.
    #[must_use]
    pub fn new(client: ChatClient) -> Self {
        Self {
            client,
            input: String::new(),
            cursor_position: 0,
            scroll: 0,
            theme: Theme::default(),
            status: None,
            is_connected: false,
            timestamp_format: "%H:%M".to_string(),
            should_quit: false,
            http_base: None,
            prefs_path: None,
        }
    }

    /// Start with the given theme.
    #[must_use]
    pub const fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Persist theme changes to this file.
    #[must_use]
    pub fn with_prefs_path(mut self, path: Option<PathBuf>) -> Self {
        self.prefs_path = path;
        self
    }

    /// Base URL for downloads.
    #[must_use]
    pub fn with_http_base(mut self, base: Url) -> Self {
        self.http_base = Some(base);
        self
    }

    /// Timestamp display format.
    #[must_use]
    pub fn with_timestamp_format(mut self, format: &str) -> Self {
        self.timestamp_format = format.to_string();
        self
    }

    /// Put a name into the composer on the name screen.
    pub fn prefill_name(&mut self, name: &str) {
        if self.screen() == Screen::Name {
            self.input = name.to_string();
            self.cursor_position = self.input.chars().count();
        }
    }

    /// Which screen to show.
    #[must_use]
    pub fn screen(&self) -> Screen {
        match self.client.session().state() {
            SessionState::Anonymous => Screen::Name,
            SessionState::Named | SessionState::AwaitingRoom => Screen::Home,
            SessionState::InRoom => Screen::Chat,
        }
    }

    /// Update the connection indicator.
    pub fn set_connection_status(&mut self, connected: bool) {
        if self.is_connected && !connected {
            self.status = Some("Disconnected from server".to_string());
        }
        self.is_connected = connected;
    }

    /// Fire due timers.
    pub fn tick(&mut self, now: Instant) {
        self.client.tick(now);
    }

    /// Feed the renderer's visibility report to the read-receipt tracker.
    pub fn report_visibility(&mut self, report: &[(EntryId, f32)]) {
        for (id, fraction) in report {
            self.client.entry_visible(id, *fraction);
        }
    }

    /// Apply one event from the network tasks.
    pub fn apply_net_event(&mut self, event: NetEvent) {
        match event {
            NetEvent::Server(event) => self.client.handle_server_event(event),
            NetEvent::EmitFailed { event, reason } => {
                self.client.emit_failed(&event);
                self.status = Some(format!("Send failed: {reason}"));
            }
            NetEvent::UploadFailed {
                temp_id, file_name, ..
            } => self.client.upload_failed(&temp_id, &file_name),
            NetEvent::Downloaded { path } => {
                self.status = Some(format!("Saved {}", path.display()));
            }
            NetEvent::DownloadFailed { file_name, reason } => {
                self.status = Some(format!("Could not download {file_name}: {reason}"));
            }
            NetEvent::ConnectionStatus { connected } => self.set_connection_status(connected),
            NetEvent::Error(msg) => {
                self.status = Some(format!("Network error: {msg}"));
            }
        }
    }

    /// Handle a key press. Returns commands for the network tasks.
    pub fn handle_key_event(&mut self, key: KeyEvent, now: Instant) -> Vec<NetCommand> {
        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
                self.should_quit = true;
                return Vec::new();
            }
            (KeyCode::Esc, _) => {
                if self.client.session().rejection().is_some() {
                    self.client.dismiss_join_error();
                } else {
                    self.should_quit = true;
                }
                return Vec::new();
            }
            _ => {}
        }

        match key.code {
            KeyCode::Enter => return self.submit(),
            KeyCode::Char(c) => {
                self.enter_char(c);
                self.composer_changed(now);
            }
            KeyCode::Backspace => {
                if self.delete_char() {
                    self.composer_changed(now);
                }
            }
            KeyCode::Left => self.cursor_position = self.cursor_position.saturating_sub(1),
            KeyCode::Right => {
                self.cursor_position = (self.cursor_position + 1).min(self.input.chars().count());
            }
            KeyCode::Home => self.cursor_position = 0,
            KeyCode::End => self.cursor_position = self.input.chars().count(),
            KeyCode::Up => self.scroll = self.scroll.saturating_add(1),
            KeyCode::Down => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::PageUp => self.scroll = self.scroll.saturating_add(10),
            KeyCode::PageDown => self.scroll = self.scroll.saturating_sub(10),
            _ => {}
        }
        Vec::new()
    }

    fn composer_changed(&mut self, now: Instant) {
        if self.screen() == Screen::Chat && !self.input.starts_with('/') {
            self.client.input_changed(now);
        }
    }

    /// Submit the composer according to the current screen.
    fn submit(&mut self) -> Vec<NetCommand> {
        let input = std::mem::take(&mut self.input);
        self.cursor_position = 0;

        if let Some(command) = parse_command(&input) {
            return self.run_command(command);
        }

        match self.screen() {
            Screen::Name => {
                if let Err(e) = self.client.set_display_name(&input) {
                    tracing::debug!(error = %e, "display name refused");
                    self.restore_input(input);
                }
            }
            Screen::Home => {
                if let Err(e) = self.client.join_room(&input, None) {
                    self.status = Some(e.to_string());
                }
            }
            Screen::Chat => match self.client.send_text(&input) {
                Ok(_) => self.scroll = 0,
                Err(e) => {
                    tracing::debug!(error = %e, "message not sent");
                    self.restore_input(input);
                }
            },
        }
        Vec::new()
    }

    fn run_command(&mut self, command: Command) -> Vec<NetCommand> {
        let result = match command {
            Command::Quit => {
                self.should_quit = true;
                Ok(Vec::new())
            }
            Command::Theme => {
                self.toggle_theme();
                Ok(Vec::new())
            }
            Command::Create => self
                .client
                .create_room()
                .map(|()| Vec::new())
                .map_err(|e| e.to_string()),
            Command::Join { code, kind } => self
                .client
                .join_room(&code, kind)
                .map(|()| Vec::new())
                .map_err(|e| e.to_string()),
            Command::Upload(paths) => self
                .client
                .select_files(&paths)
                .map(|jobs| jobs.into_iter().map(NetCommand::Upload).collect())
                .map_err(|e| e.to_string()),
            Command::Download(n) => self.download(n).map(|cmd| vec![cmd]),
            Command::Unknown(text) => Err(format!("Unknown command: {text}")),
        };
        match result {
            Ok(commands) => {
                self.status = None;
                commands
            }
            Err(message) => {
                self.status = Some(message);
                Vec::new()
            }
        }
    }

    fn download(&self, n: usize) -> Result<NetCommand, String> {
        let base = self
            .http_base
            .as_ref()
            .ok_or_else(|| "Downloads need a server connection".to_string())?;
        let (_, _, meta) = shared_files(self.client.ledger().entries())
            .find(|(number, _, _)| *number == n)
            .ok_or_else(|| format!("No shared file #{n}"))?;
        let url = resolve_file_url(base, &meta.remote_path).map_err(|e| e.to_string())?;
        Ok(NetCommand::Download {
            url,
            file_name: meta.name.clone(),
        })
    }

    fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        let Some(path) = &self.prefs_path else {
            return;
        };
        if let Err(e) = (Preferences { theme: self.theme }).save(path) {
            tracing::warn!(error = %e, "could not save preferences");
        }
    }

    fn restore_input(&mut self, input: String) {
        self.input = input;
        self.cursor_position = self.input.chars().count();
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor_position)
            .map_or(self.input.len(), |(i, _)| i)
    }

    fn enter_char(&mut self, c: char) {
        let index = self.byte_index();
        self.input.insert(index, c);
        self.cursor_position += 1;
    }

    fn delete_char(&mut self) -> bool {
        if self.cursor_position == 0 {
            return false;
        }
        self.cursor_position -= 1;
        let index = self.byte_index();
        self.input.remove(index);
        true
    }
}
