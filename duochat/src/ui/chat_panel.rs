//! Chat panel rendering (entries, typing line, composer).
//!
//! Every entry is laid out as a run of rows; the panel shows a window of
//! those rows anchored to the bottom and shifted up by `App::scroll`. The
//! visible share of each row run is reported back for read receipts.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use super::theme::{self, Theme};
use super::with_cursor;
use crate::app::{App, shared_files};
use crate::chat::ledger::{
    Direction as EntryDirection, EntryBody, EntryId, EntryStatus, LedgerEntry, NoticeLevel,
    ReadState,
};
use crate::chat::receipts::visible_fraction;
use crate::chat::upload::format_file_size;

/// Placement of one entry in the row space of the message list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Entry id.
    pub id: EntryId,
    /// First row.
    pub top: usize,
    /// Number of rows.
    pub height: usize,
}

/// Render the chat panel. Returns visibility of watched entries.
pub fn render(frame: &mut Frame, area: Rect, app: &App) -> Vec<(EntryId, f32)> {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(area);

    let report = render_entries(frame, chunks[0], app);
    render_typing(frame, chunks[1], app);
    render_input(frame, chunks[2], app);
    report
}

fn render_entries(frame: &mut Frame, area: Rect, app: &App) -> Vec<(EntryId, f32)> {
    let theme = app.theme;
    let session = app.client.session();
    let title = match (session.room_id(), session.room_kind()) {
        (Some(room), Some(kind)) => format!("Room {room} ({kind})"),
        (Some(room), None) => format!("Room {room}"),
        _ => "Chat".to_string(),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(theme.highlighted());

    let inner = block.inner(area);
    let width = usize::from(inner.width.max(1));
    let viewport_height = usize::from(inner.height);

    let entries = app.client.ledger().entries();
    let numbers: Vec<(EntryId, usize)> = shared_files(entries)
        .map(|(n, entry, _)| (entry.id.clone(), n))
        .collect();

    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut placements = Vec::with_capacity(entries.len());
    for entry in entries {
        let number = numbers
            .iter()
            .find(|(id, _)| *id == entry.id)
            .map(|(_, n)| *n);
        let rendered = entry_lines(entry, number, width, &app.timestamp_format, theme);
        placements.push(Placement {
            id: entry.id.clone(),
            top: lines.len(),
            height: rendered.len(),
        });
        lines.extend(rendered);
    }

    let viewport_top = viewport_top(lines.len(), viewport_height, app.scroll);
    let report = visibility(&placements, viewport_top, viewport_height)
        .into_iter()
        .filter(|(id, _)| app.client.receipts().is_watching(id))
        .collect();

    let offset = u16::try_from(viewport_top).unwrap_or(u16::MAX);
    let paragraph = Paragraph::new(lines).block(block).scroll((offset, 0));
    frame.render_widget(paragraph, area);
    report
}

/// First visible row: the bottom of the content minus `scroll` rows,
/// clamped to the top.
#[must_use]
pub fn viewport_top(total_rows: usize, viewport_height: usize, scroll: usize) -> usize {
    total_rows
        .saturating_sub(viewport_height)
        .saturating_sub(scroll)
}

/// Visible fraction of every placement.
#[must_use]
pub fn visibility(
    placements: &[Placement],
    viewport_top: usize,
    viewport_height: usize,
) -> Vec<(EntryId, f32)> {
    placements
        .iter()
        .map(|p| {
            (
                p.id.clone(),
                visible_fraction(p.top, p.height, viewport_top, viewport_height),
            )
        })
        .collect()
}

/// Rows for one entry: a header and the wrapped body, or a single row for
/// notifications.
fn entry_lines(
    entry: &LedgerEntry,
    file_number: Option<usize>,
    width: usize,
    timestamp_format: &str,
    theme: Theme,
) -> Vec<Line<'static>> {
    let body_style = match entry.status {
        EntryStatus::Pending => theme.pending(),
        EntryStatus::Failed => theme.error(),
        EntryStatus::Confirmed => theme.normal(),
    };

    let body = match &entry.body {
        EntryBody::Notification { text, level } => {
            let style = match level {
                NoticeLevel::Info => theme.system_message(),
                NoticeLevel::Error => theme.error(),
            };
            return vec![Line::from(Span::styled(format!("-- {text} --"), style))];
        }
        EntryBody::Text(text) => text.clone(),
        EntryBody::File(meta) if entry.is_pending() => format!("⏳ Uploading {}...", meta.name),
        EntryBody::File(meta) => {
            let number = file_number.map(|n| format!("  [#{n}]")).unwrap_or_default();
            format!(
                "📎 {} ({}){number}",
                meta.name,
                format_file_size(meta.size_bytes)
            )
        }
    };

    let mut header = vec![
        Span::styled(
            entry.sender.clone(),
            Style::default().fg(theme::sender_color(&entry.sender)),
        ),
        Span::raw(" "),
        Span::styled(
            format_timestamp(entry.timestamp_ms, timestamp_format),
            theme.dimmed(),
        ),
    ];
    if entry.direction == EntryDirection::Sent {
        header.push(Span::raw(" "));
        header.push(Span::styled(status_symbol(entry), theme.dimmed()));
    }

    let mut lines = vec![Line::from(header)];
    lines.extend(
        wrap(&body, width.saturating_sub(2).max(1))
            .into_iter()
            .map(|row| Line::from(Span::styled(format!("  {row}"), body_style))),
    );
    lines
}

/// Delivery/read marker for sent entries.
#[must_use]
pub const fn status_symbol(entry: &LedgerEntry) -> &'static str {
    match (entry.status, entry.read_state) {
        (EntryStatus::Pending, _) => "\u{22ef}",
        (EntryStatus::Failed, _) => "\u{2717}",
        (EntryStatus::Confirmed, ReadState::Acknowledged) => "\u{2713}\u{2713}",
        (EntryStatus::Confirmed, _) => "\u{2713}",
    }
}

/// Split `text` into rows of at most `width` characters.
#[must_use]
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(width.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Format an epoch-millisecond timestamp in local time.
fn format_timestamp(ms: u64, format: &str) -> String {
    use chrono::{Local, TimeZone};
    let secs = i64::try_from(ms / 1000).unwrap_or(i64::MAX);
    let nsecs = u32::try_from((ms % 1000) * 1_000_000).unwrap_or(0);
    match Local.timestamp_opt(secs, nsecs) {
        chrono::LocalResult::Single(dt) => dt.format(format).to_string(),
        _ => "??:??".to_string(),
    }
}

fn render_typing(frame: &mut Frame, area: Rect, app: &App) {
    let label = app.client.presence().remote_label();
    let line = Line::from(Span::styled(label.to_string(), app.theme.dimmed()));
    frame.render_widget(Paragraph::new(line), area);
}

fn render_input(frame: &mut Frame, area: Rect, app: &App) {
    let theme = app.theme;
    let line = if app.input.is_empty() {
        Line::from(vec![
            Span::styled("█", theme.normal()),
            Span::styled(
                " Type a message, /upload <path>, /download <n>, /theme",
                theme.dimmed(),
            ),
        ])
    } else {
        Line::from(Span::styled(
            with_cursor(&app.input, app.cursor_position),
            theme.normal(),
        ))
    };
    let block = Block::default()
        .title("Message")
        .borders(Borders::ALL)
        .border_style(theme.highlighted());
    frame.render_widget(Paragraph::new(line).block(block), area);
}
