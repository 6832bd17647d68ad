//! Terminal UI rendering.

pub mod chat_panel;
pub mod lobby;
pub mod status_bar;
pub mod theme;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    widgets::Block,
};

use crate::app::{App, Screen};
use crate::chat::ledger::EntryId;

/// Draw the whole UI.
///
/// Returns how much of each watched entry was on screen, for
/// [`App::report_visibility`].
pub fn draw(frame: &mut Frame, app: &App) -> Vec<(EntryId, f32)> {
    frame.render_widget(Block::default().style(app.theme.base()), frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    let report = match app.screen() {
        Screen::Name => {
            lobby::render_name(frame, chunks[0], app);
            Vec::new()
        }
        Screen::Home => {
            lobby::render_home(frame, chunks[0], app);
            Vec::new()
        }
        Screen::Chat => chat_panel::render(frame, chunks[0], app),
    };

    status_bar::render(frame, chunks[1], app);
    report
}

/// The composer text with a block cursor at `cursor` (character index).
#[must_use]
pub fn with_cursor(input: &str, cursor: usize) -> String {
    let mut text: String = input.chars().take(cursor).collect();
    text.push('█');
    text.extend(input.chars().skip(cursor));
    text
}
