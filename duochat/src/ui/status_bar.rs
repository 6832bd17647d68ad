//! Status bar rendering.

use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::theme;
use crate::app::{App, Screen};

/// Render the status bar at the bottom of the screen.
pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let theme = app.theme;
    let help_text = match app.screen() {
        Screen::Name => "Enter: continue | Esc: quit",
        Screen::Home => "Enter: run | Esc: dismiss error / quit",
        Screen::Chat => "Enter: send | ↑↓ PgUp PgDn: scroll | /quit",
    };

    let (dot_color, status_text) = if app.is_connected {
        (theme::SUCCESS, "Connected")
    } else {
        (theme::ERROR, "Offline")
    };

    let mut spans = vec![
        Span::styled(concat!("duochat v", env!("CARGO_PKG_VERSION")), theme.bold()),
        Span::raw(" | "),
        Span::styled("●", theme.normal().fg(dot_color)),
        Span::raw(format!(" {status_text}")),
    ];
    if let Some(room) = app.client.session().room_id() {
        spans.push(Span::raw(format!(" | {room}")));
    }
    spans.push(Span::raw(" | "));
    match &app.status {
        Some(status) => spans.push(Span::styled(status.clone(), theme.bold())),
        None => spans.push(Span::styled(help_text, theme.dimmed())),
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(theme.status_bar());
    frame.render_widget(paragraph, area);
}
