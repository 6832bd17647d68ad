//! Name and home screens.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use super::with_cursor;
use crate::app::App;
use crate::chat::session::SessionState;

/// Render the display-name prompt.
pub fn render_name(frame: &mut Frame, area: Rect, app: &App) {
    let theme = app.theme;
    let [intro, input] = form_layout(area);

    let text = vec![
        Line::from(Span::styled("Welcome to duochat", theme.highlighted())),
        Line::from(""),
        Line::from(Span::styled(
            "Choose a display name and press Enter.",
            theme.normal(),
        )),
    ];
    frame.render_widget(Paragraph::new(text), intro);
    render_input(frame, input, app, "Display name");
}

/// Render the create/join screen, including any join error.
pub fn render_home(frame: &mut Frame, area: Rect, app: &App) {
    let theme = app.theme;
    let session = app.client.session();
    let [intro, input] = form_layout(area);

    let mut text = vec![
        Line::from(Span::styled(
            format!("Hi {}!", session.display_name().unwrap_or_default()),
            theme.highlighted(),
        )),
        Line::from(""),
        Line::from(Span::styled("/create            new room", theme.normal())),
        Line::from(Span::styled("/join <code>       join any room", theme.normal())),
        Line::from(Span::styled("/private <code>    join as private (2 max)", theme.normal())),
        Line::from(Span::styled("/group <code>      join as group", theme.normal())),
        Line::from(""),
    ];

    if let Some(rejection) = session.rejection() {
        text.push(Line::from(vec![
            Span::styled(rejection.to_string(), theme.error()),
            Span::styled("  (Esc to dismiss)", theme.dimmed()),
        ]));
    } else if session.state() == SessionState::AwaitingRoom {
        text.push(Line::from(Span::styled(
            "Waiting for the server...",
            theme.pending(),
        )));
    }

    frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: false }), intro);
    render_input(frame, input, app, "Command or room code");
}

fn form_layout(area: Rect) -> [Rect; 2] {
    let column = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(15),
            Constraint::Percentage(70),
            Constraint::Percentage(15),
        ])
        .split(area)[1];
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(column);
    [rows[0], rows[1]]
}

fn render_input(frame: &mut Frame, area: Rect, app: &App, title: &str) {
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(app.theme.highlighted());
    let line = Line::from(Span::styled(
        with_cursor(&app.input, app.cursor_position),
        app.theme.normal(),
    ));
    frame.render_widget(Paragraph::new(line).block(block), area);
}
