//! Dark and light color themes for the TUI.

use ratatui::style::{Color, Modifier, Style};
use serde::{Deserialize, Serialize};

/// Color for sender names in chat.
pub const SENDER_COLORS: [Color; 8] = [
    Color::Cyan,
    Color::Green,
    Color::Yellow,
    Color::Magenta,
    Color::Blue,
    Color::LightRed,
    Color::Rgb(255, 165, 0),
    Color::Rgb(180, 120, 255),
];

/// Success/online indicator color.
pub const SUCCESS: Color = Color::Green;

/// Warning color (pending uploads, reconnecting).
pub const WARNING: Color = Color::Yellow;

/// Error/offline indicator color.
pub const ERROR: Color = Color::Red;

/// Active color theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light text on a dark background.
    Dark,
    /// Dark text on a light background.
    #[default]
    Light,
}

impl Theme {
    /// The other theme.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    const fn fg(self) -> Color {
        match self {
            Self::Dark => Color::White,
            Self::Light => Color::Black,
        }
    }

    const fn bg(self) -> Color {
        match self {
            Self::Dark => Color::Black,
            Self::Light => Color::White,
        }
    }

    const fn accent(self) -> Color {
        match self {
            Self::Dark => Color::Cyan,
            Self::Light => Color::Blue,
        }
    }

    /// Base style for whole screens.
    #[must_use]
    pub fn base(self) -> Style {
        Style::default().fg(self.fg()).bg(self.bg())
    }

    /// Normal text.
    #[must_use]
    pub fn normal(self) -> Style {
        Style::default().fg(self.fg())
    }

    /// Dimmed text (timestamps, hints).
    #[must_use]
    pub fn dimmed(self) -> Style {
        Style::default().fg(Color::Gray)
    }

    /// Bold text.
    #[must_use]
    pub fn bold(self) -> Style {
        self.normal().add_modifier(Modifier::BOLD)
    }

    /// Focused borders and titles.
    #[must_use]
    pub fn highlighted(self) -> Style {
        Style::default()
            .fg(self.accent())
            .add_modifier(Modifier::BOLD)
    }

    /// System notifications.
    #[must_use]
    pub fn system_message(self) -> Style {
        let color = match self {
            Self::Dark => Color::Rgb(100, 140, 180),
            Self::Light => Color::Rgb(40, 80, 130),
        };
        Style::default().fg(color).add_modifier(Modifier::ITALIC)
    }

    /// Error notifications and inline errors.
    #[must_use]
    pub fn error(self) -> Style {
        Style::default().fg(ERROR).add_modifier(Modifier::BOLD)
    }

    /// Pending entries.
    #[must_use]
    pub fn pending(self) -> Style {
        Style::default().fg(WARNING).add_modifier(Modifier::ITALIC)
    }

    /// Status bar background.
    #[must_use]
    pub fn status_bar(self) -> Style {
        match self {
            Self::Dark => Style::default().fg(Color::White).bg(Color::Rgb(30, 30, 50)),
            Self::Light => Style::default().fg(Color::Black).bg(Color::Rgb(210, 215, 230)),
        }
    }
}

/// Get a color for a sender based on their name.
#[must_use]
pub fn sender_color(name: &str) -> Color {
    let hash = name.bytes().fold(0u32, |acc, b| {
        acc.wrapping_mul(31).wrapping_add(u32::from(b))
    });
    SENDER_COLORS[(hash as usize) % SENDER_COLORS.len()]
}
