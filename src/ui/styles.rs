use crate::domain::{parse_hex_color, Status};
use ratatui::style::{Color, Modifier, Style};

/// Default text style
pub fn default_style() -> Style {
    Style::default().fg(Color::White)
}

/// Border of the selected card
pub fn selected_style() -> Style {
    Style::default()
        .fg(Color::LightCyan)
        .add_modifier(Modifier::BOLD)
}

/// Active status badge style
pub fn active_style() -> Style {
    Style::default()
        .fg(Color::Magenta)
        .add_modifier(Modifier::BOLD)
}

pub fn upcoming_style() -> Style {
    Style::default().fg(Color::Gray)
}

/// Done/completed record style
pub fn done_style() -> Style {
    Style::default().fg(Color::Green)
}

pub fn status_style(status: Status) -> Style {
    match status {
        Status::Active => active_style(),
        Status::Completed => done_style(),
        Status::Upcoming => upcoming_style(),
    }
}

/// Ring and gauge color for a status
pub fn status_color(status: Status) -> Color {
    match status {
        Status::Active => Color::Magenta,
        Status::Completed => Color::Green,
        Status::Upcoming => Color::Gray,
    }
}

/// Cards on their way out
pub fn leaving_style() -> Style {
    Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::DIM)
}

/// Title style for panes
pub fn title_style() -> Style {
    Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD)
}

/// Border style
pub fn border_style() -> Style {
    Style::default().fg(Color::Gray)
}

/// Modal background style
pub fn modal_bg_style() -> Style {
    Style::default().bg(Color::DarkGray).fg(Color::White)
}

/// Modal title style
pub fn modal_title_style() -> Style {
    Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD)
}

/// Keybinding hint style
pub fn hint_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

/// Progress gauge style
pub fn gauge_style(status: Status) -> Style {
    Style::default().fg(status_color(status)).bg(Color::DarkGray)
}

/// Error message style
pub fn error_style() -> Style {
    Style::default()
        .fg(Color::Red)
        .add_modifier(Modifier::BOLD)
}

pub fn info_style() -> Style {
    Style::default().fg(Color::Green)
}

/// Terminal color for a "#rrggbb" token, gray when unreadable
pub fn hex_color(token: &str) -> Color {
    parse_hex_color(token)
        .map(|(r, g, b)| Color::Rgb(r, g, b))
        .unwrap_or(Color::Gray)
}
