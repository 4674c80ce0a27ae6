use crate::app::{AppState, StatusKind};
use crate::domain::UiMode;
use crate::ui::styles::{error_style, hint_style, info_style};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Render the keybindings hint bar
pub fn render_keybindings(f: &mut Frame, app: &AppState, area: Rect) {
    let hints = match app.ui_mode {
        UiMode::Normal => Line::from(vec![
            Span::raw(" ↑/↓ select   "),
            Span::raw("Shift+↑/↓ reorder   "),
            Span::raw("a add   "),
            Span::raw("e/Enter edit   "),
            Span::raw("d delete   "),
            Span::raw("q quit"),
        ]),
        UiMode::Form => Line::from(vec![
            Span::raw(" Tab/Shift+Tab move   "),
            Span::raw("←/→ change   "),
            Span::raw("Ctrl+N add period   "),
            Span::raw("Ctrl+R remove period   "),
            Span::raw("Enter save   "),
            Span::raw("Esc cancel"),
        ]),
        UiMode::ConfirmDelete => Line::raw(" y confirm   n cancel"),
    };

    let paragraph = Paragraph::new(hints).style(hint_style());
    f.render_widget(paragraph, area);
}

/// Render the status line with the latest message
pub fn render_status_line(f: &mut Frame, app: &AppState, area: Rect) {
    let line = match &app.status {
        Some(status) => {
            let style = match status.kind {
                StatusKind::Info => info_style(),
                StatusKind::Error => error_style(),
            };
            Line::from(Span::styled(format!(" {}", status.text), style))
        }
        None => Line::from(Span::styled(
            format!(" {} record(s)", app.records().len()),
            hint_style(),
        )),
    };
    f.render_widget(Paragraph::new(line), area);
}
