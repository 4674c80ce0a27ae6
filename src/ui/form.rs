use crate::app::{AppState, FormField, FormState};
use crate::domain::palette_color;
use crate::ui::{
    layout::create_modal_area,
    styles::{hex_color, hint_style, modal_bg_style, modal_title_style},
};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

/// Render the add/edit form
pub fn render_form(f: &mut Frame, app: &AppState, area: Rect) {
    if let Some(form) = &app.form {
        let lines = form_lines(form);
        let modal_area = create_modal_area(area, lines.len() as u16 + 2);

        // Clear the area behind the form
        f.render_widget(Clear, modal_area);

        let title_text = if form.editing.is_some() {
            " Edit "
        } else {
            " New "
        };

        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(Span::styled(title_text, modal_title_style()))
                    .style(modal_bg_style()),
            )
            .wrap(Wrap { trim: false });

        f.render_widget(paragraph, modal_area);
    }
}

fn form_lines(form: &FormState) -> Vec<Line<'static>> {
    let focused = form.focused();
    let mut lines = vec![Line::raw("")];

    for field in form.fields() {
        if let FormField::PeriodTitle(i) = field {
            let color = form
                .periods
                .get(i)
                .and_then(|p| p.color.clone())
                .unwrap_or_else(|| palette_color(i).to_string());
            lines.push(Line::from(Span::styled(
                format!("● Period {}", i + 1),
                Style::default().fg(hex_color(&color)),
            )));
        }
        lines.push(field_line(form, field, field == focused));
    }

    lines.push(Line::raw(""));
    lines.push(Line::styled(
        "Dates as DD/MM/YYYY HH:MM  ·  Enter to save  ·  Esc to cancel",
        hint_style(),
    ));
    lines
}

fn field_line(form: &FormState, field: FormField, focused: bool) -> Line<'static> {
    let marker = if focused { "> " } else { "  " };
    let value = match field {
        FormField::Kind => {
            let kind = if form.is_group { "Group" } else { "Single" };
            format!("‹ {} ›", kind)
        }
        FormField::Granularity => format!("‹ {} ›", form.granularity.to_tag()),
        _ => form.text(field).unwrap_or_default().to_string(),
    };

    let mut spans = vec![
        Span::raw(marker),
        Span::raw(format!("{:<18}", field.label())),
        Span::styled(value, modal_title_style()),
    ];
    if focused && form.text(field).is_some() {
        spans.push(Span::styled("█", modal_title_style())); // Cursor
    }
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::Settings;
    use chrono::Utc;

    #[test]
    fn test_form_lines_follow_kind() {
        let now = Utc::now();
        let mut form = FormState::new(&Settings::default(), now);
        let single = format!("{:?}", form_lines(&form));
        assert!(single.contains("Single"));
        assert!(!single.contains("Period 1"));

        form.toggle_kind(now);
        let group = format!("{:?}", form_lines(&form));
        assert!(group.contains("Group"));
        assert!(group.contains("Period 2 title"));
    }
}
