use crate::app::AppState;
use crate::domain::{format_input_date, status_badge, ProgressSnapshot, Record};
use crate::ui::styles::{border_style, default_style, hex_color, status_style, title_style};
use chrono::Utc;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// Render the details pane for the selected record
pub fn render_details_pane(f: &mut Frame, app: &AppState, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style())
        .title(Span::styled(" Details ", title_style()));

    let Some(record) = app.selected_record() else {
        let empty = Paragraph::new("No record selected").block(block);
        f.render_widget(empty, area);
        return;
    };

    // Show what the board last drew; compute fresh if it has no card yet
    let snapshot = app
        .reconciler
        .target()
        .card(&record.id)
        .map(|card| card.snapshot.clone())
        .unwrap_or_else(|| ProgressSnapshot::compute(record, Utc::now()));

    let paragraph = Paragraph::new(detail_lines(record, &snapshot))
        .block(block)
        .wrap(Wrap { trim: false });

    f.render_widget(paragraph, area);
}

fn field(label: &'static str, value: String) -> Line<'static> {
    Line::from(vec![Span::styled(label, title_style()), Span::raw(value)])
}

fn detail_lines(record: &Record, snapshot: &ProgressSnapshot) -> Vec<Line<'static>> {
    let range = record.global_range(snapshot.at);
    let mut lines = vec![
        field("Title:     ", record.title.clone()),
        Line::raw(""),
        Line::from(vec![
            Span::styled("Status:    ", title_style()),
            Span::styled(
                status_badge(snapshot.status).to_string(),
                status_style(snapshot.status),
            ),
        ]),
        field("Progress:  ", format!("{:.1}%", snapshot.percentage)),
        field("Start:     ", format_input_date(range.start)),
        field("End:       ", format_input_date(range.end)),
        field("Remaining: ", snapshot.remaining.display()),
        field("Elapsed:   ", snapshot.elapsed.display()),
        Line::raw(""),
        field("Unit:      ", record.granularity.to_tag().to_string()),
        field("Refresh:   ", format!("every {} ms", record.refresh_rate)),
    ];

    if !snapshot.periods.is_empty() {
        lines.push(Line::raw(""));
        lines.push(Line::from(Span::styled("Periods:", title_style())));
        for (period, computed) in record.periods().iter().zip(&snapshot.periods) {
            lines.push(Line::from(vec![
                Span::styled("  ● ", default_style().fg(hex_color(&computed.color))),
                Span::raw(format!("{}  ", computed.title)),
                Span::styled(format!("{:.0}%", computed.percentage), status_style(computed.status)),
            ]));
            lines.push(Line::raw(format!(
                "    {} → {}",
                format_input_date(period.interval.start),
                format_input_date(period.interval.end)
            )));
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Granularity, Period, RecordId, RecordKind, TimeInterval};
    use chrono::TimeZone;

    #[test]
    fn test_detail_lines_list_periods() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mid = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
        let record = Record {
            id: RecordId::new("g"),
            owner_id: "o".to_string(),
            title: "Trip".to_string(),
            granularity: Granularity::Hours,
            refresh_rate: 1000,
            position: 0,
            kind: RecordKind::Group(vec![
                Period {
                    title: "Outbound".to_string(),
                    interval: TimeInterval::new(start, mid),
                    color: "#6c5ce7".to_string(),
                },
                Period {
                    title: "Return".to_string(),
                    interval: TimeInterval::new(mid, end),
                    color: "#00b894".to_string(),
                },
            ]),
        };
        let snapshot = ProgressSnapshot::compute(&record, mid);
        let text = format!("{:?}", detail_lines(&record, &snapshot));

        assert!(text.contains("Outbound"));
        assert!(text.contains("Return"));
        assert!(text.contains("50.0%"));
        assert!(text.contains("24 hours"));
    }
}
