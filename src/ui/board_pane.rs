use crate::app::AppState;
use crate::board::Card;
use crate::domain::{ring_arc, ring_point, status_badge, ProgressSnapshot};
use crate::ui::styles::{
    border_style, default_style, gauge_style, hex_color, hint_style, leaving_style, selected_style,
    status_color, status_style, title_style,
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Color,
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Points},
        Block, Borders, Gauge, Paragraph,
    },
    Frame,
};

/// Rows taken by one card, borders included
pub const CARD_HEIGHT: u16 = 7;

/// Columns given to the progress ring
const RING_WIDTH: u16 = 14;

/// Points per full turn of the ring
const RING_STEPS: usize = 64;

/// Render the board: one card per record in display order, then cards being removed
pub fn render_board_pane(f: &mut Frame, app: &AppState, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style())
        .title(Span::styled(" Progress ", title_style()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let board = app.reconciler.target();
    let mut cards: Vec<(&Card, bool)> = app
        .records()
        .iter()
        .enumerate()
        .filter_map(|(idx, record)| board.card(&record.id).map(|c| (c, idx == app.selected_index)))
        .collect();
    cards.extend(board.leaving().into_iter().map(|c| (c, false)));

    if cards.is_empty() {
        let empty = Paragraph::new(vec![
            Line::raw(""),
            Line::styled("  Nothing tracked yet.", default_style()),
            Line::styled("  Press 'a' to add a timer or a group of periods.", hint_style()),
        ]);
        f.render_widget(empty, inner);
        return;
    }

    let visible = usize::from((inner.height / CARD_HEIGHT).max(1));
    let first = first_visible(app.selected_index, visible, cards.len());

    for (slot, (card, selected)) in cards.iter().skip(first).take(visible).enumerate() {
        let y = inner.y + slot as u16 * CARD_HEIGHT;
        if y + CARD_HEIGHT > inner.y + inner.height {
            break;
        }
        let card_area = Rect::new(inner.x, y, inner.width, CARD_HEIGHT);
        render_card(f, card, *selected, card_area);
    }
}

/// First card to draw so the selected one stays on screen
fn first_visible(selected: usize, visible: usize, total: usize) -> usize {
    if total <= visible {
        return 0;
    }
    let first = selected.saturating_sub(visible - 1);
    first.min(total - visible)
}

fn render_card(f: &mut Frame, card: &Card, selected: bool, area: Rect) {
    let border = if card.is_leaving() {
        leaving_style()
    } else if selected {
        selected_style()
    } else {
        border_style()
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(Span::styled(format!(" {} ", card.record.title), border));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(RING_WIDTH), Constraint::Min(0)])
        .split(inner);

    render_ring(f, &card.snapshot, card.is_leaving(), columns[0]);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(columns[1]);

    let text_style = if card.is_leaving() {
        leaving_style()
    } else {
        default_style()
    };
    let paragraph = Paragraph::new(card_lines(card)).style(text_style);
    f.render_widget(paragraph, rows[0]);

    let gauge = Gauge::default()
        .gauge_style(gauge_style(card.snapshot.status))
        .percent(card.snapshot.percentage.clamp(0.0, 100.0).round() as u16)
        .label(card.snapshot.percent_label());
    f.render_widget(gauge, rows[1]);
}

/// Braille ring: a faint full circle, the covered arc and a dot for a single
/// timer, one colored dot per period for a group
fn render_ring(f: &mut Frame, snapshot: &ProgressSnapshot, leaving: bool, area: Rect) {
    let track = ring_arc(100.0, RING_STEPS);
    let arc = ring_arc(snapshot.percentage, RING_STEPS);
    let head = [ring_point(snapshot.percentage)];
    let arc_color = if leaving {
        Color::DarkGray
    } else {
        status_color(snapshot.status)
    };
    let dots: Vec<([(f64, f64); 1], Color)> = snapshot
        .periods
        .iter()
        .map(|p| ([ring_point(p.percentage)], hex_color(&p.color)))
        .collect();
    let centre = if snapshot.periods.is_empty() {
        snapshot.percent_label()
    } else {
        format!("{}p", snapshot.periods.len())
    };

    let canvas = Canvas::default()
        .marker(Marker::Braille)
        .x_bounds([-1.4, 1.4])
        .y_bounds([-1.4, 1.4])
        .paint(|ctx| {
            ctx.draw(&Points {
                coords: &track,
                color: Color::DarkGray,
            });
            if dots.is_empty() {
                ctx.draw(&Points {
                    coords: &arc,
                    color: arc_color,
                });
                ctx.draw(&Points {
                    coords: &head,
                    color: Color::White,
                });
            } else {
                for (coords, color) in &dots {
                    ctx.draw(&Points {
                        coords,
                        color: *color,
                    });
                }
            }
            ctx.print(-0.35, -0.1, Line::raw(centre.clone()));
        });
    f.render_widget(canvas, area);
}

/// Text beside the ring: badge, remaining and elapsed
fn card_lines(card: &Card) -> Vec<Line<'static>> {
    let snapshot = &card.snapshot;
    let mut badge = vec![Span::styled(
        status_badge(snapshot.status).to_string(),
        status_style(snapshot.status),
    )];
    if !snapshot.periods.is_empty() {
        badge.push(Span::raw(format!("  · {} periods", snapshot.periods.len())));
    }

    vec![
        Line::from(badge),
        Line::raw(format!("Remaining: {}", snapshot.remaining.display())),
        Line::raw(format!("Elapsed:   {}", snapshot.elapsed.display())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_visible_keeps_selection_on_screen() {
        assert_eq!(first_visible(0, 3, 2), 0);
        assert_eq!(first_visible(1, 3, 10), 0);
        assert_eq!(first_visible(5, 3, 10), 3);
        assert_eq!(first_visible(9, 3, 10), 7);
    }
}
