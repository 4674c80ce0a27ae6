pub mod board_pane;
pub mod details_pane;
pub mod form;
pub mod keybindings;
pub mod layout;
pub mod modal;
pub mod styles;

use crate::app::AppState;
use board_pane::render_board_pane;
use details_pane::render_details_pane;
use form::render_form;
use keybindings::{render_keybindings, render_status_line};
use layout::create_layout;
use modal::render_confirm_delete;
use ratatui::Frame;

/// Main render function - draws the entire UI
pub fn render(f: &mut Frame, app: &AppState) {
    let size = f.size();
    let layout = create_layout(size);

    render_keybindings(f, app, layout.keybindings_area);
    render_board_pane(f, app, layout.board_area);
    render_details_pane(f, app, layout.details_area);
    render_status_line(f, app, layout.status_area);

    // Modals on top
    render_form(f, app, size);
    render_confirm_delete(f, app, size);
}
