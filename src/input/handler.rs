use crate::app::AppState;
use crate::domain::UiMode;
use anyhow::Result;
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Handle keyboard input events. Returns true when the app should quit.
pub fn handle_key(app: &mut AppState, key: KeyEvent) -> Result<bool> {
    match app.ui_mode {
        UiMode::Normal => handle_normal_mode(app, key),
        UiMode::Form => handle_form_mode(app, key),
        UiMode::ConfirmDelete => handle_confirm_delete_mode(app, key),
    }
}

/// Handle keys in normal mode
fn handle_normal_mode(app: &mut AppState, key: KeyEvent) -> Result<bool> {
    match key.code {
        // Navigation (with Shift modifier for reordering)
        KeyCode::Up => {
            if key.modifiers.contains(KeyModifiers::SHIFT) {
                app.move_selected_up();
            } else {
                app.move_selection_up();
            }
            Ok(false)
        }
        KeyCode::Down => {
            if key.modifiers.contains(KeyModifiers::SHIFT) {
                app.move_selected_down();
            } else {
                app.move_selection_down();
            }
            Ok(false)
        }
        KeyCode::Char('K') => {
            app.move_selected_up();
            Ok(false)
        }
        KeyCode::Char('J') => {
            app.move_selected_down();
            Ok(false)
        }
        KeyCode::Char('k') => {
            app.move_selection_up();
            Ok(false)
        }
        KeyCode::Char('j') => {
            app.move_selection_down();
            Ok(false)
        }

        KeyCode::Char('a') => {
            app.start_add();
            Ok(false)
        }
        KeyCode::Char('e') | KeyCode::Enter => {
            app.start_edit();
            Ok(false)
        }
        KeyCode::Char('d') | KeyCode::Delete => {
            app.request_delete();
            Ok(false)
        }

        KeyCode::Char('q') | KeyCode::Esc => {
            app.should_quit = true;
            Ok(true)
        }
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
            Ok(true)
        }

        _ => Ok(false),
    }
}

/// Handle keys in the add/edit form
fn handle_form_mode(app: &mut AppState, key: KeyEvent) -> Result<bool> {
    if key.code == KeyCode::Enter {
        app.submit_form();
        return Ok(false);
    }
    if key.code == KeyCode::Esc {
        app.cancel_form();
        return Ok(false);
    }

    let now = Utc::now();
    let Some(form) = app.form.as_mut() else {
        return Ok(false);
    };
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Tab | KeyCode::Down => form.focus_next(),
        KeyCode::BackTab | KeyCode::Up => form.focus_prev(),
        KeyCode::Left => form.cycle(false, now),
        KeyCode::Right => form.cycle(true, now),
        KeyCode::Char('n') if ctrl => form.add_period(now),
        KeyCode::Char('r') if ctrl => form.remove_period(),
        KeyCode::Backspace => form.backspace(),
        KeyCode::Char(c) if !ctrl => form.add_char(c),
        _ => {}
    }
    Ok(false)
}

/// Handle keys while a delete waits for confirmation
fn handle_confirm_delete_mode(app: &mut AppState, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm_delete(),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.cancel_delete(),
        _ => {}
    }
    Ok(false)
}
