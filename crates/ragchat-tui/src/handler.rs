use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Line editing shared by the question box and the settings text fields.
/// Returns false for keys it does not handle.
fn edit_line(text: &mut String, cursor: &mut usize, code: KeyCode) -> bool {
    match code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if *cursor < text.chars().count() {
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Left => *cursor = cursor.saturating_sub(1),
        KeyCode::Right => *cursor = (*cursor + 1).min(text.chars().count()),
        KeyCode::Home => *cursor = 0,
        KeyCode::End => *cursor = text.chars().count(),
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => return false,
    }
    true
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Backend(event) => app.handle_backend(event),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Popups take all input while open
    if app.chat.citation_preview.is_some() {
        handle_citation_preview(app, key);
        return;
    }
    if app.show_settings {
        handle_settings(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_citation_preview(app: &mut App, key: KeyEvent) {
    if matches!(key.code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('o')) {
        app.chat.close_citation();
    }
}

fn handle_settings(app: &mut App, key: KeyEvent) {
    if app.settings_edit.is_some() {
        match key.code {
            KeyCode::Esc => app.settings_edit = None,
            KeyCode::Enter => app.commit_settings_edit(),
            code => {
                if let Some(edit) = app.settings_edit.as_mut() {
                    edit_line(&mut edit.buffer, &mut edit.cursor, code);
                }
            }
        }
        return;
    }

    match key.code {
        KeyCode::Esc | KeyCode::Char('s') | KeyCode::Char('q') => app.close_settings(),
        KeyCode::Char('j') | KeyCode::Down => app.settings_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.settings_nav_up(),
        KeyCode::Enter | KeyCode::Char(' ') => app.activate_setting(),
        KeyCode::Char('+') | KeyCode::Char('l') | KeyCode::Right => {
            if app.selected_setting() == Some(ragchat_core::SettingsField::RetrieveCount) {
                app.chat.settings.step_retrieve_count(1);
            }
        }
        KeyCode::Char('-') | KeyCode::Char('h') | KeyCode::Left => {
            if app.selected_setting() == Some(ragchat_core::SettingsField::RetrieveCount) {
                app.chat.settings.step_retrieve_count(-1);
            }
        }
        _ => {}
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        // Quit
        KeyCode::Char('q') => app.should_quit = true,

        // Tab cycles focus: Input -> Chat -> Sessions (when shown) -> Input
        KeyCode::Tab => {
            app.focus = match app.focus {
                FocusPane::Input => FocusPane::Chat,
                FocusPane::Chat if app.chat.has_sessions => FocusPane::Sessions,
                FocusPane::Chat | FocusPane::Sessions => FocusPane::Input,
            };
            if app.focus == FocusPane::Input {
                app.input_mode = InputMode::Editing;
                // Cursor at end of existing text
                app.query_cursor = app.query_input.chars().count();
            }
        }

        KeyCode::Char('i') => {
            app.focus = FocusPane::Input;
            app.input_mode = InputMode::Editing;
            app.query_cursor = app.query_input.chars().count();
        }

        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::Sessions => app.session_nav_down(),
            FocusPane::Chat => app.answer_nav_down(),
            FocusPane::Input => app.scroll_down(1),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::Sessions => app.session_nav_up(),
            FocusPane::Chat => app.answer_nav_up(),
            FocusPane::Input => app.scroll_up(1),
        },

        // Half-page scroll of the transcript
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_down((app.chat_height / 2).max(1));
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_up((app.chat_height / 2).max(1));
        }
        KeyCode::Char('g') => app.chat_scroll = 0,
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),

        KeyCode::Enter => match app.focus {
            FocusPane::Sessions => app.open_selected_session(),
            FocusPane::Chat => app.open_selected_citation(),
            FocusPane::Input => {
                app.input_mode = InputMode::Editing;
            }
        },

        // Citations of the selected answer
        KeyCode::Char('l') | KeyCode::Right => app.citation_next(),
        KeyCode::Char('h') | KeyCode::Left => app.citation_prev(),
        KeyCode::Char('o') => app.open_selected_citation(),

        KeyCode::Char('x') => app.clear_chat(),
        KeyCode::Char('r') => app.retry(),
        KeyCode::Char('s') => app.show_settings = true,

        KeyCode::Char(c @ '1'..='9') => {
            if let Some(n) = c.to_digit(10) {
                app.ask_suggestion(n as usize);
            }
        }

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.submit_input();
        }
        KeyCode::Tab => {
            app.input_mode = InputMode::Normal;
            app.focus = FocusPane::Chat;
        }
        code => {
            edit_line(&mut app.query_input, &mut app.query_cursor, code);
        }
    }
}

fn in_area(area: Option<Rect>, column: u16, row: u16) -> bool {
    area.map(|a| {
        column >= a.x && column < a.x + a.width && row >= a.y && row < a.y + a.height
    })
    .unwrap_or(false)
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    // Determine which area the mouse is in (position-based scrolling)
    let in_sessions = in_area(app.sessions_area, mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_sessions {
                app.session_nav_down();
            } else {
                app.scroll_down(3);
            }
        }
        MouseEventKind::ScrollUp => {
            if in_sessions {
                app.session_nav_up();
            } else {
                app.scroll_up(3);
            }
        }
        MouseEventKind::Down(_) => {
            if in_sessions {
                app.focus = FocusPane::Sessions;
                app.input_mode = InputMode::Normal;
            } else if in_area(app.chat_area, mouse.column, mouse.row) {
                app.focus = FocusPane::Chat;
                app.input_mode = InputMode::Normal;
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_to_byte_index_multibyte() {
        let s = "añb";
        assert_eq!(char_to_byte_index(s, 0), 0);
        assert_eq!(char_to_byte_index(s, 2), 3);
        assert_eq!(char_to_byte_index(s, 10), s.len());
    }

    #[test]
    fn test_edit_line_inserts_and_deletes_at_cursor() {
        let mut text = String::from("FR-58");
        let mut cursor = 3;
        for c in "R92B-".chars() {
            edit_line(&mut text, &mut cursor, KeyCode::Char(c));
        }
        assert_eq!(text, "FR-R92B-58");

        edit_line(&mut text, &mut cursor, KeyCode::Home);
        edit_line(&mut text, &mut cursor, KeyCode::Delete);
        assert_eq!(text, "R-R92B-58");

        edit_line(&mut text, &mut cursor, KeyCode::End);
        edit_line(&mut text, &mut cursor, KeyCode::Backspace);
        assert_eq!(text, "R-R92B-5");
        assert_eq!(cursor, text.chars().count());
    }

    #[test]
    fn test_edit_line_ignores_unrelated_keys() {
        let mut text = String::from("abc");
        let mut cursor = 1;
        assert!(!edit_line(&mut text, &mut cursor, KeyCode::F(1)));
        assert_eq!(text, "abc");
    }

    #[test]
    fn test_in_area() {
        let area = Some(Rect::new(2, 2, 4, 3));
        assert!(in_area(area, 2, 2));
        assert!(in_area(area, 5, 4));
        assert!(!in_area(area, 6, 4));
        assert!(!in_area(None, 0, 0));
    }
}
