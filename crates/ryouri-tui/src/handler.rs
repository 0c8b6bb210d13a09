use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, InputMode};
use crate::tui::AppEvent;

/// Lines moved per mouse wheel notch
const WHEEL_STEP: u16 = 3;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Single-line text editing shared by the draft and the API key popup
fn edit_line(text: &mut String, cursor: &mut usize, key: KeyEvent) {
    match key.code {
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
        KeyCode::Char(c) if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => {}
    }
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => app.scroll_to_bottom(),
        AppEvent::Tick => app.tick().await,
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.show_api_key_input {
        handle_api_key_input(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_api_key_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_api_key_input(),
        KeyCode::Enter => app.save_api_key(),
        _ => edit_line(&mut app.api_key_input, &mut app.api_key_input_cursor, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('i') | KeyCode::Enter | KeyCode::Tab => {
            app.input_mode = InputMode::Editing;
            app.input_cursor = app.session.draft().chars().count();
        }

        // Suggested prompts, numbered from 1 on screen
        KeyCode::Char(c @ '1'..='9') => {
            let index = (c as usize) - ('1' as usize);
            app.apply_suggestion(index);
        }

        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_down(app.chat_height / 2);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_up(app.chat_height / 2);
        }
        KeyCode::PageDown => app.scroll_down(app.chat_height),
        KeyCode::PageUp => app.scroll_up(app.chat_height),
        KeyCode::Char('g') => app.chat_scroll = 0,
        KeyCode::Char('G') => app.scroll_to_bottom(),

        KeyCode::Char('K') => app.open_api_key_input(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        // Shift+Enter is reserved for line breaks, which a single-line input drops
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => {}
        KeyCode::Enter => app.start_send(),
        KeyCode::PageDown => app.scroll_down(app.chat_height),
        KeyCode::PageUp => app.scroll_up(app.chat_height),
        _ => {
            // Input is disabled while a reply is pending
            if !app.is_sending() {
                edit_line(app.session.draft_mut(), &mut app.input_cursor, key);
            }
        }
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    // The API key popup is modal
    if app.show_api_key_input {
        return;
    }

    let x = mouse.column;
    let y = mouse.row;

    let in_chat = app.chat_area.is_some_and(|r| point_in_rect(x, y, r));

    match mouse.kind {
        MouseEventKind::ScrollDown if in_chat => app.scroll_down(WHEEL_STEP),
        MouseEventKind::ScrollUp if in_chat => app.scroll_up(WHEEL_STEP),
        MouseEventKind::Down(MouseButton::Left) => {
            let clicked = app
                .suggestion_areas
                .iter()
                .position(|r| point_in_rect(x, y, *r));
            if let Some(index) = clicked {
                app.apply_suggestion(index);
            }
        }
        _ => {}
    }
}
