/*
[INPUT]:  Crossterm key events from the input pump
[OUTPUT]: AppState mutations and quit signal
[POS]:    TUI event routing
[UPDATE]: When changing keybindings
*/

use crossterm::event::{Event as CrosstermEvent, KeyCode, KeyEvent, KeyModifiers};
use tui_input::backend::crossterm::EventHandler;

use super::app::AppState;

/// Handles key events for the TUI.
///
/// Returns `true` if quit is requested, `false` otherwise.
pub(super) fn handle_key_event(app: &mut AppState, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') => return true,
            KeyCode::Char('p') => {
                app.toggle_auto_update();
                return false;
            }
            _ => {}
        }
    }

    match key.code {
        KeyCode::Tab => {
            app.next_tab();
            false
        }
        KeyCode::Esc => {
            app.clear_search();
            false
        }
        KeyCode::Up => {
            app.move_selection(-1);
            false
        }
        KeyCode::Down => {
            app.move_selection(1);
            false
        }
        KeyCode::Enter => {
            app.submit();
            false
        }
        _ => {
            // Everything else edits the search box.
            if let Some(change) = app.input.handle_event(&CrosstermEvent::Key(key))
                && change.value
            {
                app.on_input_changed();
            }
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(ch: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL)
    }

    #[tokio::test]
    async fn test_ctrl_c_and_ctrl_q_quit() {
        let (mut app, _rx) = super::super::app::tests::app_for_test();
        assert!(handle_key_event(&mut app, ctrl('c')));
        assert!(handle_key_event(&mut app, ctrl('q')));
        assert!(!handle_key_event(&mut app, key(KeyCode::Char('q'))));
    }

    #[tokio::test]
    async fn test_ctrl_p_toggles_auto_update() {
        let (mut app, _rx) = super::super::app::tests::app_for_test();
        assert!(app.auto_update);
        assert!(!handle_key_event(&mut app, ctrl('p')));
        assert!(!app.auto_update);
        assert!(!handle_key_event(&mut app, ctrl('p')));
        assert!(app.auto_update);
    }

    #[tokio::test]
    async fn test_typing_edits_search_box() {
        let (mut app, _rx) = super::super::app::tests::app_for_test();
        handle_key_event(&mut app, key(KeyCode::Char('a')));
        handle_key_event(&mut app, key(KeyCode::Char('b')));
        assert_eq!(app.input.value(), "ab");

        handle_key_event(&mut app, key(KeyCode::Esc));
        assert_eq!(app.input.value(), "");
    }
}
