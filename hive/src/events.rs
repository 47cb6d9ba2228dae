//! Event handling for the story TUI

use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind,
};

use crate::app::App;

/// Result of handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    Continue,
    Quit,
    NeedsRedraw,
}

/// Handle a terminal event
pub fn handle_event(app: &mut App, event: Event) -> EventResult {
    match event {
        Event::Key(key) => handle_key_event(app, key),
        Event::Mouse(mouse) => handle_mouse_event(app, mouse),
        Event::Resize(_, _) => EventResult::NeedsRedraw,
        _ => EventResult::Continue,
    }
}

fn handle_mouse_event(app: &mut App, mouse: MouseEvent) -> EventResult {
    match mouse.kind {
        MouseEventKind::ScrollUp => {
            app.scroll_up(3);
            EventResult::NeedsRedraw
        }
        MouseEventKind::ScrollDown => {
            app.scroll_down(3);
            EventResult::NeedsRedraw
        }
        _ => EventResult::Continue,
    }
}

fn handle_key_event(app: &mut App, key: KeyEvent) -> EventResult {
    // Windows reports releases too.
    if key.kind == KeyEventKind::Release {
        return EventResult::Continue;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => EventResult::Quit,
        KeyCode::Esc => EventResult::Quit,
        KeyCode::Char('r') if ctrl => {
            app.request_refresh();
            EventResult::NeedsRedraw
        }
        KeyCode::F(5) => {
            app.request_refresh();
            EventResult::NeedsRedraw
        }
        KeyCode::Enter => {
            app.submit_input();
            EventResult::NeedsRedraw
        }
        KeyCode::PageUp => {
            app.scroll_up(10);
            EventResult::NeedsRedraw
        }
        KeyCode::PageDown => {
            app.scroll_down(10);
            EventResult::NeedsRedraw
        }
        KeyCode::Up => {
            app.scroll_up(1);
            EventResult::NeedsRedraw
        }
        KeyCode::Down => {
            app.scroll_down(1);
            EventResult::NeedsRedraw
        }
        KeyCode::End if ctrl => {
            app.scroll_to_bottom();
            EventResult::NeedsRedraw
        }
        KeyCode::Backspace => {
            app.backspace();
            EventResult::NeedsRedraw
        }
        KeyCode::Delete => {
            app.delete();
            EventResult::NeedsRedraw
        }
        KeyCode::Left => {
            app.cursor_left();
            EventResult::NeedsRedraw
        }
        KeyCode::Right => {
            app.cursor_right();
            EventResult::NeedsRedraw
        }
        KeyCode::Home => {
            app.cursor_home();
            EventResult::NeedsRedraw
        }
        KeyCode::End => {
            app.cursor_end();
            EventResult::NeedsRedraw
        }
        KeyCode::Char(c) if !ctrl => {
            app.type_char(c);
            EventResult::NeedsRedraw
        }
        _ => EventResult::Continue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_core::{Action, MemoryStore, Narrator, NoModeration, ScriptedGenerator, StorySession};
    use std::sync::Arc;

    fn app() -> App {
        let session = StorySession::new(
            Arc::new(MemoryStore::new()),
            Narrator::new(Arc::new(ScriptedGenerator::new())),
            Arc::new(NoModeration),
        );
        let mut app = App::new(session);
        app.pending_action = None;
        app
    }

    fn key(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent::new(code, modifiers))
    }

    #[test]
    fn test_typing_and_enter_submits() {
        let mut app = app();
        for c in "hi".chars() {
            handle_event(&mut app, key(KeyCode::Char(c), KeyModifiers::NONE));
        }
        handle_event(&mut app, key(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(app.pending_action, Some(Action::Submit("hi".to_string())));
    }

    #[test]
    fn test_refresh_keys() {
        let mut app = app();
        handle_event(&mut app, key(KeyCode::Char('r'), KeyModifiers::CONTROL));
        assert_eq!(app.pending_action, Some(Action::Refresh));

        app.pending_action = None;
        handle_event(&mut app, key(KeyCode::F(5), KeyModifiers::NONE));
        assert_eq!(app.pending_action, Some(Action::Refresh));
        assert_eq!(app.input_buffer(), "");
    }

    #[test]
    fn test_quit_keys() {
        let mut app = app();
        assert_eq!(
            handle_event(&mut app, key(KeyCode::Esc, KeyModifiers::NONE)),
            EventResult::Quit
        );
        assert_eq!(
            handle_event(&mut app, key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            EventResult::Quit
        );
    }

    #[test]
    fn test_shifted_characters_are_typed() {
        let mut app = app();
        handle_event(&mut app, key(KeyCode::Char('A'), KeyModifiers::SHIFT));
        assert_eq!(app.input_buffer(), "A");
    }
}
