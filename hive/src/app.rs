//! Main application state and logic

use hive_core::{Action, Notice, StorySession, SubmitOutcome, Turn, TurnState, Update};

use crate::ui::theme::HiveTheme;

/// Main application state
pub struct App {
    pub session: StorySession,
    pub theme: HiveTheme,

    // Story display
    pub turns: Vec<Turn>,
    pub scroll: usize,
    pub scroll_locked_to_bottom: bool,

    // Input state
    input_buffer: String,
    cursor_position: usize,

    // Status
    notices: Vec<Notice>,
    status_message: Option<String>,
    pub pending_action: Option<Action>,
    pub busy: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new(session: StorySession) -> Self {
        Self {
            session,
            theme: HiveTheme::default(),
            turns: Vec::new(),
            scroll: 0,
            scroll_locked_to_bottom: true,
            input_buffer: String::new(),
            cursor_position: 0,
            notices: Vec::new(),
            status_message: None,
            // Load the story (and seed it if empty) before the first keypress.
            pending_action: Some(Action::Refresh),
            busy: false,
            should_quit: false,
        }
    }

    pub fn input_buffer(&self) -> &str {
        &self.input_buffer
    }

    pub fn cursor_position(&self) -> usize {
        self.cursor_position
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    pub fn turn_state(&self) -> TurnState {
        TurnState::of(&self.turns)
    }

    /// Queue the current draft for submission and clear the input line.
    pub fn submit_input(&mut self) {
        if self.input_buffer.trim().is_empty() {
            return;
        }
        let draft = std::mem::take(&mut self.input_buffer);
        self.cursor_position = 0;
        self.pending_action = Some(Action::Submit(draft));
    }

    pub fn request_refresh(&mut self) {
        self.pending_action = Some(Action::Refresh);
    }

    /// Mark the start of an action and say what is happening.
    pub fn begin(&mut self, action: &Action) {
        self.busy = true;
        let status = match action {
            Action::Submit(_) => format!(
                "{} is reading the shared story and thinking...",
                self.session.narrator().persona().name
            ),
            Action::Refresh => "Fetching the latest story...".to_string(),
        };
        self.set_status(status);
    }

    /// Take in the result of an action.
    pub fn apply(&mut self, update: Update) {
        self.busy = false;
        self.status_message = None;
        self.turns = update.turns;
        self.notices = update.notices;

        if let Some(draft) = update.outcome.as_ref().and_then(SubmitOutcome::returned_draft) {
            // Give the draft back so the player can edit and resend it.
            self.input_buffer = draft.to_string();
            self.cursor_end();
        }

        if self.scroll_locked_to_bottom {
            self.scroll_to_bottom();
        }
    }

    /// Scroll story to bottom and lock to bottom
    pub fn scroll_to_bottom(&mut self) {
        // The widget caps this to the real maximum.
        self.scroll = usize::MAX / 2;
        self.scroll_locked_to_bottom = true;
    }

    /// Rough line count of the rendered story, assuming ~60 columns.
    fn estimate_max_scroll(&self) -> usize {
        const ESTIMATED_WIDTH: usize = 60;
        const ESTIMATED_VISIBLE_HEIGHT: usize = 20;

        let estimated_lines: usize = self
            .turns
            .iter()
            .map(|turn| {
                turn.content
                    .lines()
                    .map(|line| (line.chars().count() / ESTIMATED_WIDTH).max(1))
                    .sum::<usize>()
                    + 1
            })
            .sum();

        estimated_lines.saturating_sub(ESTIMATED_VISIBLE_HEIGHT)
    }

    /// Scroll up (unlocks from bottom)
    pub fn scroll_up(&mut self, lines: usize) {
        let max_scroll = self.estimate_max_scroll();
        if self.scroll > max_scroll {
            self.scroll = max_scroll;
        }
        self.scroll = self.scroll.saturating_sub(lines);
        self.scroll_locked_to_bottom = false;
    }

    /// Scroll down; reaching the estimated end re-locks to the bottom.
    pub fn scroll_down(&mut self, lines: usize) {
        let max_scroll = self.estimate_max_scroll();
        self.scroll = self.scroll.saturating_add(lines);
        if self.scroll >= max_scroll {
            self.scroll_to_bottom();
        }
    }

    /// Insert a typed character at the cursor (unicode-safe)
    pub fn type_char(&mut self, c: char) {
        let byte_pos = self
            .input_buffer
            .char_indices()
            .nth(self.cursor_position)
            .map(|(i, _)| i)
            .unwrap_or(self.input_buffer.len());
        self.input_buffer.insert(byte_pos, c);
        self.cursor_position += 1;
    }

    /// Handle backspace (unicode-safe)
    pub fn backspace(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
            if let Some((byte_pos, ch)) = self.input_buffer.char_indices().nth(self.cursor_position)
            {
                self.input_buffer
                    .replace_range(byte_pos..byte_pos + ch.len_utf8(), "");
            }
        }
    }

    /// Handle delete (unicode-safe)
    pub fn delete(&mut self) {
        if let Some((byte_pos, ch)) = self.input_buffer.char_indices().nth(self.cursor_position) {
            self.input_buffer
                .replace_range(byte_pos..byte_pos + ch.len_utf8(), "");
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        let char_count = self.input_buffer.chars().count();
        self.cursor_position = (self.cursor_position + 1).min(char_count);
    }

    pub fn cursor_home(&mut self) {
        self.cursor_position = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor_position = self.input_buffer.chars().count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_core::{MemoryStore, Narrator, NoModeration, ScriptedGenerator};
    use std::sync::Arc;

    fn app() -> App {
        let session = StorySession::new(
            Arc::new(MemoryStore::new()),
            Narrator::new(Arc::new(ScriptedGenerator::new())),
            Arc::new(NoModeration),
        );
        App::new(session)
    }

    #[test]
    fn test_starts_with_refresh() {
        let app = app();
        assert_eq!(app.pending_action, Some(Action::Refresh));
    }

    #[test]
    fn test_unicode_editing() {
        let mut app = app();
        for c in "螺螄粉".chars() {
            app.type_char(c);
        }
        app.cursor_left();
        app.backspace();
        assert_eq!(app.input_buffer(), "螺粉");
        assert_eq!(app.cursor_position(), 1);

        app.delete();
        assert_eq!(app.input_buffer(), "螺");
        app.cursor_home();
        app.type_char('a');
        assert_eq!(app.input_buffer(), "a螺");
    }

    #[test]
    fn test_submit_clears_input() {
        let mut app = app();
        app.pending_action = None;
        for c in "hello".chars() {
            app.type_char(c);
        }
        app.submit_input();
        assert_eq!(app.pending_action, Some(Action::Submit("hello".to_string())));
        assert_eq!(app.input_buffer(), "");
        assert_eq!(app.cursor_position(), 0);
    }

    #[test]
    fn test_blank_input_not_submitted() {
        let mut app = app();
        app.pending_action = None;
        app.type_char(' ');
        app.submit_input();
        assert_eq!(app.pending_action, None);
    }

    #[test]
    fn test_blocked_draft_returns_to_input() {
        let mut app = app();
        app.apply(Update {
            turns: Vec::new(),
            notices: vec![Notice::warning("blocked")],
            outcome: Some(SubmitOutcome::Blocked {
                draft: "rude words".to_string(),
            }),
        });
        assert_eq!(app.input_buffer(), "rude words");
        assert_eq!(app.cursor_position(), 10);
        assert_eq!(app.notices().len(), 1);
    }

    #[test]
    fn test_scroll_up_unlocks_bottom() {
        let mut app = app();
        app.scroll_to_bottom();
        app.scroll_up(3);
        assert!(!app.scroll_locked_to_bottom);
        app.scroll_down(100);
        assert!(app.scroll_locked_to_bottom);
    }
}
