//! Render orchestration for the story TUI

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::App;
use crate::ui::widgets::{InputWidget, TranscriptWidget};

const TITLE: &str = " 🐌 PROJECT: SNAIL_HIVE_MIND ";
const CAPTION: &str = "/// multiplayer live edition /// one shared story ///";
const HOTKEYS: &str = "Enter send | Ctrl+R refresh | Esc quit";

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let [title_area, story_area, status_area, input_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(1),
        Constraint::Length(3),
    ])
    .areas(frame.area());

    render_title_bar(frame, app, title_area);

    let thinking = if app.busy { app.status_message() } else { None };
    let transcript = TranscriptWidget::new(&app.turns, &app.theme)
        .scroll(app.scroll)
        .thinking(thinking);
    frame.render_widget(transcript, story_area);

    render_status_bar(frame, app, status_area);

    let placeholder = if app.busy {
        "Waiting for the story to settle..."
    } else {
        crate::ui::widgets::input::DEFAULT_PLACEHOLDER
    };
    let input = InputWidget::new(app.input_buffer(), &app.theme)
        .cursor_position(app.cursor_position())
        .active(!app.busy)
        .placeholder(placeholder);
    frame.render_widget(input, input_area);
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let line = Line::from(vec![
        Span::styled(TITLE, app.theme.title_style()),
        Span::styled(CAPTION, app.theme.system_style()),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// Turn state, then the latest notice (or status), then the hotkeys.
fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let state = app.turn_state();
    let mut spans = vec![
        Span::styled(format!(" {} ", state.label()), app.theme.state_style(state)),
        Span::raw("| "),
    ];

    if let Some(notice) = app.notices().last() {
        spans.push(Span::styled(
            notice.message.clone(),
            app.theme.notice_style(notice.level),
        ));
    } else if let Some(status) = app.status_message() {
        spans.push(Span::raw(status.to_string()));
    }

    spans.push(Span::raw(" | "));
    spans.push(Span::styled(
        HOTKEYS,
        Style::default().add_modifier(Modifier::DIM),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_core::{MemoryStore, Narrator, NoModeration, Notice, ScriptedGenerator, StorySession};
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;

    fn screen(app: &App) -> String {
        let backend = TestBackend::new(100, 12);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn app() -> App {
        let session = StorySession::new(
            Arc::new(MemoryStore::new()),
            Narrator::new(Arc::new(ScriptedGenerator::new())),
            Arc::new(NoModeration),
        );
        App::new(session)
    }

    #[test]
    fn test_renders_title_and_placeholder() {
        let text = screen(&app());
        assert!(text.contains("PROJECT: SNAIL_HIVE_MIND"));
        assert!(text.contains("Contribute to the story"));
    }

    #[test]
    fn test_status_bar_prefers_notices() {
        let mut app = app();
        app.set_status("quiet");
        app.apply(hive_core::Update {
            turns: Vec::new(),
            notices: vec![Notice::error("narrator offline")],
            outcome: None,
        });
        let text = screen(&app);
        assert!(text.contains("narrator offline"));
    }
}
