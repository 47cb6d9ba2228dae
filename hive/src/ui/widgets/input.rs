//! Input field widget

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::ui::theme::HiveTheme;

pub const DEFAULT_PLACEHOLDER: &str = "Contribute to the story (it is recorded permanently)...";

/// Single-line draft editor
pub struct InputWidget<'a> {
    content: &'a str,
    cursor_position: usize,
    theme: &'a HiveTheme,
    placeholder: &'a str,
    is_active: bool,
}

impl<'a> InputWidget<'a> {
    pub fn new(content: &'a str, theme: &'a HiveTheme) -> Self {
        Self {
            content,
            cursor_position: content.chars().count(),
            theme,
            placeholder: DEFAULT_PLACEHOLDER,
            is_active: true,
        }
    }

    pub fn cursor_position(mut self, pos: usize) -> Self {
        self.cursor_position = pos;
        self
    }

    pub fn placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = placeholder;
        self
    }

    /// An inactive field is dimmed while a request is in flight.
    pub fn active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    fn line(&self) -> Line<'a> {
        if self.content.is_empty() {
            return Line::from(vec![
                Span::styled("> ", self.theme.player_style()),
                Span::styled(
                    self.placeholder,
                    Style::default().add_modifier(Modifier::DIM),
                ),
            ]);
        }

        let before_cursor: String = self.content.chars().take(self.cursor_position).collect();
        let at_cursor = self
            .content
            .chars()
            .nth(self.cursor_position)
            .map(|c| c.to_string())
            .unwrap_or_else(|| " ".to_string());
        let after_cursor: String = self.content.chars().skip(self.cursor_position + 1).collect();

        let cursor_style = if self.is_active {
            Style::default()
                .add_modifier(Modifier::UNDERLINED | Modifier::BOLD)
                .fg(self.theme.player_text)
        } else {
            Style::default()
        };

        Line::from(vec![
            Span::styled("> ", self.theme.player_style()),
            Span::raw(before_cursor),
            Span::styled(at_cursor, cursor_style),
            Span::raw(after_cursor),
        ])
    }
}

impl Widget for InputWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(self.is_active));

        let inner = block.inner(area);
        block.render(area, buf);

        let mut paragraph = Paragraph::new(self.line());
        if !self.is_active {
            paragraph = paragraph.style(Style::default().add_modifier(Modifier::DIM));
        }
        paragraph.render(inner, buf);
    }
}
