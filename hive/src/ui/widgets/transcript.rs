//! Story transcript widget

use hive_core::{Role, Turn};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols::scrollbar,
    text::{Line, Span},
    widgets::{
        Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState,
        StatefulWidget, Widget, Wrap,
    },
};

use crate::ui::theme::HiveTheme;

pub const NARRATOR_AVATAR: &str = "🐌";
pub const PLAYER_AVATAR: &str = "🧑";

/// Widget for the shared story, oldest turn first
pub struct TranscriptWidget<'a> {
    turns: &'a [Turn],
    scroll: usize,
    theme: &'a HiveTheme,
    thinking: Option<&'a str>,
}

impl<'a> TranscriptWidget<'a> {
    pub fn new(turns: &'a [Turn], theme: &'a HiveTheme) -> Self {
        Self {
            turns,
            scroll: 0,
            theme,
            thinking: None,
        }
    }

    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }

    /// Show a pending line under the last turn while an action runs.
    pub fn thinking(mut self, status: Option<&'a str>) -> Self {
        self.thinking = status;
        self
    }

    fn lines(&self) -> Vec<Line<'a>> {
        let mut lines = Vec::new();

        for turn in self.turns {
            let style = self.theme.turn_style(turn.role);
            let avatar = match turn.role {
                Role::Assistant => NARRATOR_AVATAR,
                Role::User => PLAYER_AVATAR,
            };

            for (i, line) in turn.content.lines().enumerate() {
                let gutter = if i == 0 {
                    format!("{avatar} ")
                } else {
                    "   ".to_string()
                };
                lines.push(Line::from(vec![
                    Span::raw(gutter),
                    Span::styled(line.to_string(), style),
                ]));
            }
            lines.push(Line::from(""));
        }

        if let Some(status) = self.thinking {
            let style = self.theme.narrator_style().add_modifier(Modifier::DIM);
            lines.push(Line::from(Span::styled(
                format!("{NARRATOR_AVATAR} {status}"),
                style,
            )));
        }

        lines
    }
}

impl Widget for TranscriptWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title(" Story [PgUp/PgDn scroll] ")
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(false));

        let inner = block.inner(area);
        block.render(area, buf);

        // The last column is kept for the scrollbar.
        let text_area = Rect {
            width: inner.width.saturating_sub(1),
            ..inner
        };
        let paragraph = Paragraph::new(self.lines()).wrap(Wrap { trim: false });

        let visible_height = inner.height as usize;
        let total_lines = paragraph.line_count(text_area.width);
        let max_scroll = total_lines.saturating_sub(visible_height);
        let scroll = self.scroll.min(max_scroll);

        paragraph
            .scroll((scroll.min(u16::MAX as usize) as u16, 0))
            .render(text_area, buf);

        if total_lines > visible_height {
            let scrollbar_area = Rect {
                x: inner.x + inner.width.saturating_sub(1),
                y: inner.y,
                width: 1,
                height: inner.height,
            };

            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .symbols(scrollbar::VERTICAL)
                .thumb_style(Style::default().fg(Color::DarkGray))
                .track_style(Style::default().fg(Color::Black))
                .begin_symbol(Some("↑"))
                .end_symbol(Some("↓"));

            let mut scrollbar_state = ScrollbarState::new(max_scroll).position(scroll);
            scrollbar.render(scrollbar_area, buf, &mut scrollbar_state);

            if scroll < max_scroll {
                let hint = format!(" ↓{} more ", max_scroll - scroll);
                let hint_y = inner.y + inner.height.saturating_sub(1);
                let hint_style = Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::DIM);
                for (i, ch) in hint.chars().enumerate() {
                    let x = inner.x + (i as u16);
                    if x < inner.x + inner.width.saturating_sub(2) {
                        buf[(x, hint_y)].set_char(ch).set_style(hint_style);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(id: i64, role: Role, content: &str) -> Turn {
        Turn {
            id,
            role,
            content: content.to_string(),
            created_at: Default::default(),
        }
    }

    fn rendered(widget: TranscriptWidget, width: u16, height: u16) -> String {
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        buf.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_lines_per_turn() {
        let theme = HiveTheme::default();
        let turns = vec![
            turn(1, Role::Assistant, "Link established."),
            turn(2, Role::User, "first line\nsecond line"),
        ];
        let widget = TranscriptWidget::new(&turns, &theme);
        // One line plus a spacer, then two lines plus a spacer.
        assert_eq!(widget.lines().len(), 5);
    }

    #[test]
    fn test_renders_content_and_thinking() {
        let theme = HiveTheme::default();
        let turns = vec![turn(1, Role::User, "hello")];
        let text = rendered(
            TranscriptWidget::new(&turns, &theme).thinking(Some("thinking")),
            40,
            8,
        );
        assert!(text.contains("hello"));
        assert!(text.contains("thinking"));
    }

    #[test]
    fn test_bottom_shows_end_of_wrapped_last_turn() {
        let theme = HiveTheme::default();
        let mut turns: Vec<Turn> = (1..=6)
            .map(|id| {
                let role = if id % 2 == 0 { Role::User } else { Role::Assistant };
                turn(id, role, &format!("short turn {id}"))
            })
            .collect();
        turns.push(turn(
            7,
            Role::Assistant,
            "The snail slurps the noodles loudly and then demands a second bowl, \
             extra sour bamboo, no peanuts, delivered before the broth cools LASTWORD",
        ));

        let text = rendered(
            TranscriptWidget::new(&turns, &theme).scroll(usize::MAX / 2),
            30,
            10,
        );
        assert!(text.contains("LASTWORD"));
        assert!(!text.contains("more"));
    }
}
