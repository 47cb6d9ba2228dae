//! Color theme and styling for the story TUI

use hive_core::{NoticeLevel, Role, TurnState};
use ratatui::style::{Color, Modifier, Style};

/// UI color theme
#[derive(Debug, Clone)]
pub struct HiveTheme {
    pub border: Color,
    pub border_focused: Color,
    pub title: Color,

    pub player_text: Color,
    pub narrator_text: Color,
    pub system_text: Color,

    pub warning: Color,
    pub error: Color,
    pub waiting_for_user: Color,
    pub waiting_for_ai: Color,
}

impl Default for HiveTheme {
    fn default() -> Self {
        Self {
            border: Color::DarkGray,
            border_focused: Color::Cyan,
            title: Color::LightGreen,

            player_text: Color::Cyan,
            narrator_text: Color::White,
            system_text: Color::DarkGray,

            warning: Color::Yellow,
            error: Color::LightRed,
            waiting_for_user: Color::LightGreen,
            waiting_for_ai: Color::Yellow,
        }
    }
}

impl HiveTheme {
    /// Style for a turn's text
    pub fn turn_style(&self, role: Role) -> Style {
        match role {
            Role::Assistant => self.narrator_style(),
            Role::User => self.player_style(),
        }
    }

    pub fn narrator_style(&self) -> Style {
        Style::default().fg(self.narrator_text)
    }

    pub fn player_style(&self) -> Style {
        Style::default()
            .fg(self.player_text)
            .add_modifier(Modifier::ITALIC)
    }

    pub fn system_style(&self) -> Style {
        Style::default()
            .fg(self.system_text)
            .add_modifier(Modifier::DIM)
    }

    pub fn notice_style(&self, level: NoticeLevel) -> Style {
        match level {
            NoticeLevel::Info => self.system_style(),
            NoticeLevel::Warning => Style::default().fg(self.warning),
            NoticeLevel::Error => Style::default()
                .fg(self.error)
                .add_modifier(Modifier::BOLD),
        }
    }

    pub fn state_style(&self, state: TurnState) -> Style {
        let color = match state {
            TurnState::WaitingForUser => self.waiting_for_user,
            TurnState::WaitingForAi => self.waiting_for_ai,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }

    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.title)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border_style(&self, focused: bool) -> Style {
        Style::default().fg(if focused {
            self.border_focused
        } else {
            self.border
        })
    }
}
