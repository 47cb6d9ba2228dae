//! Widgets for the story TUI

pub mod input;
pub mod transcript;

pub use input::InputWidget;
pub use transcript::TranscriptWidget;
