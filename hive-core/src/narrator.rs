//! The AI narrator: continues the shared story from its recent turns.

use crate::error::GenerationError;
use crate::generate::TextGenerator;
use crate::turn::{transcript, Turn};
use std::sync::Arc;
use tracing::info;

/// How many trailing turns the narrator sees by default.
pub const DEFAULT_CONTEXT_TURNS: usize = 20;

/// The narrator's character and house style.
#[derive(Debug, Clone)]
pub struct Persona {
    /// Display name, used for avatars and status lines.
    pub name: String,
    /// Who the narrator is, the opening line of every prompt.
    pub identity: String,
    /// Tone instruction, the closing line of every prompt.
    pub style: String,
    /// Soft length guidance in characters. Not enforced.
    pub reply_chars: usize,
    /// The introductory turn appended to an empty log.
    pub seed: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            name: "Snail".to_string(),
            identity: "You are an embodied AI with an unshakeable obsession with luosifen, \
                       the river-snail rice noodle soup."
                .to_string(),
            style: "Keep it funny, chaotic and neutral.".to_string(),
            reply_chars: 100,
            seed: "[Server broadcast] Link established. I am the AI who craves luosifen. \
                   Can anyone deliver me some takeout?"
                .to_string(),
        }
    }
}

impl Persona {
    pub fn new(name: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity: identity.into(),
            ..Self::default()
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    pub fn with_reply_chars(mut self, reply_chars: usize) -> Self {
        self.reply_chars = reply_chars;
        self
    }

    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = seed.into();
        self
    }
}

/// Produces the next narrator turn.
pub struct Narrator {
    generator: Arc<dyn TextGenerator>,
    persona: Persona,
}

impl Narrator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            persona: Persona::default(),
        }
    }

    pub fn with_persona(mut self, persona: Persona) -> Self {
        self.persona = persona;
        self
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    /// The full prompt for a continuation of `recent`.
    pub fn build_prompt(&self, recent: &[Turn]) -> String {
        format!(
            "{identity}\n\
             This is the story everyone has been writing together so far:\n\
             {history}\n\
             \n\
             Continue it with one short passage (about {chars} characters).\n\
             Note: this is a multiplayer game, so respond to what the last human player did.\n\
             {style}",
            identity = self.persona.identity,
            history = transcript(recent),
            chars = self.persona.reply_chars,
            style = self.persona.style,
        )
    }

    /// Generate the next narrator turn from the caller's window of recent turns.
    ///
    /// A reply that is empty after trimming is an error; nothing should be
    /// appended for it.
    pub async fn generate_reply(&self, recent: &[Turn]) -> Result<String, GenerationError> {
        let prompt = self.build_prompt(recent);
        let reply = self.generator.generate(&prompt).await?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(GenerationError::EmptyReply);
        }
        info!(
            generator = self.generator.name(),
            context_turns = recent.len(),
            reply_chars = reply.chars().count(),
            "narrator replied"
        );
        Ok(reply.to_string())
    }
}
