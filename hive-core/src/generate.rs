//! Text-generation service seam.
//!
//! The narrator and the AI moderator both talk to the model through
//! [`TextGenerator`], so tests can swap in a scripted fake.

use crate::error::GenerationError;
use async_trait::async_trait;
use gemini::Gemini;
use tracing::debug;

/// A service that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a reply for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

#[async_trait]
impl TextGenerator for Gemini {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        debug!(model = self.model(), prompt_chars = prompt.len(), "generateContent request");
        let text = self.generate_text(prompt).await.map_err(|e| match e {
            gemini::Error::Empty => GenerationError::EmptyReply,
            other => GenerationError::Service(other),
        })?;
        debug!(reply_chars = text.len(), "generateContent reply");
        Ok(text)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
