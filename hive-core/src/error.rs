//! Error types for the story engine.
//!
//! Store and generation errors are recoverable: the session catches them and
//! turns them into notices. Configuration errors are fatal at startup.

use thiserror::Error;

/// Any failure to read from or write to the story log.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed row: {0}")]
    Malformed(String),
}

/// The text-generation service could not produce a usable reply.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation service error: {0}")]
    Service(#[from] gemini::Error),

    #[error("generation service returned no text")]
    EmptyReply,

    #[error("generation unavailable: {0}")]
    Unavailable(String),
}

impl GenerationError {
    /// The provider's own safety filter refused the prompt or its reply.
    pub fn is_content_block(&self) -> bool {
        matches!(self, GenerationError::Service(gemini::Error::Blocked { .. }))
    }
}

/// Configuration errors, reported before anything else starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} is not set")]
    Missing { key: String },

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}
