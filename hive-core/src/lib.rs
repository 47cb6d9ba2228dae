//! Shared collaborative-fiction story log with an AI narrator.
//!
//! This crate provides:
//! - An append-only story log with memory, SQLite and PostgREST backends
//! - Turn arbitration decided from the last turn of the log
//! - An optional AI moderation gate for player submissions
//! - An AI narrator that continues the story, powered by Gemini
//!
//! # Quick Start
//!
//! ```ignore
//! use hive_core::{Action, HiveConfig, StorySession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HiveConfig::from_env()?;
//!     let session = StorySession::from_config(&config).await?;
//!
//!     let update = session.handle(Action::Submit("I hand over a bowl of noodles".into())).await;
//!     for turn in &update.turns {
//!         println!("{turn}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod arbiter;
pub mod config;
pub mod error;
pub mod generate;
pub mod moderation;
pub mod narrator;
pub mod session;
pub mod store;
pub mod testing;
pub mod turn;

// Primary public API
pub use arbiter::{next_actor, NextActor, TurnState};
pub use config::{HiveConfig, StoreConfig};
pub use error::{ConfigError, GenerationError, StoreError};
pub use generate::TextGenerator;
pub use moderation::{AiModerator, Moderator, NoModeration, Verdict};
pub use narrator::{Narrator, Persona};
pub use session::{Action, Notice, NoticeLevel, SessionConfig, StorySession, SubmitOutcome, Update};
pub use store::{open_store, MemoryStore, PostgrestStore, SqliteStore, StoryStore};
pub use testing::{FailingStore, ScriptedGenerator, TestHarness};
pub use turn::{Role, Turn};
