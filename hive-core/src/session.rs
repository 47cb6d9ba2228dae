//! StorySession - the request handler behind every front end.
//!
//! A session reacts to two discrete actions, `Submit` and `Refresh`. Each
//! action is one linear pass over the shared log (load, decide, act, reload)
//! and returns a fresh snapshot plus any notices for the player. Store and
//! generation failures never escape: they are logged and become notices.

use crate::arbiter::{next_actor, NextActor, TurnState};
use crate::config::HiveConfig;
use crate::error::StoreError;
use crate::generate::TextGenerator;
use crate::moderation::{AiModerator, Moderator, NoModeration, Verdict};
use crate::narrator::{Narrator, DEFAULT_CONTEXT_TURNS};
use crate::store::{open_store, StoryStore};
use crate::turn::{recent, Role, Turn};
use gemini::Gemini;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Tunables for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How many trailing turns the narrator sees.
    pub context_turns: usize,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self {
            context_turns: DEFAULT_CONTEXT_TURNS,
        }
    }

    pub fn with_context_turns(mut self, context_turns: usize) -> Self {
        self.context_turns = context_turns.max(1);
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Something a player did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Offer a new turn for the story.
    Submit(String),
    /// Reload the log and let the system act if it is its turn.
    Refresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message for the player about what happened during an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// What became of a submitted draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The draft was blank; nothing happened.
    Ignored,
    /// The draft was stored as a player turn.
    Accepted,
    /// Moderation rejected the draft. The store is untouched.
    Blocked { draft: String },
    /// The draft passed moderation but could not be stored.
    Unsaved { draft: String },
}

impl SubmitOutcome {
    /// The draft to hand back to the player, if it was not stored.
    pub fn returned_draft(&self) -> Option<&str> {
        match self {
            SubmitOutcome::Blocked { draft } | SubmitOutcome::Unsaved { draft } => Some(draft),
            SubmitOutcome::Ignored | SubmitOutcome::Accepted => None,
        }
    }
}

/// The result of one action: the log as it now stands, plus notices.
#[derive(Debug, Clone, Default)]
pub struct Update {
    pub turns: Vec<Turn>,
    pub notices: Vec<Notice>,
    /// Set for `Submit` actions only.
    pub outcome: Option<SubmitOutcome>,
}

impl Update {
    pub fn state(&self) -> TurnState {
        TurnState::of(&self.turns)
    }

    pub fn has_errors(&self) -> bool {
        self.notices.iter().any(|n| n.level == NoticeLevel::Error)
    }
}

/// The shared story, as seen by one front end.
pub struct StorySession {
    store: Arc<dyn StoryStore>,
    narrator: Narrator,
    moderator: Arc<dyn Moderator>,
    config: SessionConfig,
    /// Serializes system turns (seed and narration) within this process.
    writer: Mutex<()>,
}

impl StorySession {
    pub fn new(
        store: Arc<dyn StoryStore>,
        narrator: Narrator,
        moderator: Arc<dyn Moderator>,
    ) -> Self {
        Self {
            store,
            narrator,
            moderator,
            config: SessionConfig::default(),
            writer: Mutex::new(()),
        }
    }

    /// Build the production session: configured store, Gemini narrator and
    /// (unless disabled) Gemini moderation.
    pub async fn from_config(config: &HiveConfig) -> Result<Self, StoreError> {
        let store = open_store(&config.store).await?;
        let generator: Arc<dyn TextGenerator> =
            Arc::new(Gemini::new(config.api_key.expose_secret()).with_model(&config.model));
        let moderator: Arc<dyn Moderator> = if config.moderation {
            Arc::new(AiModerator::new(generator.clone()))
        } else {
            Arc::new(NoModeration)
        };

        info!(
            store = %config.store.describe(),
            model = %config.model,
            moderation = moderator.name(),
            "story session configured"
        );

        Ok(Self::new(store, Narrator::new(generator), moderator)
            .with_config(SessionConfig::new().with_context_turns(config.context_turns)))
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn narrator(&self) -> &Narrator {
        &self.narrator
    }

    /// Name of the store backend.
    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    /// Name of the moderation gate in use.
    pub fn moderator_name(&self) -> &str {
        self.moderator.name()
    }

    /// Run one action to completion.
    pub async fn handle(&self, action: Action) -> Update {
        match action {
            Action::Submit(draft) => self.submit(&draft).await,
            Action::Refresh => self.refresh().await,
        }
    }

    /// Reload, and seed or narrate if the system is due to act.
    pub async fn refresh(&self) -> Update {
        let mut notices = Vec::new();
        let turns = self.advance(&mut notices).await;
        Update {
            turns,
            notices,
            outcome: None,
        }
    }

    /// Offer a player turn: moderate, store, then let the narrator answer.
    pub async fn submit(&self, draft: &str) -> Update {
        let mut notices = Vec::new();

        if draft.trim().is_empty() {
            let turns = self.load(&mut notices).await.unwrap_or_default();
            return Update {
                turns,
                notices,
                outcome: Some(SubmitOutcome::Ignored),
            };
        }

        if self.moderator.classify(draft).await == Verdict::Block {
            info!(moderator = self.moderator.name(), "submission blocked");
            notices.push(Notice::warning(
                "Your contribution was blocked by moderation. Edit it and try again.",
            ));
            let turns = self.load(&mut notices).await.unwrap_or_default();
            return Update {
                turns,
                notices,
                outcome: Some(SubmitOutcome::Blocked {
                    draft: draft.to_string(),
                }),
            };
        }

        let outcome = match self.store.append(Role::User, draft).await {
            Ok(turn) => {
                info!(id = turn.id, "player turn appended");
                SubmitOutcome::Accepted
            }
            Err(e) => {
                warn!(error = %e, "failed to append player turn");
                notices.push(Notice::error(format!("Could not save your contribution: {e}")));
                SubmitOutcome::Unsaved {
                    draft: draft.to_string(),
                }
            }
        };

        let turns = self.advance(&mut notices).await;
        Update {
            turns,
            notices,
            outcome: Some(outcome),
        }
    }

    /// Load; if the system is due to act, act under the writer lock; reload.
    async fn advance(&self, notices: &mut Vec<Notice>) -> Vec<Turn> {
        let Some(turns) = self.load(notices).await else {
            return Vec::new();
        };
        if next_actor(&turns) == NextActor::User {
            return turns;
        }

        let _writer = self.writer.lock().await;
        // Another action in this process may have acted while we waited.
        let Some(turns) = self.load(notices).await else {
            return Vec::new();
        };
        match next_actor(&turns) {
            NextActor::User => turns,
            NextActor::Seed => self.seed(turns, notices).await,
            NextActor::Ai => self.narrate(turns, notices).await,
        }
    }

    async fn seed(&self, turns: Vec<Turn>, notices: &mut Vec<Notice>) -> Vec<Turn> {
        match self.store.append(Role::Assistant, &self.narrator.persona().seed).await {
            Ok(turn) => {
                info!(id = turn.id, "seeded empty story");
                self.load(notices).await.unwrap_or_default()
            }
            Err(e) => {
                warn!(error = %e, "failed to seed story");
                notices.push(Notice::error(format!("Could not start the story: {e}")));
                turns
            }
        }
    }

    async fn narrate(&self, turns: Vec<Turn>, notices: &mut Vec<Notice>) -> Vec<Turn> {
        let context = recent(&turns, self.config.context_turns);
        let reply = match self.narrator.generate_reply(context).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "narrator unavailable");
                notices.push(Notice::error(format!("The narrator dropped offline: {e}")));
                return turns;
            }
        };

        match self.store.append(Role::Assistant, &reply).await {
            Ok(turn) => {
                info!(id = turn.id, "narrator turn appended");
                self.load(notices).await.unwrap_or_default()
            }
            Err(e) => {
                warn!(error = %e, "failed to append narrator turn");
                notices.push(Notice::error(format!("Could not save the narrator's turn: {e}")));
                turns
            }
        }
    }

    /// Load the log. A failure becomes a warning notice and `None`.
    async fn load(&self, notices: &mut Vec<Notice>) -> Option<Vec<Turn>> {
        match self.store.load().await {
            Ok(turns) => Some(turns),
            Err(e) => {
                warn!(error = %e, backend = self.store.name(), "failed to load story");
                notices.push(Notice::warning(format!("Could not read the story: {e}")));
                None
            }
        }
    }
}
