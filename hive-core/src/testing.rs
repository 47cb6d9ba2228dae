//! Testing utilities for the story engine.
//!
//! This module provides tools for testing without network access:
//! - `ScriptedGenerator` for deterministic narrator and moderator replies
//! - `FailingStore` for exercising store outages and stale reads
//! - `TestHarness` for scripted session scenarios
//! - Assertion helpers for verifying the log

use crate::error::{GenerationError, StoreError};
use crate::generate::TextGenerator;
use crate::moderation::AiModerator;
use crate::narrator::Narrator;
use crate::session::{SessionConfig, StorySession, Update};
use crate::store::{MemoryStore, StoryStore};
use crate::turn::{Role, Turn};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One scripted generator reply.
#[derive(Debug, Clone)]
pub enum Scripted {
    Reply(String),
    Fail(String),
    /// The provider's safety filter blocks the call with this reason.
    Refuse(String),
}

/// A text generator that returns scripted replies in order.
///
/// Every prompt it receives is recorded. Once the script runs out, each call
/// fails as if the service were unreachable.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Scripted>>,
    prompts: Mutex<Vec<String>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn then_reply(self, text: impl Into<String>) -> Self {
        self.push_reply(text);
        self
    }

    /// Queue a service failure.
    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.push_failure(message);
        self
    }

    /// Queue a provider safety refusal.
    pub fn then_refuse(self, reason: impl Into<String>) -> Self {
        self.push_refusal(reason);
        self
    }

    pub fn push_reply(&self, text: impl Into<String>) {
        locked(&self.script).push_back(Scripted::Reply(text.into()));
    }

    pub fn push_failure(&self, message: impl Into<String>) {
        locked(&self.script).push_back(Scripted::Fail(message.into()));
    }

    pub fn push_refusal(&self, reason: impl Into<String>) {
        locked(&self.script).push_back(Scripted::Refuse(reason.into()));
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        locked(&self.prompts).clone()
    }

    /// Number of generate calls so far.
    pub fn calls(&self) -> usize {
        locked(&self.prompts).len()
    }

    /// Scripted entries not yet consumed.
    pub fn remaining(&self) -> usize {
        locked(&self.script).len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        locked(&self.prompts).push(prompt.to_string());
        match locked(&self.script).pop_front() {
            Some(Scripted::Reply(text)) => Ok(text),
            Some(Scripted::Fail(message)) => Err(GenerationError::Unavailable(message)),
            Some(Scripted::Refuse(reason)) => {
                Err(GenerationError::Service(gemini::Error::Blocked { reason }))
            }
            None => Err(GenerationError::Unavailable(
                "no more scripted replies".to_string(),
            )),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// A memory store with switchable faults.
///
/// Loads and appends can be made to fail, and loads can be made to report an
/// empty log for a number of calls, as a reader racing a fresh store would.
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_loads: AtomicBool,
    fail_appends: AtomicBool,
    stale_loads: AtomicUsize,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every call fails.
    pub fn unavailable() -> Self {
        let store = Self::new();
        store.fail_loads(true);
        store.fail_appends(true);
        store
    }

    /// The underlying log, bypassing all faults.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Report an empty log for the next `loads` successful loads.
    pub fn report_empty_for(&self, loads: usize) {
        self.stale_loads.store(loads, Ordering::SeqCst);
    }
}

#[async_trait]
impl StoryStore for FailingStore {
    async fn load(&self) -> Result<Vec<Turn>, StoreError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected load failure".to_string()));
        }
        let stale = self
            .stale_loads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stale {
            return Ok(Vec::new());
        }
        self.inner.load().await
    }

    async fn append(&self, role: Role, content: &str) -> Result<Turn, StoreError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected append failure".to_string()));
        }
        self.inner.append(role, content).await
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Test harness for running story scenarios.
///
/// The session runs over a [`FailingStore`] with a scripted narrator and an
/// [`AiModerator`] backed by its own scripted generator.
pub struct TestHarness {
    /// The story log.
    pub store: Arc<FailingStore>,
    /// Generator behind the narrator.
    pub narrator: Arc<ScriptedGenerator>,
    /// Generator behind the moderation gate.
    pub moderator: Arc<ScriptedGenerator>,
    /// The session under test.
    pub session: StorySession,
}

impl TestHarness {
    /// Create a new harness over an empty store.
    pub fn new() -> Self {
        let store = Arc::new(FailingStore::new());
        let narrator = Arc::new(ScriptedGenerator::new());
        let moderator = Arc::new(ScriptedGenerator::new());
        let session = StorySession::new(
            store.clone(),
            Narrator::new(narrator.clone()),
            Arc::new(AiModerator::new(moderator.clone())),
        );

        Self {
            store,
            narrator,
            moderator,
            session,
        }
    }

    pub fn with_config(self, config: SessionConfig) -> Self {
        Self {
            session: self.session.with_config(config),
            ..self
        }
    }

    /// Queue a narrator reply.
    pub fn expect_reply(&self, text: impl Into<String>) -> &Self {
        self.narrator.push_reply(text);
        self
    }

    /// Queue a narrator outage.
    pub fn expect_narrator_failure(&self, message: impl Into<String>) -> &Self {
        self.narrator.push_failure(message);
        self
    }

    /// Queue a raw moderation reply, e.g. `"PASS"` or `"BLOCK"`.
    pub fn expect_verdict(&self, reply: impl Into<String>) -> &Self {
        self.moderator.push_reply(reply);
        self
    }

    /// Queue a moderation outage.
    pub fn expect_moderator_failure(&self, message: impl Into<String>) -> &Self {
        self.moderator.push_failure(message);
        self
    }

    /// Queue a refusal from the provider's safety filter on the moderation call.
    pub fn expect_moderator_refusal(&self, reason: impl Into<String>) -> &Self {
        self.moderator.push_refusal(reason);
        self
    }

    pub async fn submit(&self, draft: &str) -> Update {
        self.session.submit(draft).await
    }

    pub async fn refresh(&self) -> Update {
        self.session.refresh().await
    }

    /// The stored log, bypassing faults.
    pub async fn turns(&self) -> Vec<Turn> {
        self.store.inner().load().await.unwrap_or_default()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the roles of the log, in order.
#[track_caller]
pub fn assert_roles(turns: &[Turn], expected: &[Role]) {
    let actual: Vec<Role> = turns.iter().map(|t| t.role).collect();
    assert_eq!(actual, expected, "Expected roles {expected:?}, got {actual:?}");
}

/// Assert the last turn's role and content.
#[track_caller]
pub fn assert_last_turn(turns: &[Turn], role: Role, content: &str) {
    let Some(last) = turns.last() else {
        panic!("Expected a non-empty log");
    };
    assert_eq!(
        (last.role, last.content.as_str()),
        (role, content),
        "Expected last turn {role}: {content:?}, got {last}"
    );
}

/// Assert an update carries no error notices.
#[track_caller]
pub fn assert_no_errors(update: &Update) {
    assert!(
        !update.has_errors(),
        "Expected no errors, got {:?}",
        update.notices
    );
}

/// Assert `created_at` strictly increases along the log.
#[track_caller]
pub fn assert_strictly_ordered(turns: &[Turn]) {
    for pair in turns.windows(2) {
        assert!(
            pair[0].created_at < pair[1].created_at,
            "Expected {} before {}",
            pair[0].created_at,
            pair[1].created_at
        );
    }
}
