//! Turn arbitration: who acts next, read off the tail of the log.
//!
//! The decision depends only on whether the log is empty and on the role of
//! its last turn. Two trailing narrator turns still mean "wait for a human".

use crate::turn::{Role, Turn};
use std::fmt;

/// Who must act next on the story log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextActor {
    /// The log is empty; the system appends the seed turn.
    Seed,
    /// A human wrote last; the narrator answers.
    Ai,
    /// The narrator wrote last; nothing happens until a human submits.
    User,
}

/// Decide who acts next.
pub fn next_actor(log: &[Turn]) -> NextActor {
    match log.last() {
        None => NextActor::Seed,
        Some(turn) => match turn.role {
            Role::User => NextActor::Ai,
            Role::Assistant => NextActor::User,
        },
    }
}

/// The two observable states of the story.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    WaitingForUser,
    WaitingForAi,
}

impl TurnState {
    /// An empty log waits on the system, which seeds it.
    pub fn of(log: &[Turn]) -> Self {
        match next_actor(log) {
            NextActor::User => TurnState::WaitingForUser,
            NextActor::Seed | NextActor::Ai => TurnState::WaitingForAi,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TurnState::WaitingForUser => "waiting for a player",
            TurnState::WaitingForAi => "waiting for the narrator",
        }
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
