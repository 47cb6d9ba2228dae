use super::{next_timestamp, StoryStore};
use crate::error::StoreError;
use crate::turn::{Role, Turn};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// In-process story log. Lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    turns: Mutex<Vec<Turn>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored turns.
    pub async fn len(&self) -> usize {
        self.turns.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.turns.lock().await.is_empty()
    }
}

#[async_trait]
impl StoryStore for MemoryStore {
    async fn load(&self) -> Result<Vec<Turn>, StoreError> {
        // Appends are strictly increasing, so insertion order is log order.
        Ok(self.turns.lock().await.clone())
    }

    async fn append(&self, role: Role, content: &str) -> Result<Turn, StoreError> {
        let mut turns = self.turns.lock().await;
        let last = turns.last();
        let turn = Turn {
            id: last.map_or(1, |t| t.id + 1),
            role,
            content: content.to_string(),
            created_at: next_timestamp(last.map(|t| t.created_at)),
        };
        turns.push(turn.clone());
        Ok(turn)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
