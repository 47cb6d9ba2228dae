//! The story store: an append-only, ordered log of turns.
//!
//! Every backend follows the same access pattern: fetch the whole log sorted
//! by `(created_at, id)`, or insert exactly one row. Nothing is ever updated
//! or deleted.

mod memory;
mod postgrest;
mod sqlite;

pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;
pub use sqlite::SqliteStore;
pub(crate) use sqlite::sqlite_path_from_url;

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::turn::{Role, Turn};
use async_trait::async_trait;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::sync::Arc;
use tracing::info;

/// Persistent story log.
#[async_trait]
pub trait StoryStore: Send + Sync {
    /// All turns, oldest first.
    async fn load(&self) -> Result<Vec<Turn>, StoreError>;

    /// Append one turn. The store assigns `id` and `created_at`.
    async fn append(&self, role: Role, content: &str) -> Result<Turn, StoreError>;

    /// Backend name for logs and status lines.
    fn name(&self) -> &str;
}

/// Build the configured backend.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn StoryStore>, StoreError> {
    let store: Arc<dyn StoryStore> = match config {
        StoreConfig::Memory => Arc::new(MemoryStore::new()),
        StoreConfig::Sqlite { path, table } => {
            Arc::new(SqliteStore::open_with_table(path, table).await?)
        }
        StoreConfig::Postgrest { url, key, table } => {
            Arc::new(PostgrestStore::new(url, key.clone()).with_table(table))
        }
    };
    info!(backend = store.name(), "story store ready");
    Ok(store)
}

/// Timestamp for a new turn: now, unless that would not advance past `last`.
///
/// Truncated to microseconds, the precision every backend stores.
pub(crate) fn next_timestamp(last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now().trunc_subsecs(6);
    match last {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_timestamp_advances_past_future_entries() {
        let future = Utc::now() + Duration::hours(1);
        let next = next_timestamp(Some(future));
        assert_eq!(next, future + Duration::microseconds(1));
    }

    #[test]
    fn test_next_timestamp_uses_clock() {
        let past = Utc::now() - Duration::hours(1);
        let next = next_timestamp(Some(past));
        assert!(next > past + Duration::minutes(59));
        assert_eq!(next.timestamp_subsec_nanos() % 1_000, 0);
    }

    #[tokio::test]
    async fn test_open_memory_store() {
        let store = open_store(&StoreConfig::Memory).await.unwrap();
        assert_eq!(store.name(), "memory");
        assert!(store.load().await.unwrap().is_empty());
    }
}
