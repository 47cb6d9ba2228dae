//! SQLite backend for the story log.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteRow,
};
use sqlx::Row;
use tracing::{info, warn};

use super::{next_timestamp, StoryStore};
use crate::config::DEFAULT_TABLE;
use crate::error::StoreError;
use crate::turn::{format_timestamp, parse_timestamp, Role, Turn};

/// How long a writer waits for another connection's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// SQLite-backed story log.
pub struct SqliteStore {
    pool: SqlitePool,
    table: String,
}

/// Strip a `sqlite://` or `sqlite:` prefix, leaving a file path or `:memory:`.
pub(crate) fn sqlite_path_from_url(url: &str) -> String {
    let url = url.trim();
    url.strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url)
        .to_string()
}

fn is_memory_path(path: &str) -> bool {
    path.is_empty() || path == "memory" || path == ":memory:"
}

impl SqliteStore {
    /// Open (creating if missing) the default `story_logs` table at `path`.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        Self::open_with_table(path, DEFAULT_TABLE).await
    }

    /// Open a store on a named table. `:memory:` gives a private in-memory database.
    pub async fn open_with_table(path: &str, table: &str) -> Result<Self, StoreError> {
        let path = sqlite_path_from_url(path);
        let pool = if is_memory_path(&path) {
            // One connection that never recycles, or the database vanishes with it.
            SqlitePoolOptions::new()
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(SqliteConnectOptions::from_str("sqlite::memory:")?)
                .await?
        } else {
            let opts = SqliteConnectOptions::new()
                .filename(&path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .busy_timeout(BUSY_TIMEOUT);
            SqlitePoolOptions::new()
                .max_connections(4)
                .connect_with(opts)
                .await?
        };

        let store = Self {
            pool,
            table: table.to_string(),
        };
        store.run_migrations().await?;
        info!(path = %path, table = %store.table, "opened sqlite story store");
        Ok(store)
    }

    /// Create the table if missing. There is no other migration.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        let stmts = [
            format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    role TEXT NOT NULL,
                    content TEXT NOT NULL,
                    created_at TEXT NOT NULL
                )",
                self.table
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS idx_{0}_created_at ON {0} (created_at, id)",
                self.table
            ),
        ];
        for stmt in &stmts {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }
}

impl SqliteStore {
    /// Timestamp and insert one row. The caller holds the write lock.
    async fn insert_locked(
        &self,
        conn: &mut SqliteConnection,
        role: Role,
        content: &str,
    ) -> Result<Turn, StoreError> {
        let max_sql = format!("SELECT MAX(created_at) FROM {}", self.table);
        let last: Option<String> = sqlx::query_scalar(&max_sql).fetch_one(&mut *conn).await?;
        let created_at = next_timestamp(last.as_deref().and_then(parse_timestamp));

        let insert_sql = format!(
            "INSERT INTO {} (role, content, created_at) VALUES (?1, ?2, ?3)",
            self.table
        );
        let id = sqlx::query(&insert_sql)
            .bind(role.as_str())
            .bind(content)
            .bind(format_timestamp(created_at))
            .execute(&mut *conn)
            .await?
            .last_insert_rowid();

        Ok(Turn {
            id,
            role,
            content: content.to_string(),
            created_at,
        })
    }
}

fn decode_row(row: &SqliteRow) -> Result<Turn, StoreError> {
    let id: i64 = row.try_get("id")?;
    let role: String = row.try_get("role")?;
    let content: String = row.try_get("content")?;
    let created_at: String = row.try_get("created_at")?;

    let role = role
        .parse::<Role>()
        .map_err(|e| StoreError::Malformed(format!("row {id}: {e}")))?;
    let created_at = parse_timestamp(&created_at)
        .ok_or_else(|| StoreError::Malformed(format!("row {id}: bad timestamp {created_at:?}")))?;

    Ok(Turn {
        id,
        role,
        content,
        created_at,
    })
}

#[async_trait]
impl StoryStore for SqliteStore {
    async fn load(&self) -> Result<Vec<Turn>, StoreError> {
        let sql = format!(
            "SELECT id, role, content, created_at FROM {} ORDER BY created_at ASC, id ASC",
            self.table
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut turns = Vec::with_capacity(rows.len());
        for row in &rows {
            match decode_row(row) {
                Ok(turn) => turns.push(turn),
                Err(e) => warn!(error = %e, "skipping story row"),
            }
        }
        Ok(turns)
    }

    async fn append(&self, role: Role, content: &str) -> Result<Turn, StoreError> {
        // Take the write lock up front so concurrent writers queue on the
        // busy timeout instead of failing the read-to-write upgrade.
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        let turn = self.insert_locked(&mut *tx, role, content).await?;
        tx.commit().await?;
        Ok(turn)
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_path_from_url() {
        assert_eq!(sqlite_path_from_url("sqlite://hive.db"), "hive.db");
        assert_eq!(sqlite_path_from_url("sqlite:///var/lib/hive.db"), "/var/lib/hive.db");
        assert_eq!(sqlite_path_from_url("sqlite::memory:"), ":memory:");
        assert_eq!(sqlite_path_from_url("story.db"), "story.db");
    }

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let store = SqliteStore::open(":memory:").await.unwrap();
        assert!(store.load().await.unwrap().is_empty());

        let seed = store.append(Role::Assistant, "Link established.").await.unwrap();
        let user = store.append(Role::User, "hello").await.unwrap();

        let turns = store.load().await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0], seed);
        assert_eq!(turns[1].role, Role::User);
        assert_eq!(turns[1].content, "hello");
        assert!(user.created_at > seed.created_at);
    }

    #[tokio::test]
    async fn test_unknown_roles_are_skipped() {
        let store = SqliteStore::open(":memory:").await.unwrap();
        store.append(Role::Assistant, "seed").await.unwrap();
        sqlx::query(
            "INSERT INTO story_logs (role, content, created_at) \
             VALUES ('system', 'stray', '2999-01-01T00:00:00.000000Z')",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let turns = store.load().await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "seed");
    }

    #[tokio::test]
    async fn test_custom_table() {
        let store = SqliteStore::open_with_table(":memory:", "side_story").await.unwrap();
        store.append(Role::User, "a").await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM side_story")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
