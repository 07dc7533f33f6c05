//! SQLite chat record repository implementation.
//!
//! Implements `ChatRecordRepository` from `relaybot-core` using sqlx with split
//! read/write pools: raw queries, a private Row struct, reader pool for
//! SELECTs and the single-connection writer pool for INSERT/DELETE.

use chrono::{DateTime, SecondsFormat, Utc};
use relaybot_core::chat::repository::ChatRecordRepository;
use relaybot_types::chat::{ChatRecord, ConversationKey};
use relaybot_types::error::RepositoryError;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ChatRecordRepository`.
pub struct SqliteChatRecordRepository {
    pool: DatabasePool,
}

impl SqliteChatRecordRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Total number of stored records.
    pub async fn count(&self) -> Result<u64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chat_records")
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(count as u64)
    }
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct ChatRecordRow {
    id: String,
    conversation_key: String,
    is_user_turn: bool,
    text: String,
    created_at: String,
}

impl ChatRecordRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            conversation_key: row.try_get("conversation_key")?,
            is_user_turn: row.try_get("is_user_turn")?,
            text: row.try_get("text")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_record(self) -> Result<ChatRecord, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid record id: {e}")))?;
        let created_at = parse_datetime(&self.created_at)?;

        Ok(ChatRecord {
            id,
            conversation_key: ConversationKey::new(self.conversation_key),
            is_user_turn: self.is_user_turn,
            text: self.text,
            created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width UTC timestamps so that text comparison in SQL matches time order.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ---------------------------------------------------------------------------
// ChatRecordRepository implementation
// ---------------------------------------------------------------------------

impl ChatRecordRepository for SqliteChatRecordRepository {
    async fn append(&self, record: &ChatRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO chat_records (id, conversation_key, is_user_turn, text, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(record.id.to_string())
        .bind(record.conversation_key.as_str())
        .bind(record.is_user_turn)
        .bind(&record.text)
        .bind(format_datetime(&record.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn list_conversation_keys(&self) -> Result<Vec<ConversationKey>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT DISTINCT conversation_key FROM chat_records ORDER BY conversation_key",
        )
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("conversation_key")
                    .map(ConversationKey::new)
                    .map_err(|e| RepositoryError::Query(e.to_string()))
            })
            .collect()
    }

    async fn read_range(
        &self,
        key: &ConversationKey,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ChatRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT * FROM chat_records
               WHERE conversation_key = ? AND created_at >= ? AND created_at <= ?
               ORDER BY created_at ASC, id ASC"#,
        )
        .bind(key.as_str())
        .bind(format_datetime(&start))
        .bind(format_datetime(&end))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let record_row =
                ChatRecordRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            records.push(record_row.into_record()?);
        }
        Ok(records)
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM chat_records WHERE created_at < ?")
            .bind(format_datetime(&cutoff))
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    fn record_at(key: &str, is_user: bool, text: &str, at: DateTime<Utc>) -> ChatRecord {
        ChatRecord::at(ConversationKey::from(key), is_user, text, at)
    }

    #[tokio::test]
    async fn test_append_and_read_range_in_order() {
        let repo = SqliteChatRecordRepository::new(test_pool().await);
        let now = Utc::now();

        // Inserted out of order on purpose
        repo.append(&record_at("alice", false, "second", now - TimeDelta::seconds(10)))
            .await
            .unwrap();
        repo.append(&record_at("alice", true, "first", now - TimeDelta::seconds(20)))
            .await
            .unwrap();
        repo.append(&record_at("bob", true, "other", now - TimeDelta::seconds(15)))
            .await
            .unwrap();

        let records = repo
            .read_range(&"alice".into(), now - TimeDelta::hours(1), now)
            .await
            .unwrap();

        let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert!(records[0].is_user_turn);
        assert!(!records[1].is_user_turn);
        assert_eq!(records[0].conversation_key.as_str(), "alice");
    }

    #[tokio::test]
    async fn test_read_range_excludes_outside_window() {
        let repo = SqliteChatRecordRepository::new(test_pool().await);
        let now = Utc::now();
        let start = now - TimeDelta::hours(100);

        repo.append(&record_at("Alpha", true, "too old", start - TimeDelta::seconds(1)))
            .await
            .unwrap();
        repo.append(&record_at("Alpha", true, "at start", start)).await.unwrap();
        repo.append(&record_at("Alpha", true, "recent", now - TimeDelta::minutes(5)))
            .await
            .unwrap();

        let texts: Vec<String> = repo
            .read_range(&"Alpha".into(), start, now)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.text)
            .collect();
        assert_eq!(texts, vec!["at start".to_string(), "recent".to_string()]);
    }

    #[tokio::test]
    async fn test_timestamps_round_trip_with_microseconds() {
        let repo = SqliteChatRecordRepository::new(test_pool().await);
        let at = DateTime::parse_from_rfc3339("2026-03-01T12:00:00.123456Z")
            .unwrap()
            .with_timezone(&Utc);
        let record = record_at("alice", true, "hi", at);
        repo.append(&record).await.unwrap();

        let read = repo
            .read_range(&"alice".into(), at, at)
            .await
            .unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].id, record.id);
        assert_eq!(read[0].created_at, at);
    }

    #[tokio::test]
    async fn test_list_conversation_keys_is_distinct() {
        let repo = SqliteChatRecordRepository::new(test_pool().await);
        let now = Utc::now();
        for key in ["bob", "alice", "bob", "Alpha"] {
            repo.append(&record_at(key, true, "x", now)).await.unwrap();
        }

        let keys = repo.list_conversation_keys().await.unwrap();
        let keys: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["Alpha", "alice", "bob"]);
    }

    #[tokio::test]
    async fn test_delete_before_is_strict() {
        let repo = SqliteChatRecordRepository::new(test_pool().await);
        let cutoff = Utc::now();

        repo.append(&record_at("a", true, "old", cutoff - TimeDelta::milliseconds(1)))
            .await
            .unwrap();
        repo.append(&record_at("a", true, "exact", cutoff)).await.unwrap();
        repo.append(&record_at("b", true, "new", cutoff + TimeDelta::seconds(1)))
            .await
            .unwrap();

        let deleted = repo.delete_before(cutoff).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(repo.count().await.unwrap(), 2);

        // Nothing left to delete at the same cutoff
        assert_eq!(repo.delete_before(cutoff).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_store() {
        let repo = SqliteChatRecordRepository::new(test_pool().await);
        assert!(repo.list_conversation_keys().await.unwrap().is_empty());
        assert_eq!(repo.delete_before(Utc::now()).await.unwrap(), 0);
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
