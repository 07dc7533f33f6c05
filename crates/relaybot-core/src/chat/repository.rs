//! ChatRecordRepository trait definition.
//!
//! Append, range-read and bulk-delete operations over persisted chat
//! records. Follows the RPITIT pattern used by every port in this crate.

use chrono::{DateTime, Utc};
use relaybot_types::chat::{ChatRecord, ConversationKey};
use relaybot_types::error::RepositoryError;

/// Repository trait for chat record persistence.
///
/// Implementations live in relaybot-infra (e.g., `SqliteChatRecordRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
///
/// `append`, `read_range` and `delete_before` may run concurrently; the
/// implementation must keep per-key ordering intact.
pub trait ChatRecordRepository: Send + Sync {
    /// Append one record.
    fn append(
        &self,
        record: &ChatRecord,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Every conversation key with at least one persisted record.
    fn list_conversation_keys(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<ConversationKey>, RepositoryError>> + Send;

    /// Records for `key` with `start <= created_at <= end`, ordered by
    /// `created_at` ASC.
    fn read_range(
        &self,
        key: &ConversationKey,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Vec<ChatRecord>, RepositoryError>> + Send;

    /// Delete every record with `created_at < cutoff`. Returns the number removed.
    fn delete_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}

impl<R: ChatRecordRepository> ChatRecordRepository for std::sync::Arc<R> {
    async fn append(&self, record: &ChatRecord) -> Result<(), RepositoryError> {
        (**self).append(record).await
    }

    async fn list_conversation_keys(&self) -> Result<Vec<ConversationKey>, RepositoryError> {
        (**self).list_conversation_keys().await
    }

    async fn read_range(
        &self,
        key: &ConversationKey,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ChatRecord>, RepositoryError> {
        (**self).read_range(key, start, end).await
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        (**self).delete_before(cutoff).await
    }
}
