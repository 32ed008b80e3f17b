use async_trait::async_trait;
use uuid::Uuid;

use super::RepositoryError;
use crate::domain::entities::ChatMessage;

#[async_trait]
pub trait ChatMessageRepository: Send + Sync {
    /// Inserts every message and bumps the owning session's `message_count` in one
    /// transaction. Returns the session's new message count.
    async fn append_messages(
        &self,
        session_id: Uuid,
        messages: &[ChatMessage],
    ) -> Result<i32, RepositoryError>;
    async fn find_by_id(&self, message_id: Uuid) -> Result<Option<ChatMessage>, RepositoryError>;
    /// Oldest first.
    async fn find_by_session(
        &self,
        session_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, RepositoryError>;
    /// The latest `limit` messages, returned oldest first.
    async fn find_recent_by_session(
        &self,
        session_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, RepositoryError>;
    async fn count_by_session(&self, session_id: Uuid) -> Result<i64, RepositoryError>;
}
