use async_trait::async_trait;
use uuid::Uuid;

use super::RepositoryError;
use crate::domain::entities::ChatSession;

#[async_trait]
pub trait ChatSessionRepository: Send + Sync {
    async fn save(&self, session: &ChatSession) -> Result<(), RepositoryError>;
    async fn find_by_id(&self, session_id: Uuid) -> Result<Option<ChatSession>, RepositoryError>;
    /// Newest `last_update` first.
    async fn find_by_user(
        &self,
        user_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<ChatSession>, RepositoryError>;
    async fn count_by_user(&self, user_id: Uuid) -> Result<i64, RepositoryError>;
}
