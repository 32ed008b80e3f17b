use async_trait::async_trait;
use uuid::Uuid;

use super::RepositoryError;
use crate::domain::entities::MessageFeedback;

#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    /// Insert, or overwrite the existing row for the same (message, user) pair.
    /// Returns the row as stored.
    async fn upsert(&self, feedback: &MessageFeedback) -> Result<MessageFeedback, RepositoryError>;
    async fn find_by_message_and_user(
        &self,
        message_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<MessageFeedback>, RepositoryError>;
}
