use async_trait::async_trait;
use diesel::prelude::*;
use diesel::upsert::excluded;
use uuid::Uuid;

use super::join_error;
use crate::domain::entities::MessageFeedback;
use crate::domain::repositories::{FeedbackRepository, RepositoryError};
use crate::infrastructure::database::models::{FeedbackModel, NewFeedbackModel};
use crate::infrastructure::database::schema::message_feedback;
use crate::infrastructure::database::{DbConnection, DbPool, get_connection_from_pool};

pub struct PostgresFeedbackRepository {
    pool: DbPool,
}

impl PostgresFeedbackRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn get_connection(&self) -> Result<DbConnection, RepositoryError> {
        get_connection_from_pool(&self.pool).map_err(|e| {
            RepositoryError::DatabaseError(format!("Failed to get database connection: {}", e))
        })
    }
}

#[async_trait]
impl FeedbackRepository for PostgresFeedbackRepository {
    async fn upsert(&self, feedback: &MessageFeedback) -> Result<MessageFeedback, RepositoryError> {
        let row = NewFeedbackModel::from(feedback);
        let mut conn = self.get_connection()?;

        let stored = tokio::task::spawn_blocking(move || {
            diesel::insert_into(message_feedback::table)
                .values(&row)
                .on_conflict((message_feedback::chat_message_id, message_feedback::user_id))
                .do_update()
                .set((
                    message_feedback::is_positive.eq(excluded(message_feedback::is_positive)),
                    message_feedback::feedback_text.eq(excluded(message_feedback::feedback_text)),
                    message_feedback::creation_date.eq(excluded(message_feedback::creation_date)),
                ))
                .returning(FeedbackModel::as_returning())
                .get_result::<FeedbackModel>(&mut conn)
                .map_err(|e| RepositoryError::DatabaseError(format!("Failed to upsert feedback: {}", e)))
        })
        .await
        .map_err(join_error)??;

        Ok(MessageFeedback::from(stored))
    }

    async fn find_by_message_and_user(
        &self,
        message_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<MessageFeedback>, RepositoryError> {
        let mut conn = self.get_connection()?;

        let result = tokio::task::spawn_blocking(move || {
            message_feedback::table
                .filter(message_feedback::chat_message_id.eq(message_id))
                .filter(message_feedback::user_id.eq(user_id))
                .select(FeedbackModel::as_select())
                .first::<FeedbackModel>(&mut conn)
                .optional()
                .map_err(|e| RepositoryError::DatabaseError(format!("Failed to find feedback: {}", e)))
        })
        .await
        .map_err(join_error)??;

        Ok(result.map(MessageFeedback::from))
    }
}
