use async_trait::async_trait;
use diesel::prelude::*;
use uuid::Uuid;

use super::join_error;
use crate::domain::entities::ChatSession;
use crate::domain::repositories::{ChatSessionRepository, RepositoryError};
use crate::infrastructure::database::models::{ChatSessionModel, NewChatSessionModel};
use crate::infrastructure::database::schema::chat_sessions;
use crate::infrastructure::database::{DbConnection, DbPool, get_connection_from_pool};

pub struct PostgresChatSessionRepository {
    pool: DbPool,
}

impl PostgresChatSessionRepository {
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
impl ChatSessionRepository for PostgresChatSessionRepository {
    async fn save(&self, session: &ChatSession) -> Result<(), RepositoryError> {
        let row = NewChatSessionModel::from(session);
        let mut conn = self.get_connection()?;

        tokio::task::spawn_blocking(move || {
            diesel::insert_into(chat_sessions::table)
                .values(&row)
                .on_conflict(chat_sessions::id)
                .do_update()
                .set(&row)
                .execute(&mut conn)
                .map_err(|e| {
                    RepositoryError::DatabaseError(format!("Failed to save chat session: {}", e))
                })
        })
        .await
        .map_err(join_error)??;

        Ok(())
    }

    async fn find_by_id(&self, session_id: Uuid) -> Result<Option<ChatSession>, RepositoryError> {
        let mut conn = self.get_connection()?;

        let result = tokio::task::spawn_blocking(move || {
            chat_sessions::table
                .find(session_id)
                .select(ChatSessionModel::as_select())
                .first::<ChatSessionModel>(&mut conn)
                .optional()
                .map_err(|e| {
                    RepositoryError::DatabaseError(format!("Failed to find chat session: {}", e))
                })
        })
        .await
        .map_err(join_error)??;

        result
            .map(ChatSession::try_from)
            .transpose()
            .map_err(RepositoryError::ValidationError)
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<ChatSession>, RepositoryError> {
        let mut conn = self.get_connection()?;

        let models = tokio::task::spawn_blocking(move || {
            chat_sessions::table
                .filter(chat_sessions::user_id.eq(user_id))
                .order((chat_sessions::last_update.desc(), chat_sessions::id.asc()))
                .offset(skip)
                .limit(limit)
                .select(ChatSessionModel::as_select())
                .load::<ChatSessionModel>(&mut conn)
                .map_err(|e| {
                    RepositoryError::DatabaseError(format!("Failed to list chat sessions: {}", e))
                })
        })
        .await
        .map_err(join_error)??;

        models
            .into_iter()
            .map(|model| ChatSession::try_from(model).map_err(RepositoryError::ValidationError))
            .collect()
    }

    async fn count_by_user(&self, user_id: Uuid) -> Result<i64, RepositoryError> {
        let mut conn = self.get_connection()?;

        tokio::task::spawn_blocking(move || {
            chat_sessions::table
                .filter(chat_sessions::user_id.eq(user_id))
                .count()
                .get_result::<i64>(&mut conn)
                .map_err(|e| {
                    RepositoryError::DatabaseError(format!("Failed to count chat sessions: {}", e))
                })
        })
        .await
        .map_err(join_error)?
    }
}
