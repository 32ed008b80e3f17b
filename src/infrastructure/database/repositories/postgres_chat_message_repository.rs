use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use tracing::debug;
use uuid::Uuid;

use super::join_error;
use crate::domain::entities::ChatMessage;
use crate::domain::repositories::{ChatMessageRepository, RepositoryError};
use crate::infrastructure::database::models::{ChatMessageModel, NewChatMessageModel};
use crate::infrastructure::database::schema::{chat_messages, chat_sessions};
use crate::infrastructure::database::{DbConnection, DbPool, get_connection_from_pool};

pub struct PostgresChatMessageRepository {
    pool: DbPool,
}

impl PostgresChatMessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn get_connection(&self) -> Result<DbConnection, RepositoryError> {
        get_connection_from_pool(&self.pool).map_err(|e| {
            RepositoryError::DatabaseError(format!("Failed to get database connection: {}", e))
        })
    }
}

fn to_domain(models: Vec<ChatMessageModel>) -> Result<Vec<ChatMessage>, RepositoryError> {
    models
        .into_iter()
        .map(|model| ChatMessage::try_from(model).map_err(RepositoryError::ValidationError))
        .collect()
}

#[async_trait]
impl ChatMessageRepository for PostgresChatMessageRepository {
    async fn append_messages(
        &self,
        session_id: Uuid,
        messages: &[ChatMessage],
    ) -> Result<i32, RepositoryError> {
        if let Some(foreign) = messages.iter().find(|m| m.chat_session_id() != session_id) {
            return Err(RepositoryError::ValidationError(format!(
                "message {} belongs to another session",
                foreign.id()
            )));
        }

        let rows: Vec<NewChatMessageModel> = messages.iter().map(NewChatMessageModel::from).collect();
        let added = rows.len() as i32;
        let mut conn = self.get_connection()?;

        let new_count = tokio::task::spawn_blocking(move || {
            conn.transaction::<i32, diesel::result::Error, _>(|conn| {
                diesel::insert_into(chat_messages::table)
                    .values(&rows)
                    .execute(conn)?;

                let now = Utc::now();
                diesel::update(chat_sessions::table.find(session_id))
                    .set((
                        chat_sessions::message_count.eq(chat_sessions::message_count + added),
                        chat_sessions::last_message_at.eq(Some(now)),
                        chat_sessions::last_update.eq(now),
                    ))
                    .returning(chat_sessions::message_count)
                    .get_result(conn)
            })
            .map_err(|e| match e {
                diesel::result::Error::NotFound => {
                    RepositoryError::NotFound(format!("session {}", session_id))
                }
                other => RepositoryError::DatabaseError(format!("Failed to append messages: {}", other)),
            })
        })
        .await
        .map_err(join_error)??;

        debug!(%session_id, added, new_count, "messages appended");
        Ok(new_count)
    }

    async fn find_by_id(&self, message_id: Uuid) -> Result<Option<ChatMessage>, RepositoryError> {
        let mut conn = self.get_connection()?;

        let result = tokio::task::spawn_blocking(move || {
            chat_messages::table
                .find(message_id)
                .select(ChatMessageModel::as_select())
                .first::<ChatMessageModel>(&mut conn)
                .optional()
                .map_err(|e| RepositoryError::DatabaseError(format!("Failed to find message: {}", e)))
        })
        .await
        .map_err(join_error)??;

        result
            .map(ChatMessage::try_from)
            .transpose()
            .map_err(RepositoryError::ValidationError)
    }

    async fn find_by_session(
        &self,
        session_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let mut conn = self.get_connection()?;

        let models = tokio::task::spawn_blocking(move || {
            chat_messages::table
                .filter(chat_messages::chat_session_id.eq(session_id))
                .order((chat_messages::creation_date.asc(), chat_messages::id.asc()))
                .offset(skip)
                .limit(limit)
                .select(ChatMessageModel::as_select())
                .load::<ChatMessageModel>(&mut conn)
                .map_err(|e| RepositoryError::DatabaseError(format!("Failed to list messages: {}", e)))
        })
        .await
        .map_err(join_error)??;

        to_domain(models)
    }

    async fn find_recent_by_session(
        &self,
        session_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let mut conn = self.get_connection()?;

        let mut models = tokio::task::spawn_blocking(move || {
            chat_messages::table
                .filter(chat_messages::chat_session_id.eq(session_id))
                .order((chat_messages::creation_date.desc(), chat_messages::id.desc()))
                .limit(limit)
                .select(ChatMessageModel::as_select())
                .load::<ChatMessageModel>(&mut conn)
                .map_err(|e| {
                    RepositoryError::DatabaseError(format!("Failed to load recent messages: {}", e))
                })
        })
        .await
        .map_err(join_error)??;

        models.reverse();
        to_domain(models)
    }

    async fn count_by_session(&self, session_id: Uuid) -> Result<i64, RepositoryError> {
        let mut conn = self.get_connection()?;

        tokio::task::spawn_blocking(move || {
            chat_messages::table
                .filter(chat_messages::chat_session_id.eq(session_id))
                .count()
                .get_result::<i64>(&mut conn)
                .map_err(|e| RepositoryError::DatabaseError(format!("Failed to count messages: {}", e)))
        })
        .await
        .map_err(join_error)?
    }
}
