use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::entities::ChatSession;
use crate::domain::value_objects::ChatMode;
use crate::infrastructure::database::schema::chat_sessions;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = chat_sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ChatSessionModel {
    pub id: Uuid,
    pub user_id: Uuid,
    pub assistant_id: Option<Uuid>,
    pub title: String,
    pub mode: String,
    pub message_count: i32,
    pub creation_date: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    pub last_message_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = chat_sessions)]
pub struct NewChatSessionModel {
    pub id: Uuid,
    pub user_id: Uuid,
    pub assistant_id: Option<Uuid>,
    pub title: String,
    pub mode: String,
    pub message_count: i32,
    pub creation_date: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl From<&ChatSession> for NewChatSessionModel {
    fn from(session: &ChatSession) -> Self {
        Self {
            id: session.id(),
            user_id: session.user_id(),
            assistant_id: session.assistant_id(),
            title: session.title().to_string(),
            mode: session.mode().as_str().to_string(),
            message_count: session.message_count(),
            creation_date: session.creation_date(),
            last_update: session.last_update(),
            last_message_at: session.last_message_at(),
        }
    }
}

impl TryFrom<ChatSessionModel> for ChatSession {
    type Error = String;

    fn try_from(model: ChatSessionModel) -> Result<Self, Self::Error> {
        let mode = ChatMode::from_string(&model.mode)?;

        Ok(ChatSession::from_database(
            model.id,
            model.user_id,
            model.assistant_id,
            model.title,
            mode,
            model.message_count,
            model.creation_date,
            model.last_update,
            model.last_message_at,
        ))
    }
}
