use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::entities::ChatMessage;
use crate::domain::value_objects::retrieval_context::{tool_calls_from_value, tool_calls_to_value};
use crate::domain::value_objects::{MessageRole, RetrievalContext};
use crate::infrastructure::database::schema::chat_messages;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = chat_messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ChatMessageModel {
    pub id: Uuid,
    pub chat_session_id: Uuid,
    pub role: String,
    pub content: String,
    pub token_count: i32,
    pub parent_message_id: Option<Uuid>,
    pub rephrased_query: Option<String>,
    pub retrieval_context: Option<serde_json::Value>,
    pub tool_calls: serde_json::Value,
    pub error: Option<String>,
    pub creation_date: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = chat_messages)]
pub struct NewChatMessageModel {
    pub id: Uuid,
    pub chat_session_id: Uuid,
    pub role: String,
    pub content: String,
    pub token_count: i32,
    pub parent_message_id: Option<Uuid>,
    pub rephrased_query: Option<String>,
    pub retrieval_context: Option<serde_json::Value>,
    pub tool_calls: serde_json::Value,
    pub error: Option<String>,
    pub creation_date: DateTime<Utc>,
}

impl From<&ChatMessage> for NewChatMessageModel {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id(),
            chat_session_id: message.chat_session_id(),
            role: message.role().as_str().to_string(),
            content: message.content().to_string(),
            token_count: message.token_count(),
            parent_message_id: message.parent_message_id(),
            rephrased_query: message.rephrased_query().map(|q| q.to_string()),
            retrieval_context: message.retrieval_context().map(RetrievalContext::to_value),
            tool_calls: tool_calls_to_value(message.tool_calls()),
            error: message.error().map(|e| e.to_string()),
            creation_date: message.creation_date(),
        }
    }
}

impl TryFrom<ChatMessageModel> for ChatMessage {
    type Error = String;

    fn try_from(model: ChatMessageModel) -> Result<Self, Self::Error> {
        let role = MessageRole::from_string(&model.role)?;
        let retrieval_context = model
            .retrieval_context
            .map(RetrievalContext::from_value)
            .transpose()?;
        let tool_calls = tool_calls_from_value(model.tool_calls)?;

        Ok(ChatMessage::from_database(
            model.id,
            model.chat_session_id,
            role,
            model.content,
            model.token_count,
            model.parent_message_id,
            model.rephrased_query,
            retrieval_context,
            tool_calls,
            model.error,
            model.creation_date,
        ))
    }
}
