use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{MessageRole, MessageSource, RetrievalContext, ToolCall};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    id: Uuid,
    chat_session_id: Uuid,
    role: MessageRole,
    content: String,
    token_count: i32,
    parent_message_id: Option<Uuid>,
    rephrased_query: Option<String>,
    retrieval_context: Option<RetrievalContext>,
    tool_calls: Vec<ToolCall>,
    error: Option<String>,
    creation_date: DateTime<Utc>,
}

/// Everything a completed generation contributes to the assistant message.
#[derive(Debug, Clone)]
pub struct AssistantReply {
    pub content: String,
    pub token_count: i32,
    pub rephrased_query: Option<String>,
    pub sources: Vec<MessageSource>,
    pub tool_calls: Vec<ToolCall>,
}

impl ChatMessage {
    pub fn new_user(chat_session_id: Uuid, content: String, parent_message_id: Option<Uuid>) -> Self {
        let token_count = content.split_whitespace().count() as i32;
        Self {
            id: Uuid::new_v4(),
            chat_session_id,
            role: MessageRole::User,
            content,
            token_count,
            parent_message_id,
            rephrased_query: None,
            retrieval_context: None,
            tool_calls: Vec::new(),
            error: None,
            creation_date: Utc::now(),
        }
    }

    pub fn new_assistant(chat_session_id: Uuid, parent_message_id: Uuid, reply: AssistantReply) -> Self {
        Self {
            id: Uuid::new_v4(),
            chat_session_id,
            role: MessageRole::Assistant,
            content: reply.content,
            token_count: reply.token_count,
            parent_message_id: Some(parent_message_id),
            rephrased_query: reply.rephrased_query,
            retrieval_context: Some(RetrievalContext::from_sources(reply.sources)),
            tool_calls: reply.tool_calls,
            error: None,
            creation_date: Utc::now(),
        }
    }

    /// Create a ChatMessage from database values (for repository reconstruction)
    pub fn from_database(
        id: Uuid,
        chat_session_id: Uuid,
        role: MessageRole,
        content: String,
        token_count: i32,
        parent_message_id: Option<Uuid>,
        rephrased_query: Option<String>,
        retrieval_context: Option<RetrievalContext>,
        tool_calls: Vec<ToolCall>,
        error: Option<String>,
        creation_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            chat_session_id,
            role,
            content,
            token_count,
            parent_message_id,
            rephrased_query,
            retrieval_context,
            tool_calls,
            error,
            creation_date,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn chat_session_id(&self) -> Uuid {
        self.chat_session_id
    }

    pub fn role(&self) -> MessageRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn token_count(&self) -> i32 {
        self.token_count
    }

    pub fn parent_message_id(&self) -> Option<Uuid> {
        self.parent_message_id
    }

    pub fn rephrased_query(&self) -> Option<&str> {
        self.rephrased_query.as_deref()
    }

    pub fn retrieval_context(&self) -> Option<&RetrievalContext> {
        self.retrieval_context.as_ref()
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        &self.tool_calls
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn creation_date(&self) -> DateTime<Utc> {
        self.creation_date
    }

    pub fn sources(&self) -> &[MessageSource] {
        self.retrieval_context
            .as_ref()
            .map(RetrievalContext::sources)
            .unwrap_or(&[])
    }

    pub fn is_assistant(&self) -> bool {
        self.role == MessageRole::Assistant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_has_no_context() {
        let session_id = Uuid::new_v4();
        let message = ChatMessage::new_user(session_id, "What is EchoMind?".to_string(), None);

        assert_eq!(message.role(), MessageRole::User);
        assert_eq!(message.chat_session_id(), session_id);
        assert_eq!(message.token_count(), 3);
        assert!(message.retrieval_context().is_none());
        assert!(message.sources().is_empty());
    }

    #[test]
    fn test_assistant_message_carries_sources() {
        let session_id = Uuid::new_v4();
        let user = ChatMessage::new_user(session_id, "q".to_string(), None);
        let reply = AssistantReply {
            content: "EchoMind is a retrieval assistant.".to_string(),
            token_count: 6,
            rephrased_query: Some("what is echomind".to_string()),
            sources: vec![MessageSource::new("doc-1", "doc-1-0", 0.9, "Intro", "EchoMind is")],
            tool_calls: Vec::new(),
        };

        let message = ChatMessage::new_assistant(session_id, user.id(), reply);

        assert!(message.is_assistant());
        assert_eq!(message.parent_message_id(), Some(user.id()));
        assert_eq!(message.token_count(), 6);
        assert_eq!(message.sources().len(), 1);
        assert_eq!(message.rephrased_query(), Some("what is echomind"));
    }
}
