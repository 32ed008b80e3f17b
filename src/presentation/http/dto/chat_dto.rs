use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::use_cases::{
    GetChatSessionResponse, ListChatSessionsResponse, ListMessagesResponse,
};
use crate::domain::entities::{ChatMessage, ChatSession};
use crate::domain::value_objects::{ChatMode, MessageRole, MessageSource, ToolCall};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatModeDto {
    #[default]
    #[serde(rename = "CHAT_MODE_UNSPECIFIED")]
    Unspecified,
    #[serde(rename = "CHAT_MODE_CHAT")]
    Chat,
    #[serde(rename = "CHAT_MODE_SEARCH")]
    Search,
}

impl ChatModeDto {
    /// `Unspecified` leaves the choice to the session (or the default for new sessions).
    pub fn into_domain(self) -> Option<ChatMode> {
        match self {
            ChatModeDto::Unspecified => None,
            ChatModeDto::Chat => Some(ChatMode::Chat),
            ChatModeDto::Search => Some(ChatMode::Search),
        }
    }
}

impl From<ChatMode> for ChatModeDto {
    fn from(mode: ChatMode) -> Self {
        match mode {
            ChatMode::Chat => ChatModeDto::Chat,
            ChatMode::Search => ChatModeDto::Search,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MessageRoleDto {
    #[serde(rename = "MESSAGE_ROLE_USER")]
    User,
    #[serde(rename = "MESSAGE_ROLE_ASSISTANT")]
    Assistant,
    #[serde(rename = "MESSAGE_ROLE_SYSTEM")]
    System,
}

impl From<MessageRole> for MessageRoleDto {
    fn from(role: MessageRole) -> Self {
        match role {
            MessageRole::User => MessageRoleDto::User,
            MessageRole::Assistant => MessageRoleDto::Assistant,
            MessageRole::System => MessageRoleDto::System,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateChatSessionRequestDto {
    pub assistant_id: Option<Uuid>,
    pub title: Option<String>,
    #[serde(default)]
    pub mode: ChatModeDto,
}

#[derive(Debug, Serialize)]
pub struct ChatSessionDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub assistant_id: Option<Uuid>,
    pub title: String,
    pub mode: ChatModeDto,
    pub message_count: i32,
    pub creation_date: String,
    pub last_update: String,
    pub last_message_at: Option<String>,
}

impl From<&ChatSession> for ChatSessionDto {
    fn from(session: &ChatSession) -> Self {
        Self {
            id: session.id(),
            user_id: session.user_id(),
            assistant_id: session.assistant_id(),
            title: session.title().to_string(),
            mode: session.mode().into(),
            message_count: session.message_count(),
            creation_date: session.creation_date().to_rfc3339(),
            last_update: session.last_update().to_rfc3339(),
            last_message_at: session.last_message_at().map(|at| at.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatMessageDto {
    pub id: Uuid,
    pub chat_session_id: Uuid,
    pub role: MessageRoleDto,
    pub content: String,
    pub token_count: i32,
    pub parent_message_id: Option<Uuid>,
    pub rephrased_query: Option<String>,
    pub sources: Vec<MessageSource>,
    pub tool_calls: Vec<ToolCall>,
    pub error: Option<String>,
    pub creation_date: String,
}

impl From<&ChatMessage> for ChatMessageDto {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id(),
            chat_session_id: message.chat_session_id(),
            role: message.role().into(),
            content: message.content().to_string(),
            token_count: message.token_count(),
            parent_message_id: message.parent_message_id(),
            rephrased_query: message.rephrased_query().map(str::to_string),
            sources: message.sources().to_vec(),
            tool_calls: message.tool_calls().to_vec(),
            error: message.error().map(str::to_string),
            creation_date: message.creation_date().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginationMetaDto {
    pub skip: i64,
    pub limit: i64,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct ChatSessionListDto {
    pub sessions: Vec<ChatSessionDto>,
    pub meta: PaginationMetaDto,
}

impl From<ListChatSessionsResponse> for ChatSessionListDto {
    fn from(response: ListChatSessionsResponse) -> Self {
        Self {
            sessions: response.sessions.iter().map(ChatSessionDto::from).collect(),
            meta: PaginationMetaDto {
                skip: response.skip,
                limit: response.limit,
                total: response.total_count,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatSessionDetailDto {
    pub session: ChatSessionDto,
    pub messages: Vec<ChatMessageDto>,
}

impl From<GetChatSessionResponse> for ChatSessionDetailDto {
    fn from(response: GetChatSessionResponse) -> Self {
        Self {
            session: ChatSessionDto::from(&response.session),
            messages: response.messages.iter().map(ChatMessageDto::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChatMessageListDto {
    pub messages: Vec<ChatMessageDto>,
    pub meta: PaginationMetaDto,
}

impl From<ListMessagesResponse> for ChatMessageListDto {
    fn from(response: ListMessagesResponse) -> Self {
        Self {
            messages: response.messages.iter().map(ChatMessageDto::from).collect(),
            meta: PaginationMetaDto {
                skip: response.skip,
                limit: response.limit,
                total: response.total_count,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_mode_wire_names() {
        assert_eq!(
            serde_json::to_value(ChatModeDto::Search).unwrap(),
            json!("CHAT_MODE_SEARCH")
        );
        let parsed: ChatModeDto = serde_json::from_value(json!("CHAT_MODE_CHAT")).unwrap();
        assert_eq!(parsed.into_domain(), Some(ChatMode::Chat));
        assert_eq!(ChatModeDto::Unspecified.into_domain(), None);
        assert!(serde_json::from_value::<ChatModeDto>(json!("chat")).is_err());
    }

    #[test]
    fn test_message_dto_uses_role_wire_name() {
        let message = ChatMessage::new_user(Uuid::new_v4(), "hi".to_string(), None);
        let dto = serde_json::to_value(ChatMessageDto::from(&message)).unwrap();
        assert_eq!(dto["role"], json!("MESSAGE_ROLE_USER"));
        assert_eq!(dto["content"], json!("hi"));
        assert_eq!(dto["sources"], json!([]));
    }

    #[test]
    fn test_create_request_defaults_mode() {
        let dto: CreateChatSessionRequestDto = serde_json::from_value(json!({})).unwrap();
        assert_eq!(dto.mode, ChatModeDto::Unspecified);
        assert!(dto.title.is_none());
    }
}
