pub mod create_chat_session;
pub mod get_chat_session;
pub mod get_message_sources;
pub mod list_chat_sessions;
pub mod list_messages;
pub mod submit_feedback;

pub use create_chat_session::{CreateChatSessionRequest, CreateChatSessionUseCase};
pub use get_chat_session::{GetChatSessionRequest, GetChatSessionResponse, GetChatSessionUseCase};
pub use get_message_sources::{
    GetMessageSourcesRequest, GetMessageSourcesResponse, GetMessageSourcesUseCase,
};
pub use list_chat_sessions::{
    ListChatSessionsRequest, ListChatSessionsResponse, ListChatSessionsUseCase,
};
pub use list_messages::{ListMessagesRequest, ListMessagesResponse, ListMessagesUseCase};
pub use submit_feedback::{SubmitFeedbackRequest, SubmitFeedbackUseCase};

use uuid::Uuid;

use crate::application::errors::ChatError;
use crate::domain::entities::ChatSession;
use crate::domain::repositories::ChatSessionRepository;

pub const MAX_PAGE_SIZE: i64 = 100;

/// Foreign and unknown sessions are indistinguishable to the caller.
pub(crate) async fn load_owned_session(
    repository: &dyn ChatSessionRepository,
    user_id: Uuid,
    session_id: Uuid,
) -> Result<ChatSession, ChatError> {
    match repository.find_by_id(session_id).await? {
        Some(session) if session.is_owned_by(user_id) => Ok(session),
        _ => Err(ChatError::NotFound(format!("Chat session not found: {}", session_id))),
    }
}

pub(crate) fn validate_page(skip: i64, limit: i64) -> Result<(), ChatError> {
    if skip < 0 {
        return Err(ChatError::Validation("Skip cannot be negative".to_string()));
    }
    if limit <= 0 || limit > MAX_PAGE_SIZE {
        return Err(ChatError::Validation(format!(
            "Limit must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }
    Ok(())
}
