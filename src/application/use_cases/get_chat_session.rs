use std::sync::Arc;

use uuid::Uuid;

use super::load_owned_session;
use crate::application::errors::ChatError;
use crate::domain::entities::{ChatMessage, ChatSession};
use crate::domain::repositories::{ChatMessageRepository, ChatSessionRepository};

#[derive(Debug, Clone)]
pub struct GetChatSessionRequest {
    pub user_id: Uuid,
    pub session_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct GetChatSessionResponse {
    pub session: ChatSession,
    pub messages: Vec<ChatMessage>,
}

pub struct GetChatSessionUseCase {
    session_repository: Arc<dyn ChatSessionRepository>,
    message_repository: Arc<dyn ChatMessageRepository>,
}

impl GetChatSessionUseCase {
    pub fn new(
        session_repository: Arc<dyn ChatSessionRepository>,
        message_repository: Arc<dyn ChatMessageRepository>,
    ) -> Self {
        Self {
            session_repository,
            message_repository,
        }
    }

    /// Session metadata plus its full history, oldest message first.
    pub async fn execute(
        &self,
        request: GetChatSessionRequest,
    ) -> Result<GetChatSessionResponse, ChatError> {
        let session = load_owned_session(
            self.session_repository.as_ref(),
            request.user_id,
            request.session_id,
        )
        .await?;

        let total = self.message_repository.count_by_session(session.id()).await?;
        let messages = self
            .message_repository
            .find_by_session(session.id(), 0, total)
            .await?;

        Ok(GetChatSessionResponse { session, messages })
    }
}
