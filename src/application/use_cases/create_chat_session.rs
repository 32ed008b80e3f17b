use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::application::errors::ChatError;
use crate::domain::entities::ChatSession;
use crate::domain::repositories::ChatSessionRepository;
use crate::domain::value_objects::ChatMode;

#[derive(Debug, Clone)]
pub struct CreateChatSessionRequest {
    pub user_id: Uuid,
    pub assistant_id: Option<Uuid>,
    pub title: Option<String>,
    pub mode: Option<ChatMode>,
}

#[derive(Debug, Clone)]
pub struct CreateChatSessionResponse {
    pub session: ChatSession,
}

pub struct CreateChatSessionUseCase {
    session_repository: Arc<dyn ChatSessionRepository>,
}

impl CreateChatSessionUseCase {
    pub fn new(session_repository: Arc<dyn ChatSessionRepository>) -> Self {
        Self { session_repository }
    }

    pub async fn execute(
        &self,
        request: CreateChatSessionRequest,
    ) -> Result<CreateChatSessionResponse, ChatError> {
        let session = ChatSession::new(
            request.user_id,
            request.assistant_id,
            request.title.unwrap_or_default(),
            request.mode.unwrap_or_default(),
        );

        self.session_repository.save(&session).await?;
        info!(session_id = %session.id(), user_id = %request.user_id, "chat session created");

        Ok(CreateChatSessionResponse { session })
    }
}
