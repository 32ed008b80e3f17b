use std::sync::Arc;

use uuid::Uuid;

use super::load_owned_session;
use crate::application::errors::ChatError;
use crate::domain::repositories::{ChatMessageRepository, ChatSessionRepository};
use crate::domain::value_objects::{MessageSource, RetrievalContext};

#[derive(Debug, Clone)]
pub struct GetMessageSourcesRequest {
    pub user_id: Uuid,
    pub message_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct GetMessageSourcesResponse {
    pub message_id: Uuid,
    pub sources: Vec<MessageSource>,
    pub retrieval_context: Option<RetrievalContext>,
}

/// Replays the citations stored with a message. Sources are never recomputed.
pub struct GetMessageSourcesUseCase {
    session_repository: Arc<dyn ChatSessionRepository>,
    message_repository: Arc<dyn ChatMessageRepository>,
}

impl GetMessageSourcesUseCase {
    pub fn new(
        session_repository: Arc<dyn ChatSessionRepository>,
        message_repository: Arc<dyn ChatMessageRepository>,
    ) -> Self {
        Self {
            session_repository,
            message_repository,
        }
    }

    pub async fn execute(
        &self,
        request: GetMessageSourcesRequest,
    ) -> Result<GetMessageSourcesResponse, ChatError> {
        let not_found = || ChatError::NotFound(format!("Message not found: {}", request.message_id));

        let message = self
            .message_repository
            .find_by_id(request.message_id)
            .await?
            .ok_or_else(not_found)?;
        load_owned_session(
            self.session_repository.as_ref(),
            request.user_id,
            message.chat_session_id(),
        )
        .await
        .map_err(|e| match e {
            ChatError::NotFound(_) => not_found(),
            other => other,
        })?;

        Ok(GetMessageSourcesResponse {
            message_id: message.id(),
            sources: message.sources().to_vec(),
            retrieval_context: message.retrieval_context().cloned(),
        })
    }
}
