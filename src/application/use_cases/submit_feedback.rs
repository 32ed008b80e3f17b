use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use super::load_owned_session;
use crate::application::errors::ChatError;
use crate::domain::entities::MessageFeedback;
use crate::domain::repositories::{
    ChatMessageRepository, ChatSessionRepository, FeedbackRepository,
};

#[derive(Debug, Clone)]
pub struct SubmitFeedbackRequest {
    pub user_id: Uuid,
    pub message_id: Uuid,
    pub is_positive: bool,
    pub feedback_text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SubmitFeedbackResponse {
    pub feedback: MessageFeedback,
    /// True when an earlier verdict from the same user was overwritten.
    pub replaced: bool,
}

pub struct SubmitFeedbackUseCase {
    session_repository: Arc<dyn ChatSessionRepository>,
    message_repository: Arc<dyn ChatMessageRepository>,
    feedback_repository: Arc<dyn FeedbackRepository>,
}

impl SubmitFeedbackUseCase {
    pub fn new(
        session_repository: Arc<dyn ChatSessionRepository>,
        message_repository: Arc<dyn ChatMessageRepository>,
        feedback_repository: Arc<dyn FeedbackRepository>,
    ) -> Self {
        Self {
            session_repository,
            message_repository,
            feedback_repository,
        }
    }

    /// Records the caller's verdict on a message, replacing any earlier one.
    pub async fn execute(
        &self,
        request: SubmitFeedbackRequest,
    ) -> Result<SubmitFeedbackResponse, ChatError> {
        let message = self
            .message_repository
            .find_by_id(request.message_id)
            .await?
            .ok_or_else(|| {
                ChatError::NotFound(format!("Message not found: {}", request.message_id))
            })?;

        // Only the owner of the conversation may rate it.
        load_owned_session(
            self.session_repository.as_ref(),
            request.user_id,
            message.chat_session_id(),
        )
        .await
        .map_err(|e| match e {
            ChatError::NotFound(_) => {
                ChatError::NotFound(format!("Message not found: {}", request.message_id))
            }
            other => other,
        })?;

        let feedback = MessageFeedback::new(
            message.id(),
            request.user_id,
            request.is_positive,
            request.feedback_text,
        )
        .map_err(ChatError::Validation)?;

        let replaced = self
            .feedback_repository
            .find_by_message_and_user(message.id(), request.user_id)
            .await?
            .is_some();
        let stored = self.feedback_repository.upsert(&feedback).await?;
        info!(
            message_id = %message.id(),
            user_id = %request.user_id,
            is_positive = stored.is_positive(),
            replaced,
            "feedback recorded"
        );

        Ok(SubmitFeedbackResponse {
            feedback: stored,
            replaced,
        })
    }
}
