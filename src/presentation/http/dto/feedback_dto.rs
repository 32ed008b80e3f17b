use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::use_cases::GetMessageSourcesResponse;
use crate::domain::entities::MessageFeedback;
use crate::domain::value_objects::{MessageSource, RetrievalContext};

#[derive(Debug, Deserialize)]
pub struct SubmitFeedbackRequestDto {
    pub is_positive: bool,
    pub feedback_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackDto {
    pub id: Uuid,
    pub chat_message_id: Uuid,
    pub user_id: Uuid,
    pub is_positive: bool,
    pub feedback_text: Option<String>,
    pub creation_date: String,
}

impl From<&MessageFeedback> for FeedbackDto {
    fn from(feedback: &MessageFeedback) -> Self {
        Self {
            id: feedback.id(),
            chat_message_id: feedback.chat_message_id(),
            user_id: feedback.user_id(),
            is_positive: feedback.is_positive(),
            feedback_text: feedback.feedback_text().map(str::to_string),
            creation_date: feedback.creation_date().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageSourcesDto {
    pub message_id: Uuid,
    pub sources: Vec<MessageSource>,
    /// Stored exactly as it was written at turn completion.
    pub retrieval_context: Option<RetrievalContext>,
}

impl From<GetMessageSourcesResponse> for MessageSourcesDto {
    fn from(response: GetMessageSourcesResponse) -> Self {
        Self {
            message_id: response.message_id,
            sources: response.sources,
            retrieval_context: response.retrieval_context,
        }
    }
}
