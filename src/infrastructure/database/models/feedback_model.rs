use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::entities::MessageFeedback;
use crate::infrastructure::database::schema::message_feedback;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = message_feedback)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FeedbackModel {
    pub id: Uuid,
    pub chat_message_id: Uuid,
    pub user_id: Uuid,
    pub is_positive: bool,
    pub feedback_text: Option<String>,
    pub creation_date: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = message_feedback)]
pub struct NewFeedbackModel {
    pub id: Uuid,
    pub chat_message_id: Uuid,
    pub user_id: Uuid,
    pub is_positive: bool,
    pub feedback_text: Option<String>,
    pub creation_date: DateTime<Utc>,
}

impl From<&MessageFeedback> for NewFeedbackModel {
    fn from(feedback: &MessageFeedback) -> Self {
        Self {
            id: feedback.id(),
            chat_message_id: feedback.chat_message_id(),
            user_id: feedback.user_id(),
            is_positive: feedback.is_positive(),
            feedback_text: feedback.feedback_text().map(|t| t.to_string()),
            creation_date: feedback.creation_date(),
        }
    }
}

impl From<FeedbackModel> for MessageFeedback {
    fn from(model: FeedbackModel) -> Self {
        MessageFeedback::from_database(
            model.id,
            model.chat_message_id,
            model.user_id,
            model.is_positive,
            model.feedback_text,
            model.creation_date,
        )
    }
}
