use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const MAX_FEEDBACK_CHARS: usize = 4000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageFeedback {
    id: Uuid,
    chat_message_id: Uuid,
    user_id: Uuid,
    is_positive: bool,
    feedback_text: Option<String>,
    creation_date: DateTime<Utc>,
}

impl MessageFeedback {
    pub fn new(
        chat_message_id: Uuid,
        user_id: Uuid,
        is_positive: bool,
        feedback_text: Option<String>,
    ) -> Result<Self, String> {
        let feedback_text = feedback_text
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());

        if let Some(text) = &feedback_text {
            if text.chars().count() > MAX_FEEDBACK_CHARS {
                return Err(format!(
                    "Feedback text cannot exceed {} characters",
                    MAX_FEEDBACK_CHARS
                ));
            }
        }

        Ok(Self {
            id: Uuid::new_v4(),
            chat_message_id,
            user_id,
            is_positive,
            feedback_text,
            creation_date: Utc::now(),
        })
    }

    /// Create a MessageFeedback from database values (for repository reconstruction)
    pub fn from_database(
        id: Uuid,
        chat_message_id: Uuid,
        user_id: Uuid,
        is_positive: bool,
        feedback_text: Option<String>,
        creation_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            chat_message_id,
            user_id,
            is_positive,
            feedback_text,
            creation_date,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn chat_message_id(&self) -> Uuid {
        self.chat_message_id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn is_positive(&self) -> bool {
        self.is_positive
    }

    pub fn feedback_text(&self) -> Option<&str> {
        self.feedback_text.as_deref()
    }

    pub fn creation_date(&self) -> DateTime<Utc> {
        self.creation_date
    }

    /// Overwrite the verdict of an existing row, keeping its identity.
    pub fn overwrite_with(&mut self, newer: &MessageFeedback) {
        self.is_positive = newer.is_positive;
        self.feedback_text = newer.feedback_text.clone();
        self.creation_date = newer.creation_date;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_text_is_dropped() {
        let feedback =
            MessageFeedback::new(Uuid::new_v4(), Uuid::new_v4(), true, Some("   ".to_string()))
                .unwrap();
        assert!(feedback.feedback_text().is_none());
    }

    #[test]
    fn test_oversized_text_is_rejected() {
        let text = "x".repeat(MAX_FEEDBACK_CHARS + 1);
        assert!(MessageFeedback::new(Uuid::new_v4(), Uuid::new_v4(), false, Some(text)).is_err());
    }

    #[test]
    fn test_overwrite_keeps_identity() {
        let message_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let mut first = MessageFeedback::new(message_id, user_id, true, None).unwrap();
        let second =
            MessageFeedback::new(message_id, user_id, false, Some("wrong source".to_string()))
                .unwrap();
        let original_id = first.id();

        first.overwrite_with(&second);

        assert_eq!(first.id(), original_id);
        assert!(!first.is_positive());
        assert_eq!(first.feedback_text(), Some("wrong source"));
    }
}
