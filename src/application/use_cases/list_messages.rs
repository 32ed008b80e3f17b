use std::sync::Arc;

use uuid::Uuid;

use super::{load_owned_session, validate_page};
use crate::application::errors::ChatError;
use crate::domain::entities::ChatMessage;
use crate::domain::repositories::{ChatMessageRepository, ChatSessionRepository};

#[derive(Debug, Clone)]
pub struct ListMessagesRequest {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub skip: i64,
    pub limit: i64,
}

#[derive(Debug, Clone)]
pub struct ListMessagesResponse {
    pub messages: Vec<ChatMessage>,
    pub total_count: i64,
    pub skip: i64,
    pub limit: i64,
}

pub struct ListMessagesUseCase {
    session_repository: Arc<dyn ChatSessionRepository>,
    message_repository: Arc<dyn ChatMessageRepository>,
}

impl ListMessagesUseCase {
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
        request: ListMessagesRequest,
    ) -> Result<ListMessagesResponse, ChatError> {
        validate_page(request.skip, request.limit)?;
        let session = load_owned_session(
            self.session_repository.as_ref(),
            request.user_id,
            request.session_id,
        )
        .await?;

        let messages = self
            .message_repository
            .find_by_session(session.id(), request.skip, request.limit)
            .await?;
        let total_count = self.message_repository.count_by_session(session.id()).await?;

        Ok(ListMessagesResponse {
            messages,
            total_count,
            skip: request.skip,
            limit: request.limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ChatSession;
    use crate::domain::value_objects::ChatMode;
    use crate::infrastructure::memory::InMemoryChatStore;

    #[tokio::test]
    async fn test_pages_through_history() {
        let store = Arc::new(InMemoryChatStore::new());
        let user_id = Uuid::new_v4();
        let session = ChatSession::new(user_id, None, "t".to_string(), ChatMode::Search);
        store.save(&session).await.unwrap();
        let messages: Vec<ChatMessage> = (0..4)
            .map(|i| ChatMessage::new_user(session.id(), format!("q{}", i), None))
            .collect();
        store.append_messages(session.id(), &messages).await.unwrap();

        let response = ListMessagesUseCase::new(store.clone(), store)
            .execute(ListMessagesRequest {
                user_id,
                session_id: session.id(),
                skip: 2,
                limit: 5,
            })
            .await
            .unwrap();

        assert_eq!(response.total_count, 4);
        let contents: Vec<&str> = response.messages.iter().map(|m| m.content()).collect();
        assert_eq!(contents, vec!["q2", "q3"]);
    }
}
