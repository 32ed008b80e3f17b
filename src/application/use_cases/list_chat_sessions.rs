use std::sync::Arc;

use uuid::Uuid;

use super::validate_page;
use crate::application::errors::ChatError;
use crate::domain::entities::ChatSession;
use crate::domain::repositories::ChatSessionRepository;

#[derive(Debug, Clone)]
pub struct ListChatSessionsRequest {
    pub user_id: Uuid,
    pub skip: i64,
    pub limit: i64,
}

#[derive(Debug, Clone)]
pub struct ListChatSessionsResponse {
    pub sessions: Vec<ChatSession>,
    pub total_count: i64,
    pub skip: i64,
    pub limit: i64,
}

pub struct ListChatSessionsUseCase {
    session_repository: Arc<dyn ChatSessionRepository>,
}

impl ListChatSessionsUseCase {
    pub fn new(session_repository: Arc<dyn ChatSessionRepository>) -> Self {
        Self { session_repository }
    }

    pub async fn execute(
        &self,
        request: ListChatSessionsRequest,
    ) -> Result<ListChatSessionsResponse, ChatError> {
        validate_page(request.skip, request.limit)?;

        let sessions = self
            .session_repository
            .find_by_user(request.user_id, request.skip, request.limit)
            .await?;
        let total_count = self.session_repository.count_by_user(request.user_id).await?;

        Ok(ListChatSessionsResponse {
            sessions,
            total_count,
            skip: request.skip,
            limit: request.limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::ChatMode;
    use crate::infrastructure::memory::InMemoryChatStore;

    #[tokio::test]
    async fn test_lists_only_callers_sessions() {
        let store = Arc::new(InMemoryChatStore::new());
        let user_id = Uuid::new_v4();
        for title in ["a", "b", "c"] {
            store
                .save(&ChatSession::new(user_id, None, title.to_string(), ChatMode::Chat))
                .await
                .unwrap();
        }
        store
            .save(&ChatSession::new(Uuid::new_v4(), None, "other".to_string(), ChatMode::Chat))
            .await
            .unwrap();

        let response = ListChatSessionsUseCase::new(store)
            .execute(ListChatSessionsRequest {
                user_id,
                skip: 1,
                limit: 10,
            })
            .await
            .unwrap();

        assert_eq!(response.total_count, 3);
        assert_eq!(response.sessions.len(), 2);
        assert!(response.sessions.iter().all(|s| s.is_owned_by(user_id)));
    }

    #[tokio::test]
    async fn test_rejects_out_of_range_limit() {
        let use_case = ListChatSessionsUseCase::new(Arc::new(InMemoryChatStore::new()));

        for limit in [0, 101] {
            let err = use_case
                .execute(ListChatSessionsRequest {
                    user_id: Uuid::new_v4(),
                    skip: 0,
                    limit,
                })
                .await
                .unwrap_err();
            assert_eq!(err.code(), "bad_request");
        }
    }
}
