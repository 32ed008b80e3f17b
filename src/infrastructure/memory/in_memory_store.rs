use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::entities::{ChatMessage, ChatSession, MessageFeedback};
use crate::domain::repositories::{
    ChatMessageRepository, ChatSessionRepository, FeedbackRepository, RepositoryError,
};

#[derive(Default)]
struct StoreState {
    sessions: HashMap<Uuid, ChatSession>,
    // Insertion order doubles as creation order.
    messages: Vec<ChatMessage>,
    feedback: HashMap<(Uuid, Uuid), MessageFeedback>,
}

/// Process-local store used when no DATABASE_URL is configured, and in tests.
///
/// A single lock guards all three tables so `append_messages` is atomic the same
/// way the Postgres transaction is.
#[derive(Clone, Default)]
pub struct InMemoryChatStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatSessionRepository for InMemoryChatStore {
    async fn save(&self, session: &ChatSession) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        state.sessions.insert(session.id(), session.clone());
        Ok(())
    }

    async fn find_by_id(&self, session_id: Uuid) -> Result<Option<ChatSession>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.sessions.get(&session_id).cloned())
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<ChatSession>, RepositoryError> {
        let state = self.state.lock().await;
        let mut sessions: Vec<ChatSession> = state
            .sessions
            .values()
            .filter(|s| s.is_owned_by(user_id))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| {
            b.last_update()
                .cmp(&a.last_update())
                .then_with(|| a.id().cmp(&b.id()))
        });

        Ok(sessions
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_by_user(&self, user_id: Uuid) -> Result<i64, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .sessions
            .values()
            .filter(|s| s.is_owned_by(user_id))
            .count() as i64)
    }
}

#[async_trait]
impl ChatMessageRepository for InMemoryChatStore {
    async fn append_messages(
        &self,
        session_id: Uuid,
        messages: &[ChatMessage],
    ) -> Result<i32, RepositoryError> {
        let mut state = self.state.lock().await;

        if !state.sessions.contains_key(&session_id) {
            return Err(RepositoryError::NotFound(format!("session {}", session_id)));
        }
        for message in messages {
            if message.chat_session_id() != session_id {
                return Err(RepositoryError::ValidationError(format!(
                    "message {} belongs to another session",
                    message.id()
                )));
            }
            if state.messages.iter().any(|m| m.id() == message.id()) {
                return Err(RepositoryError::ValidationError(format!(
                    "message {} already exists",
                    message.id()
                )));
            }
        }

        state.messages.extend(messages.iter().cloned());
        let session = state
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("session {}", session_id)))?;
        session.record_messages(messages.len() as i32, Utc::now());
        Ok(session.message_count())
    }

    async fn find_by_id(&self, message_id: Uuid) -> Result<Option<ChatMessage>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.messages.iter().find(|m| m.id() == message_id).cloned())
    }

    async fn find_by_session(
        &self,
        session_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .messages
            .iter()
            .filter(|m| m.chat_session_id() == session_id)
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn find_recent_by_session(
        &self,
        session_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let state = self.state.lock().await;
        let mut recent: Vec<ChatMessage> = state
            .messages
            .iter()
            .rev()
            .filter(|m| m.chat_session_id() == session_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        recent.reverse();
        Ok(recent)
    }

    async fn count_by_session(&self, session_id: Uuid) -> Result<i64, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .messages
            .iter()
            .filter(|m| m.chat_session_id() == session_id)
            .count() as i64)
    }
}

#[async_trait]
impl FeedbackRepository for InMemoryChatStore {
    async fn upsert(&self, feedback: &MessageFeedback) -> Result<MessageFeedback, RepositoryError> {
        let mut state = self.state.lock().await;
        let key = (feedback.chat_message_id(), feedback.user_id());

        let stored = match state.feedback.get_mut(&key) {
            Some(existing) => {
                existing.overwrite_with(feedback);
                existing.clone()
            }
            None => {
                state.feedback.insert(key, feedback.clone());
                feedback.clone()
            }
        };
        Ok(stored)
    }

    async fn find_by_message_and_user(
        &self,
        message_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<MessageFeedback>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.feedback.get(&(message_id, user_id)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::ChatMode;

    async fn seeded() -> (InMemoryChatStore, ChatSession) {
        let store = InMemoryChatStore::new();
        let session = ChatSession::new(Uuid::new_v4(), None, "Test".to_string(), ChatMode::Chat);
        ChatSessionRepository::save(&store, &session).await.unwrap();
        (store, session)
    }

    #[tokio::test]
    async fn test_append_bumps_message_count() {
        let (store, session) = seeded().await;
        let user = ChatMessage::new_user(session.id(), "hello there".to_string(), None);

        let count = store
            .append_messages(session.id(), &[user.clone()])
            .await
            .unwrap();
        assert_eq!(count, 1);

        let reloaded = ChatSessionRepository::find_by_id(&store, session.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.message_count(), 1);
        assert!(reloaded.last_message_at().is_some());
        assert_eq!(store.count_by_session(session.id()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_append_rejects_foreign_message_atomically() {
        let (store, session) = seeded().await;
        let good = ChatMessage::new_user(session.id(), "ok".to_string(), None);
        let foreign = ChatMessage::new_user(Uuid::new_v4(), "nope".to_string(), None);

        let result = store.append_messages(session.id(), &[good, foreign]).await;
        assert!(matches!(result, Err(RepositoryError::ValidationError(_))));
        assert_eq!(store.count_by_session(session.id()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_append_to_unknown_session_fails() {
        let store = InMemoryChatStore::new();
        let session_id = Uuid::new_v4();
        let message = ChatMessage::new_user(session_id, "hi".to_string(), None);

        let result = store.append_messages(session_id, &[message]).await;
        assert!(matches!(result, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_recent_messages_are_oldest_first() {
        let (store, session) = seeded().await;
        let messages: Vec<ChatMessage> = (0..5)
            .map(|i| ChatMessage::new_user(session.id(), format!("m{}", i), None))
            .collect();
        store.append_messages(session.id(), &messages).await.unwrap();

        let recent = store.find_recent_by_session(session.id(), 2).await.unwrap();
        let contents: Vec<&str> = recent.iter().map(|m| m.content()).collect();
        assert_eq!(contents, vec!["m3", "m4"]);

        let page = store.find_by_session(session.id(), 1, 2).await.unwrap();
        let contents: Vec<&str> = page.iter().map(|m| m.content()).collect();
        assert_eq!(contents, vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn test_feedback_upsert_overwrites_same_pair() {
        let store = InMemoryChatStore::new();
        let message_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let first = MessageFeedback::new(message_id, user_id, true, None).unwrap();
        let stored_first = store.upsert(&first).await.unwrap();

        let second =
            MessageFeedback::new(message_id, user_id, false, Some("wrong".to_string())).unwrap();
        let stored_second = store.upsert(&second).await.unwrap();

        assert_eq!(stored_second.id(), stored_first.id());
        assert!(!stored_second.is_positive());
        assert_eq!(stored_second.feedback_text(), Some("wrong"));
        let stored = store
            .find_by_message_and_user(message_id, user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id(), stored_first.id());
        assert!(
            store
                .find_by_message_and_user(message_id, Uuid::new_v4())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_sessions_listed_newest_first() {
        let store = InMemoryChatStore::new();
        let user_id = Uuid::new_v4();
        let older = ChatSession::new(user_id, None, "older".to_string(), ChatMode::Chat);
        let newer = ChatSession::new(user_id, None, "newer".to_string(), ChatMode::Chat);
        ChatSessionRepository::save(&store, &older).await.unwrap();
        ChatSessionRepository::save(&store, &newer).await.unwrap();

        store
            .append_messages(
                older.id(),
                &[ChatMessage::new_user(older.id(), "bump".to_string(), None)],
            )
            .await
            .unwrap();

        let listed = store.find_by_user(user_id, 0, 10).await.unwrap();
        assert_eq!(listed[0].title(), "older");
        assert_eq!(store.count_by_user(user_id).await.unwrap(), 2);
        assert_eq!(store.count_by_user(Uuid::new_v4()).await.unwrap(), 0);
    }
}
