//! Fakes shared by the application-layer tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, stream};
use uuid::Uuid;

use crate::application::ports::generation_provider::{
    GenerationChunk, GenerationProvider, GenerationProviderError, GenerationRequest, TokenStream,
};
use crate::application::ports::retrieval_provider::{
    RetrievalProvider, RetrievalProviderError, RetrievalRequest, RetrievalResponse,
};
use crate::application::services::chat_turn_service::{ChatTurnService, StartTurnRequest};
use crate::application::services::generation_coordinator::GenerationCoordinator;
use crate::application::services::retrieval_coordinator::RetrievalCoordinator;
use crate::domain::entities::{ChatMessage, ChatSession, MessageFeedback};
use crate::domain::repositories::{
    ChatMessageRepository, ChatSessionRepository, FeedbackRepository, RepositoryError,
};
use crate::domain::value_objects::{ChatMode, MessageSource};
use crate::infrastructure::memory::InMemoryChatStore;

pub fn source(document_id: &str, score: f32) -> MessageSource {
    MessageSource::new(
        document_id,
        format!("{}-chunk-0", document_id),
        score,
        format!("Title of {}", document_id),
        "snippet",
    )
}

pub fn generation_request() -> GenerationRequest {
    GenerationRequest {
        query: "What is EchoMind?".to_string(),
        history: Vec::new(),
        sources: vec![source("doc-1", 0.9)],
        mode: ChatMode::Chat,
    }
}

pub struct FakeRetrieval {
    sources: Vec<MessageSource>,
    rephrased: Option<String>,
    delay: Mutex<Option<Duration>>,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeRetrieval {
    pub fn returning(sources: Vec<MessageSource>) -> Self {
        Self {
            sources,
            rephrased: None,
            delay: Mutex::new(None),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::returning(Vec::new())
        }
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn with_rephrased(mut self, rephrased: &str) -> Self {
        self.rephrased = Some(rephrased.to_string());
        self
    }

    pub fn clear_delay(&self) {
        *self.delay.lock().unwrap() = None;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RetrievalProvider for FakeRetrieval {
    async fn retrieve(
        &self,
        _request: RetrievalRequest,
    ) -> Result<RetrievalResponse, RetrievalProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(RetrievalProviderError::ServiceUnavailable);
        }
        Ok(RetrievalResponse {
            sources: self.sources.clone(),
            rephrased_query: self.rephrased.clone(),
        })
    }
}

pub struct FakeGeneration {
    tokens: Vec<String>,
    token_delay: Option<Duration>,
    fail_after_tokens: bool,
    calls: AtomicUsize,
}

impl FakeGeneration {
    pub fn tokens(tokens: &[&str]) -> Self {
        Self {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            token_delay: None,
            fail_after_tokens: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_token_delay(mut self, delay: Duration) -> Self {
        self.token_delay = Some(delay);
        self
    }

    pub fn failing_after_tokens(mut self) -> Self {
        self.fail_after_tokens = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationProvider for FakeGeneration {
    async fn generate(
        &self,
        _request: GenerationRequest,
    ) -> Result<TokenStream, GenerationProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.token_delay;

        let tokens = stream::iter(self.tokens.clone()).then(move |token| async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok::<_, GenerationProviderError>(GenerationChunk::Token(token))
        });
        let tail = if self.fail_after_tokens {
            stream::iter(vec![Err(GenerationProviderError::ApiError(
                "backend exploded".to_string(),
            ))])
            .boxed()
        } else {
            stream::empty().boxed()
        };

        Ok(Box::pin(tokens.chain(tail)))
    }
}

/// The in-memory store with switches that make individual calls fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryChatStore,
    fail_appends: AtomicBool,
    fail_session_reads: AtomicBool,
}

impl FlakyStore {
    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    pub fn fail_session_reads(&self, fail: bool) {
        self.fail_session_reads.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, what: &str) -> Result<(), RepositoryError> {
        if flag.load(Ordering::SeqCst) {
            return Err(RepositoryError::DatabaseError(format!("{} unavailable", what)));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatSessionRepository for FlakyStore {
    async fn save(&self, session: &ChatSession) -> Result<(), RepositoryError> {
        ChatSessionRepository::save(&self.inner, session).await
    }

    async fn find_by_id(&self, session_id: Uuid) -> Result<Option<ChatSession>, RepositoryError> {
        Self::check(&self.fail_session_reads, "session store")?;
        ChatSessionRepository::find_by_id(&self.inner, session_id).await
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<ChatSession>, RepositoryError> {
        Self::check(&self.fail_session_reads, "session store")?;
        self.inner.find_by_user(user_id, skip, limit).await
    }

    async fn count_by_user(&self, user_id: Uuid) -> Result<i64, RepositoryError> {
        self.inner.count_by_user(user_id).await
    }
}

#[async_trait]
impl ChatMessageRepository for FlakyStore {
    async fn append_messages(
        &self,
        session_id: Uuid,
        messages: &[ChatMessage],
    ) -> Result<i32, RepositoryError> {
        Self::check(&self.fail_appends, "message store")?;
        self.inner.append_messages(session_id, messages).await
    }

    async fn find_by_id(&self, message_id: Uuid) -> Result<Option<ChatMessage>, RepositoryError> {
        ChatMessageRepository::find_by_id(&self.inner, message_id).await
    }

    async fn find_by_session(
        &self,
        session_id: Uuid,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        self.inner.find_by_session(session_id, skip, limit).await
    }

    async fn find_recent_by_session(
        &self,
        session_id: Uuid,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        self.inner.find_recent_by_session(session_id, limit).await
    }

    async fn count_by_session(&self, session_id: Uuid) -> Result<i64, RepositoryError> {
        self.inner.count_by_session(session_id).await
    }
}

#[async_trait]
impl FeedbackRepository for FlakyStore {
    async fn upsert(&self, feedback: &MessageFeedback) -> Result<MessageFeedback, RepositoryError> {
        self.inner.upsert(feedback).await
    }

    async fn find_by_message_and_user(
        &self,
        message_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<MessageFeedback>, RepositoryError> {
        self.inner.find_by_message_and_user(message_id, user_id).await
    }
}

/// A turn service wired to a [`FlakyStore`] and the fakes above.
pub struct TestRig {
    pub user_id: Uuid,
    pub store: Arc<FlakyStore>,
    pub sessions: Arc<dyn ChatSessionRepository>,
    pub messages: Arc<dyn ChatMessageRepository>,
    pub feedback: Arc<dyn FeedbackRepository>,
    pub retrieval: Arc<FakeRetrieval>,
    pub generation: Arc<FakeGeneration>,
    pub service: Arc<ChatTurnService>,
}

impl TestRig {
    pub fn new(retrieval: FakeRetrieval, generation: FakeGeneration) -> Self {
        let store = Arc::new(FlakyStore::default());
        let retrieval = Arc::new(retrieval);
        let generation = Arc::new(generation);
        let sessions: Arc<dyn ChatSessionRepository> = store.clone();
        let messages: Arc<dyn ChatMessageRepository> = store.clone();
        let feedback: Arc<dyn FeedbackRepository> = store.clone();

        let service = Self::build_service(
            &sessions,
            &messages,
            retrieval.clone(),
            generation.clone(),
            Duration::from_secs(1),
        );

        Self {
            user_id: Uuid::new_v4(),
            store,
            sessions,
            messages,
            feedback,
            retrieval,
            generation,
            service,
        }
    }

    pub fn with_retrieval_timeout(mut self, timeout: Duration) -> Self {
        self.service = Self::build_service(
            &self.sessions,
            &self.messages,
            self.retrieval.clone(),
            self.generation.clone(),
            timeout,
        );
        self
    }

    fn build_service(
        sessions: &Arc<dyn ChatSessionRepository>,
        messages: &Arc<dyn ChatMessageRepository>,
        retrieval: Arc<FakeRetrieval>,
        generation: Arc<FakeGeneration>,
        retrieval_timeout: Duration,
    ) -> Arc<ChatTurnService> {
        Arc::new(ChatTurnService::new(
            sessions.clone(),
            messages.clone(),
            Arc::new(RetrievalCoordinator::new(retrieval, retrieval_timeout, 8)),
            Arc::new(GenerationCoordinator::new(generation, Duration::from_secs(1))),
        ))
    }

    pub async fn session(&self) -> ChatSession {
        let session = ChatSession::new(self.user_id, None, "Test chat".to_string(), ChatMode::Chat);
        self.sessions.save(&session).await.unwrap();
        session
    }

    pub async fn stored_session(&self, session_id: Uuid) -> ChatSession {
        self.sessions.find_by_id(session_id).await.unwrap().unwrap()
    }

    pub fn request(&self, session_id: Option<Uuid>, query: &str) -> StartTurnRequest {
        StartTurnRequest {
            user_id: self.user_id,
            session_id,
            query: query.to_string(),
            mode: None,
            parent_message_id: None,
            filters: HashMap::new(),
        }
    }
}
