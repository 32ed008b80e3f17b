use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::value_objects::{ChatMode, MessageSource};

#[derive(Debug, thiserror::Error)]
pub enum RetrievalProviderError {
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Service unavailable")]
    ServiceUnavailable,
}

#[derive(Debug, Clone)]
pub struct RetrievalRequest {
    pub query: String,
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub mode: ChatMode,
    pub top_k: usize,
    pub filters: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct RetrievalResponse {
    pub sources: Vec<MessageSource>,
    pub rephrased_query: Option<String>,
}

#[async_trait]
pub trait RetrievalProvider: Send + Sync {
    async fn retrieve(
        &self,
        request: RetrievalRequest,
    ) -> Result<RetrievalResponse, RetrievalProviderError>;
}
