use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::domain::value_objects::{ChatMode, MessageRole, MessageSource, ToolCall};

#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerationProviderError {
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Malformed stream: {0}")]
    MalformedStream(String),
}

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub query: String,
    pub history: Vec<HistoryEntry>,
    pub sources: Vec<MessageSource>,
    pub mode: ChatMode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationChunk {
    Token(String),
    ToolCall(ToolCall),
}

/// Ordered output of one generation call. Dropping it abandons the call.
pub type TokenStream =
    Pin<Box<dyn Stream<Item = Result<GenerationChunk, GenerationProviderError>> + Send>>;

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<TokenStream, GenerationProviderError>;
}
