use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::errors::{ChatError, UpstreamFailure};
use crate::application::ports::retrieval_provider::{RetrievalProvider, RetrievalRequest};
use crate::domain::value_objects::{ChatMode, MessageSource, rank_sources};

/// Sources and audit data produced by the single retrieval call of a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedContext {
    pub query: String,
    pub rephrased_query: Option<String>,
    pub sources: Vec<MessageSource>,
}

pub struct RetrievalCoordinator {
    provider: Arc<dyn RetrievalProvider>,
    timeout: Duration,
    top_k: usize,
}

impl RetrievalCoordinator {
    pub fn new(provider: Arc<dyn RetrievalProvider>, timeout: Duration, top_k: usize) -> Self {
        Self {
            provider,
            timeout,
            top_k: top_k.max(1),
        }
    }

    pub async fn retrieve(
        &self,
        query: &str,
        user_id: Uuid,
        session_id: Uuid,
        mode: ChatMode,
        filters: HashMap<String, String>,
    ) -> Result<RetrievedContext, ChatError> {
        let request = RetrievalRequest {
            query: query.to_string(),
            user_id,
            session_id,
            mode,
            top_k: self.top_k,
            filters,
        };

        let response = match tokio::time::timeout(self.timeout, self.provider.retrieve(request)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(%session_id, error = %e, "retrieval backend failed");
                return Err(ChatError::upstream(
                    UpstreamFailure::RetrievalFailed,
                    format!("Retrieval failed: {}", e),
                ));
            }
            Err(_) => {
                warn!(%session_id, timeout_ms = self.timeout.as_millis() as u64, "retrieval timed out");
                return Err(ChatError::upstream(
                    UpstreamFailure::RetrievalTimeout,
                    format!("Retrieval timed out after {} ms", self.timeout.as_millis()),
                ));
            }
        };

        let mut sources = rank_sources(response.sources);
        sources.retain(|source| source.validate().is_ok());
        sources.truncate(self.top_k);

        // An empty or identical rephrasing carries no audit value.
        let rephrased_query = response
            .rephrased_query
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty() && q != query.trim());

        debug!(%session_id, sources = sources.len(), "retrieval complete");

        Ok(RetrievedContext {
            query: query.to_string(),
            rephrased_query,
            sources,
        })
    }
}
