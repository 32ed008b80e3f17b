use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Error as ReqwestError, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::ports::retrieval_provider::{
    RetrievalProvider, RetrievalProviderError, RetrievalRequest, RetrievalResponse,
};
use crate::domain::value_objects::MessageSource;

#[derive(Serialize)]
struct SearchRequestBody<'a> {
    query: &'a str,
    user_id: Uuid,
    mode: &'static str,
    top_k: usize,
    filters: &'a HashMap<String, String>,
}

impl<'a> SearchRequestBody<'a> {
    fn from_request(request: &'a RetrievalRequest) -> Self {
        Self {
            query: &request.query,
            user_id: request.user_id,
            mode: request.mode.as_str(),
            top_k: request.top_k,
            filters: &request.filters,
        }
    }
}

#[derive(Deserialize)]
struct SearchResponseBody {
    #[serde(default)]
    sources: Vec<MessageSource>,
    #[serde(default)]
    rephrased_query: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SearchClientConfig {
    pub service_url: String,
    pub max_retries: u32,
    pub timeout: Duration,
    pub backoff_base: Duration,
    pub backoff_factor: f64,
}

impl SearchClientConfig {
    pub fn new(service_url: impl Into<String>, max_retries: u32, timeout: Duration) -> Self {
        Self {
            service_url: service_url.into(),
            max_retries,
            timeout,
            backoff_base: Duration::from_millis(200),
            backoff_factor: 2.0,
        }
    }
}

/// Calls the external search service for a turn's sources.
pub struct HttpRetrievalProvider {
    client: Client,
    config: SearchClientConfig,
}

enum Attempt {
    Retryable(RetrievalProviderError),
    Fatal(RetrievalProviderError),
}

impl HttpRetrievalProvider {
    pub fn new(config: SearchClientConfig) -> Result<Self, ReqwestError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.config
            .backoff_base
            .mul_f64(self.config.backoff_factor.powi(attempt as i32 - 1))
    }

    async fn execute_request(&self, body: &SearchRequestBody<'_>) -> Result<RetrievalResponse, Attempt> {
        let response = self
            .client
            .post(&self.config.service_url)
            .json(body)
            .send()
            .await
            .map_err(|e| Attempt::Retryable(RetrievalProviderError::NetworkError(e.without_url().to_string())))?;

        let status = response.status();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            return Err(Attempt::Retryable(RetrievalProviderError::ServiceUnavailable));
        }
        if status.is_server_error() {
            return Err(Attempt::Retryable(RetrievalProviderError::ApiError(format!(
                "search service returned {}",
                status
            ))));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Attempt::Fatal(RetrievalProviderError::ApiError(format!(
                "search service returned {}: {}",
                status, text
            ))));
        }

        let parsed: SearchResponseBody = response
            .json()
            .await
            .map_err(|e| Attempt::Fatal(RetrievalProviderError::InvalidResponse(e.to_string())))?;

        Ok(RetrievalResponse {
            sources: parsed.sources,
            rephrased_query: parsed.rephrased_query,
        })
    }
}

#[async_trait]
impl RetrievalProvider for HttpRetrievalProvider {
    async fn retrieve(
        &self,
        request: RetrievalRequest,
    ) -> Result<RetrievalResponse, RetrievalProviderError> {
        let body = SearchRequestBody::from_request(&request);

        let mut attempts = 0;
        loop {
            attempts += 1;

            match self.execute_request(&body).await {
                Ok(response) => {
                    debug!(
                        session_id = %request.session_id,
                        attempts,
                        sources = response.sources.len(),
                        "search service answered"
                    );
                    return Ok(response);
                }
                Err(Attempt::Fatal(e)) => return Err(e),
                Err(Attempt::Retryable(e)) => {
                    if attempts > self.config.max_retries {
                        return Err(e);
                    }
                    let wait = self.backoff(attempts);
                    warn!(
                        session_id = %request.session_id,
                        attempts,
                        error = %e,
                        wait_ms = wait.as_millis() as u64,
                        "search call failed, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}
