use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::application::errors::{ChatError, UpstreamFailure};
use crate::application::ports::generation_provider::{
    GenerationChunk, GenerationProvider, GenerationRequest,
};
use crate::application::services::turn_state_machine::TurnSignal;

pub struct GenerationCoordinator {
    provider: Arc<dyn GenerationProvider>,
    token_timeout: Duration,
}

impl GenerationCoordinator {
    pub fn new(provider: Arc<dyn GenerationProvider>, token_timeout: Duration) -> Self {
        Self {
            provider,
            token_timeout,
        }
    }

    /// Streams the generation into `signals`, one signal per chunk, in backend order.
    ///
    /// The cancellation token is checked before every wait; once it fires nothing else
    /// is sent and the backend stream is dropped, which abandons the upstream call.
    pub async fn run(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
        signals: mpsc::Sender<TurnSignal>,
    ) {
        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            opened = tokio::time::timeout(self.token_timeout, self.provider.generate(request)) => opened,
        };

        let mut stream = match opened {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                let _ = signals
                    .send(TurnSignal::GenerationFailed(ChatError::upstream(
                        UpstreamFailure::GenerationFailed,
                        format!("Generation failed: {}", e),
                    )))
                    .await;
                return;
            }
            Err(_) => {
                let _ = signals
                    .send(TurnSignal::GenerationFailed(self.timeout_error()))
                    .await;
                return;
            }
        };

        let mut emitted = 0usize;
        loop {
            if cancel.is_cancelled() {
                debug!(emitted, "generation abandoned after cancellation");
                return;
            }

            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(emitted, "generation abandoned after cancellation");
                    return;
                }
                next = tokio::time::timeout(self.token_timeout, stream.next()) => next,
            };

            let signal = match next {
                Ok(Some(Ok(GenerationChunk::Token(token)))) => {
                    emitted += 1;
                    trace!(emitted, "token received");
                    TurnSignal::Token(token)
                }
                Ok(Some(Ok(GenerationChunk::ToolCall(call)))) => TurnSignal::ToolCall(call),
                Ok(Some(Err(e))) => {
                    warn!(error = %e, emitted, "generation backend failed mid-stream");
                    let _ = signals
                        .send(TurnSignal::GenerationFailed(ChatError::upstream(
                            UpstreamFailure::GenerationFailed,
                            format!("Generation failed: {}", e),
                        )))
                        .await;
                    return;
                }
                Ok(None) => {
                    let _ = signals.send(TurnSignal::GenerationFinished).await;
                    return;
                }
                Err(_) => {
                    warn!(emitted, "token wait timed out");
                    let _ = signals
                        .send(TurnSignal::GenerationFailed(self.timeout_error()))
                        .await;
                    return;
                }
            };

            if signals.send(signal).await.is_err() {
                // Turn driver is gone; nobody is listening.
                return;
            }
        }
    }

    fn timeout_error(&self) -> ChatError {
        ChatError::upstream(
            UpstreamFailure::GenerationTimeout,
            format!(
                "No token received within {} ms",
                self.token_timeout.as_millis()
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{FakeGeneration, generation_request};

    async fn collect(
        coordinator: &GenerationCoordinator,
        cancel: CancellationToken,
    ) -> Vec<TurnSignal> {
        let (tx, mut rx) = mpsc::channel(64);
        coordinator.run(generation_request(), cancel, tx).await;

        let mut signals = Vec::new();
        while let Some(signal) = rx.recv().await {
            signals.push(signal);
        }
        signals
    }

    #[tokio::test]
    async fn test_tokens_are_forwarded_in_order() {
        let provider = FakeGeneration::tokens(&["Echo", "Mind", " is", " here"]);
        let coordinator = GenerationCoordinator::new(Arc::new(provider), Duration::from_secs(1));

        let signals = collect(&coordinator, CancellationToken::new()).await;

        let tokens: Vec<String> = signals
            .iter()
            .filter_map(|s| match s {
                TurnSignal::Token(t) => Some(t.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(tokens, vec!["Echo", "Mind", " is", " here"]);
        assert!(matches!(signals.last(), Some(TurnSignal::GenerationFinished)));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_sends_nothing() {
        let provider = FakeGeneration::tokens(&["a", "b"]);
        let coordinator = GenerationCoordinator::new(Arc::new(provider), Duration::from_secs(1));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let signals = collect(&coordinator, cancel).await;
        assert!(signals.is_empty());
    }

    #[tokio::test]
    async fn test_stalled_stream_times_out() {
        let provider = FakeGeneration::tokens(&["a", "b"]).with_token_delay(Duration::from_secs(5));
        let coordinator =
            GenerationCoordinator::new(Arc::new(provider), Duration::from_millis(30));

        let signals = collect(&coordinator, CancellationToken::new()).await;

        match signals.last() {
            Some(TurnSignal::GenerationFailed(err)) => assert_eq!(err.code(), "generation_timeout"),
            other => panic!("expected timeout failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_mid_stream_error_ends_generation() {
        let provider = FakeGeneration::tokens(&["partial"]).failing_after_tokens();
        let coordinator = GenerationCoordinator::new(Arc::new(provider), Duration::from_secs(1));

        let signals = collect(&coordinator, CancellationToken::new()).await;

        assert!(matches!(signals[0], TurnSignal::Token(_)));
        match &signals[1] {
            TurnSignal::GenerationFailed(err) => assert_eq!(err.code(), "generation_failed"),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(signals.len(), 2);
    }
}
